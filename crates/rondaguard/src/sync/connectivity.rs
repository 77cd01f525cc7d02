//! Connectivity state and the sources that report it.
//!
//! [`Connectivity`] is the shared online flag consulted at submission and
//! reconciliation time. A [`ConnectivitySource`] pushes edge events into a
//! channel that the [`crate::sync::ConnectivityMonitor`] consumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};

/// Shared, cloneable view of whether the device is connected.
///
/// Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: Arc<AtomicBool>,
}

impl Connectivity {
    /// Create a flag with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// A flag that starts connected.
    #[must_use]
    pub fn online() -> Self {
        Self::new(true)
    }

    /// A flag that starts disconnected.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Check if the device is currently connected.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Update the flag, returning the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            debug!(online, "Connectivity changed");
        }
        previous
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}

/// An edge reported by a connectivity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityEvent {
    /// The device regained connectivity.
    Connected,
    /// The device lost connectivity.
    Disconnected,
}

impl std::fmt::Display for ConnectivityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A producer of connectivity edges.
///
/// Implementors watch some environment signal and send an event on every
/// transition.
#[async_trait::async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// The name of this source (for logging).
    fn name(&self) -> &'static str;

    /// Whether the source currently considers the device connected.
    fn is_connected(&self) -> bool;

    /// Start reporting events through `tx`.
    ///
    /// Returning drops `tx`, which ends the consumer's event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot start or the receiver is gone.
    async fn start(&mut self, tx: mpsc::Sender<ConnectivityEvent>) -> Result<()>;
}

/// A source that replays a fixed sequence of events.
///
/// Used for manual triggers and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    connected: bool,
    script: Vec<ConnectivityEvent>,
}

impl ScriptedSource {
    /// Create a source with the given initial state and no events.
    #[must_use]
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            script: Vec::new(),
        }
    }

    /// Append an event to the script.
    #[must_use]
    pub fn then(mut self, event: ConnectivityEvent) -> Self {
        self.script.push(event);
        self
    }
}

#[async_trait::async_trait]
impl ConnectivitySource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn start(&mut self, tx: mpsc::Sender<ConnectivityEvent>) -> Result<()> {
        for event in std::mem::take(&mut self.script) {
            self.connected = event == ConnectivityEvent::Connected;
            tx.send(event)
                .await
                .map_err(|_| Error::internal("connectivity receiver dropped"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_clones_share_state() {
        let a = Connectivity::offline();
        let b = a.clone();
        assert!(!b.is_online());

        assert!(!a.set_online(true));
        assert!(b.is_online());
    }

    #[test]
    fn test_set_online_returns_previous() {
        let flag = Connectivity::online();
        assert!(flag.set_online(false));
        assert!(!flag.set_online(false));
    }

    #[test]
    fn test_default_is_online() {
        assert!(Connectivity::default().is_online());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(ConnectivityEvent::Connected.to_string(), "connected");
        assert_eq!(ConnectivityEvent::Disconnected.to_string(), "disconnected");
    }

    #[tokio::test]
    async fn test_scripted_source_replays_events() {
        let mut source = ScriptedSource::new(true)
            .then(ConnectivityEvent::Disconnected)
            .then(ConnectivityEvent::Connected);
        assert_eq!(source.name(), "scripted");

        let (tx, mut rx) = mpsc::channel(4);
        source.start(tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(ConnectivityEvent::Disconnected));
        assert_eq!(rx.recv().await, Some(ConnectivityEvent::Connected));
        assert_eq!(rx.recv().await, None);
        assert!(source.is_connected());
    }

    #[tokio::test]
    async fn test_scripted_source_fails_without_receiver() {
        let mut source = ScriptedSource::new(false).then(ConnectivityEvent::Connected);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(source.start(tx).await.is_err());
    }
}
