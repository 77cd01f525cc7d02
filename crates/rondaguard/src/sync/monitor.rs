//! Connectivity monitor.
//!
//! Bridges connectivity edges to the [`Reconciler`] and publishes a
//! [`SyncStatus`] that UIs can watch without polling.
//!
//! ```text
//!           disconnect                reconnect
//!   Idle ───────────────▶ Offline ───────────────▶ Syncing
//!    ▲                                               │
//!    └──────────── reconcile resolved (online) ──────┘
//! ```
//!
//! At startup, or on a manual trigger, the monitor goes `Idle → Syncing → Idle`
//! without visiting `Offline`. A reconcile that resolves after the device went
//! offline again settles in `Offline`. A reconnect edge that arrives while a
//! reconcile is in flight is remembered, and the monitor reconciles once more
//! before leaving `Syncing`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

use super::{Connectivity, ConnectivityEvent, ConnectivitySource, Reconciler};

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Disconnected; submissions go to the queue.
    Offline,
    /// A reconciliation is in flight.
    Syncing,
    /// Connected and not syncing.
    Idle,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Syncing => write!(f, "syncing"),
            Self::Idle => write!(f, "idle"),
        }
    }
}

/// UI-observable sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Current phase.
    pub phase: SyncPhase,
    /// Rounds migrated by the last reconciliation, while it is still shown.
    ///
    /// Only set for non-zero counts, and cleared after the display window.
    pub last_synced_count: Option<usize>,
}

impl SyncStatus {
    fn new(phase: SyncPhase) -> Self {
        Self {
            phase,
            last_synced_count: None,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.phase, self.last_synced_count) {
            (SyncPhase::Offline, _) => write!(f, "offline mode"),
            (SyncPhase::Syncing, _) => write!(f, "syncing..."),
            (SyncPhase::Idle, Some(n)) => write!(f, "{n} records synced"),
            (SyncPhase::Idle, None) => write!(f, "online"),
        }
    }
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The current phase does not allow a reconciliation.
    Skipped,
    /// Reconciliation resolved with this many migrated rounds.
    Reconciled(usize),
    /// Reconciliation failed; the queue was left untouched.
    Failed,
}

/// Drives reconciliation from connectivity edges.
///
/// Cheap to clone; clones share the same status channel and counters.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    reconciler: Reconciler,
    status: Arc<watch::Sender<SyncStatus>>,
    display_window: Duration,
    generation: Arc<AtomicU64>,
    attempts: Arc<AtomicU64>,
    resync: Arc<AtomicBool>,
}

impl ConnectivityMonitor {
    /// Create a monitor. The initial phase follows the reconciler's
    /// connectivity flag.
    #[must_use]
    pub fn new(reconciler: Reconciler, display_window: Duration) -> Self {
        let phase = if reconciler.connectivity().is_online() {
            SyncPhase::Idle
        } else {
            SyncPhase::Offline
        };
        let (status, _) = watch::channel(SyncStatus::new(phase));

        Self {
            reconciler,
            status: Arc::new(status),
            display_window,
            generation: Arc::new(AtomicU64::new(0)),
            attempts: Arc::new(AtomicU64::new(0)),
            resync: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The connectivity flag shared with the reconciler.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        self.reconciler.connectivity()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Number of reconciliations this monitor has started.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Eager reconciliation at startup, when already online.
    pub async fn start(&self) -> SyncTrigger {
        debug!(phase = %self.status().phase, "Connectivity monitor starting");
        self.sync_from(SyncPhase::Idle).await
    }

    /// Manual trigger. Only runs from `Idle`.
    pub async fn sync_now(&self) -> SyncTrigger {
        self.sync_from(SyncPhase::Idle).await
    }

    /// Handle a reconnect edge.
    ///
    /// Only an `Offline → Syncing` transition reconciles; a reconnect while
    /// already online is ignored. A reconnect that follows a disconnect during
    /// `Syncing` makes the in-flight sync run another pass.
    pub async fn on_reconnect(&self) -> SyncTrigger {
        let was_online = self.connectivity().set_online(true);
        if !was_online {
            self.status.send_if_modified(|status| {
                if status.phase == SyncPhase::Syncing {
                    self.resync.store(true, Ordering::SeqCst);
                    debug!("Reconnected during sync, another pass will follow");
                }
                false
            });
        }
        self.sync_from(SyncPhase::Offline).await
    }

    /// Handle a disconnect edge.
    ///
    /// While syncing, the phase is left alone and the in-flight reconcile
    /// settles in `Offline` when it resolves.
    pub fn on_disconnect(&self) {
        self.connectivity().set_online(false);
        let changed = self.status.send_if_modified(|status| {
            if status.phase == SyncPhase::Idle {
                status.phase = SyncPhase::Offline;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Connection lost, switching to offline mode");
        }
    }

    /// Dispatch a single connectivity event.
    pub async fn handle_event(&self, event: ConnectivityEvent) -> SyncTrigger {
        match event {
            ConnectivityEvent::Connected => self.on_reconnect().await,
            ConnectivityEvent::Disconnected => {
                self.on_disconnect();
                SyncTrigger::Skipped
            }
        }
    }

    /// Consume events until every sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<ConnectivityEvent>) {
        while let Some(event) = rx.recv().await {
            debug!(%event, "Connectivity event");
            self.handle_event(event).await;
        }
        debug!("Connectivity event stream closed");
    }

    /// Start `source` and drive the state machine from its events until the
    /// source stops.
    ///
    /// # Errors
    ///
    /// Returns the source's start error, or an internal error if its task panicked.
    pub async fn attach<S>(&self, mut source: S) -> Result<()>
    where
        S: ConnectivitySource + 'static,
    {
        info!(source = source.name(), "Attaching connectivity source");
        let initial = if source.is_connected() {
            ConnectivityEvent::Connected
        } else {
            ConnectivityEvent::Disconnected
        };
        if source.is_connected() != self.connectivity().is_online() {
            self.handle_event(initial).await;
        }

        let (tx, rx) = mpsc::channel(16);
        let producer = tokio::spawn(async move { source.start(tx).await });
        self.run(rx).await;

        producer
            .await
            .map_err(|e| Error::internal(format!("connectivity source task failed: {e}")))?
    }

    async fn sync_from(&self, from: SyncPhase) -> SyncTrigger {
        let began = self.status.send_if_modified(|status| {
            if status.phase == from {
                status.phase = SyncPhase::Syncing;
                true
            } else {
                false
            }
        });
        if !began {
            debug!(phase = %self.status().phase, "Sync not started");
            return SyncTrigger::Skipped;
        }

        let mut trigger = self.reconcile_once().await;
        while !self.settle(trigger) {
            info!("Reconciling again after a reconnect during sync");
            trigger = match (trigger, self.reconcile_once().await) {
                (SyncTrigger::Reconciled(done), SyncTrigger::Reconciled(more)) => {
                    SyncTrigger::Reconciled(done + more)
                }
                (_, next) => next,
            };
        }
        trigger
    }

    async fn reconcile_once(&self) -> SyncTrigger {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let reconciler = self.reconciler.clone();
        match tokio::task::spawn_blocking(move || reconciler.reconcile()).await {
            Ok(Ok(count)) => SyncTrigger::Reconciled(count),
            Ok(Err(err)) => {
                error!(error = %err, "Reconciliation failed, rounds stay queued");
                SyncTrigger::Failed
            }
            Err(err) => {
                error!(error = %err, "Reconciliation task aborted");
                SyncTrigger::Failed
            }
        }
    }

    /// Leave `Syncing`. Returns `false`, staying in `Syncing`, when a
    /// reconnect arrived during the pass and the device is online.
    fn settle(&self, trigger: SyncTrigger) -> bool {
        let shown = match trigger {
            SyncTrigger::Reconciled(count) if count > 0 => Some(count),
            _ => None,
        };

        let mut generation = None;
        self.status.send_if_modified(|status| {
            let online = self.connectivity().is_online();
            if self.resync.swap(false, Ordering::SeqCst) && online {
                return false;
            }
            status.phase = if online {
                SyncPhase::Idle
            } else {
                SyncPhase::Offline
            };
            status.last_synced_count = shown;
            generation = Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            true
        });
        let Some(generation) = generation else {
            return false;
        };

        if shown.is_none() {
            return true;
        }
        let status = Arc::clone(&self.status);
        let current = Arc::clone(&self.generation);
        let window = self.display_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if current.load(Ordering::SeqCst) == generation {
                status.send_if_modified(|s| s.last_synced_count.take().is_some());
            }
        });
        true
    }
}
