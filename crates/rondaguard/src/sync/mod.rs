//! Offline-capable round submission and synchronization.
//!
//! - [`RoundSubmitter`] routes each finished round to the synced log or the
//!   offline queue.
//! - [`Reconciler`] migrates the queue into the synced log.
//! - [`ConnectivityMonitor`] runs the reconciler on reconnect edges and
//!   publishes a [`SyncStatus`].
//!
//! All three share one [`Store`](crate::storage::Store) and one
//! [`Connectivity`] flag, injected at construction.

mod connectivity;
mod monitor;
mod reconciler;
mod submission;

pub use connectivity::{Connectivity, ConnectivityEvent, ConnectivitySource, ScriptedSource};
pub use monitor::{ConnectivityMonitor, SyncPhase, SyncStatus, SyncTrigger};
pub use reconciler::Reconciler;
pub use submission::{Ack, RoundSubmitter};
