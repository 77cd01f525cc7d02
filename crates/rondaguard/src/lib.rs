//! `rondaguard` - Inspection rounds with offline-first submission
//!
//! This library records checklist-based inspection rounds in a durable
//! on-device store. Rounds finished without connectivity are queued and
//! merged into the canonical history once the device reconnects.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod model;
pub mod storage;
pub mod sync;

pub use app::App;
pub use catalog::Catalog;
pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryView, RoundFilter, Summary};
pub use logging::init_logging;
pub use model::{RoundLog, SyncFlag};
pub use storage::{Store, StoreStats};
pub use sync::{Ack, Connectivity, ConnectivityMonitor, Reconciler, RoundSubmitter, SyncStatus};
