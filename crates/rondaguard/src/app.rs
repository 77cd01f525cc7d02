//! Application wiring.
//!
//! An [`App`] owns one store and one connectivity flag and hands out the
//! services built on them. Every `ronda` invocation is a launch, so the
//! binary calls [`App::launch_sync`] before running its command.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryView;
use crate::storage::Store;
use crate::sync::{Connectivity, ConnectivityMonitor, Reconciler, RoundSubmitter, SyncTrigger};

/// Services wired to one store and one connectivity flag.
#[derive(Debug)]
pub struct App {
    store: Arc<Store>,
    connectivity: Connectivity,
    monitor: ConnectivityMonitor,
    config: Config,
}

impl App {
    /// Open the configured store, apply the quota and seed defaults.
    ///
    /// The device counts as online when the configuration assumes so and
    /// `offline` was not requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or seeded.
    pub fn open(config: Config, offline: bool) -> Result<Self> {
        let store = Store::open(config.database_path())?;
        store.set_quota_bytes(config.storage.quota_bytes)?;

        let store = Arc::new(store);
        if config.storage.seed_default_users {
            Catalog::new(Arc::clone(&store)).seed_defaults()?;
        }

        let connectivity = Connectivity::new(config.sync.assume_online && !offline);
        let reconciler = Reconciler::new(Arc::clone(&store), connectivity.clone());
        let monitor = ConnectivityMonitor::new(reconciler, config.status_display());

        Ok(Self {
            store,
            connectivity,
            monitor,
            config,
        })
    }

    /// Startup reconciliation. Drains rounds queued by an earlier
    /// disconnected session when the device is online now.
    pub async fn launch_sync(&self) -> SyncTrigger {
        if !self.connectivity.is_online() {
            debug!("Launched offline, queued rounds stay pending");
            return SyncTrigger::Skipped;
        }

        let trigger = self.monitor.start().await;
        match trigger {
            SyncTrigger::Reconciled(0) | SyncTrigger::Skipped => {}
            SyncTrigger::Reconciled(count) => info!(count, "Synced rounds queued while offline"),
            SyncTrigger::Failed => warn!("Startup sync failed, rounds stay queued"),
        }
        trigger
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The connectivity flag shared by every service.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The monitor, carrying the status of this launch's syncs.
    #[must_use]
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Users, tasks, templates and settings.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        Catalog::new(Arc::clone(&self.store))
    }

    /// Read side of the round history.
    #[must_use]
    pub fn history(&self) -> HistoryView {
        HistoryView::new(Arc::clone(&self.store))
    }

    /// Round submission bound to this app's connectivity.
    #[must_use]
    pub fn submitter(&self) -> RoundSubmitter {
        RoundSubmitter::new(Arc::clone(&self.store), self.connectivity.clone())
    }
}
