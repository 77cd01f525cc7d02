//! Queue-to-log reconciliation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{RoundLog, SyncFlag};
use crate::storage::{Collection, Store};

use super::Connectivity;

/// Migrates queued rounds into the synced log.
///
/// The read of both collections, the merge and both writes happen inside one
/// [`Store::atomically`] section, so concurrent calls serialize and a failure
/// leaves both collections exactly as they were.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<Store>,
    connectivity: Connectivity,
}

impl Reconciler {
    /// Create a reconciler over the given store and connectivity flag.
    #[must_use]
    pub fn new(store: Arc<Store>, connectivity: Connectivity) -> Self {
        Self {
            store,
            connectivity,
        }
    }

    /// The connectivity flag this reconciler consults.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Drain the offline queue into the synced log.
    ///
    /// Returns the number of rounds migrated. Offline, or with an empty
    /// queue, nothing is read back or written and `0` is returned.
    ///
    /// After a non-zero result the synced log is sorted by start time,
    /// newest first. Rounds with equal start times keep their relative
    /// order, with formerly queued rounds ahead of older log entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reconcile`] wrapping the store failure. Neither
    /// collection is modified in that case.
    pub fn reconcile(&self) -> Result<usize> {
        if !self.connectivity.is_online() {
            debug!("Offline, skipping reconciliation");
            return Ok(0);
        }

        let migrated = self
            .store
            .atomically(|txn| {
                let queue: Vec<RoundLog> = txn.read_or_default(Collection::RoundsQueue)?;
                if queue.is_empty() {
                    return Ok(0);
                }

                let synced: Vec<RoundLog> = txn.read_or_default(Collection::RoundsSynced)?;
                let count = queue.len();
                let mut merged: Vec<RoundLog> = queue
                    .into_iter()
                    .map(|round| round.with_sync(SyncFlag::Synced))
                    .chain(synced)
                    .collect();
                merged.sort_by(|a, b| b.start_time.cmp(&a.start_time));

                txn.write(Collection::RoundsSynced, &merged)?;
                txn.write(Collection::RoundsQueue, &Vec::<RoundLog>::new())?;
                Ok(count)
            })
            .map_err(Error::reconcile)?;

        if migrated == 0 {
            debug!("Offline queue empty, nothing to reconcile");
        } else {
            info!(count = migrated, "Reconciled queued rounds");
        }
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;

    fn setup(online: bool) -> (Arc<Store>, Connectivity, Reconciler) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let connectivity = Connectivity::new(online);
        let reconciler = Reconciler::new(Arc::clone(&store), connectivity.clone());
        (store, connectivity, reconciler)
    }

    fn round(start_time: i64, sync: SyncFlag) -> RoundLog {
        let task = Task::new("Parking", "Gate check", "Carlos");
        RoundLog::for_task(&task, start_time, start_time + 1_000).with_sync(sync)
    }

    fn start_times(rounds: &[RoundLog]) -> Vec<i64> {
        rounds.iter().map(|r| r.start_time).collect()
    }

    #[test]
    fn test_empty_queue_returns_zero_without_writing() {
        let (store, _, reconciler) = setup(true);
        assert_eq!(reconciler.reconcile().unwrap(), 0);
        assert!(!store.contains(Collection::RoundsSynced).unwrap());
        assert!(!store.contains(Collection::RoundsQueue).unwrap());
    }

    #[test]
    fn test_offline_returns_zero_and_keeps_queue() {
        let (store, _, reconciler) = setup(false);
        store
            .write(Collection::RoundsQueue, &vec![round(1, SyncFlag::Pending)])
            .unwrap();

        assert_eq!(reconciler.reconcile().unwrap(), 0);
        let queue: Vec<RoundLog> = store.read_or_default(Collection::RoundsQueue).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_migrates_and_sorts_descending() {
        let (store, _, reconciler) = setup(true);
        store
            .write(
                Collection::RoundsSynced,
                &vec![round(4_000, SyncFlag::Synced), round(2_000, SyncFlag::Synced)],
            )
            .unwrap();
        store
            .write(
                Collection::RoundsQueue,
                &vec![round(3_000, SyncFlag::Pending), round(1_000, SyncFlag::Pending)],
            )
            .unwrap();

        assert_eq!(reconciler.reconcile().unwrap(), 2);

        let synced: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(start_times(&synced), vec![4_000, 3_000, 2_000, 1_000]);
        assert!(synced.iter().all(|r| r.sync.is_synced()));

        let queue: Vec<RoundLog> = store.read_or_default(Collection::RoundsQueue).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_only_sync_flag_changes() {
        let (store, _, reconciler) = setup(true);
        let mut pending = round(1_000, SyncFlag::Pending);
        pending.observations = "door left open".to_string();
        pending.seal();
        store
            .write(Collection::RoundsQueue, &vec![pending.clone()])
            .unwrap();

        reconciler.reconcile().unwrap();

        let synced: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(synced[0], pending.with_sync(SyncFlag::Synced));
        assert!(synced[0].verify_token());
    }

    #[test]
    fn test_equal_start_times_keep_queue_first() {
        let (store, _, reconciler) = setup(true);
        let old = round(1_000, SyncFlag::Synced);
        let queued = round(1_000, SyncFlag::Pending);
        store
            .write(Collection::RoundsSynced, &vec![old.clone()])
            .unwrap();
        store
            .write(Collection::RoundsQueue, &vec![queued.clone()])
            .unwrap();

        reconciler.reconcile().unwrap();

        let synced: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(synced[0].id, queued.id);
        assert_eq!(synced[1].id, old.id);
    }

    #[test]
    fn test_second_call_is_a_no_op() {
        let (store, _, reconciler) = setup(true);
        store
            .write(Collection::RoundsQueue, &vec![round(1, SyncFlag::Pending)])
            .unwrap();

        assert_eq!(reconciler.reconcile().unwrap(), 1);
        let before: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(reconciler.reconcile().unwrap(), 0);
        let after: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failure_leaves_both_collections_untouched() {
        let (store, _, reconciler) = setup(true);
        let mut big = round(1, SyncFlag::Pending);
        big.observations = "y".repeat(128 * 1024);
        store.write(Collection::RoundsQueue, &vec![big]).unwrap();
        store.set_quota_bytes(1).unwrap();

        let err = reconciler.reconcile().unwrap_err();
        assert!(matches!(err, Error::Reconcile { .. }));
        assert!(err.is_storage_full());

        store.set_quota_bytes(0).unwrap();
        let queue: Vec<RoundLog> = store.read_or_default(Collection::RoundsQueue).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(!store.contains(Collection::RoundsSynced).unwrap());
    }

    #[test]
    fn test_concurrent_calls_migrate_once() {
        let (store, _, reconciler) = setup(true);
        let queued: Vec<RoundLog> = (0..20).map(|i| round(i, SyncFlag::Pending)).collect();
        store.write(Collection::RoundsQueue, &queued).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reconciler = reconciler.clone();
                std::thread::spawn(move || reconciler.reconcile().unwrap())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 20);
        let synced: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(synced.len(), 20);
    }
}
