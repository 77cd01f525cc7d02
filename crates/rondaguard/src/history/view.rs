//! Merged read path over both round collections.

use std::sync::Arc;

use crate::error::Result;
use crate::model::RoundLog;
use crate::storage::{Collection, Store};

/// Read-only view over the round history.
#[derive(Debug, Clone)]
pub struct HistoryView {
    store: Arc<Store>,
}

impl HistoryView {
    /// Create a view over the given store.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Every round, queued entries first, then the synced log.
    ///
    /// Each part keeps its stored order: the queue newest-submitted first,
    /// the synced log by start time descending. There is no re-sort across
    /// the two, so a pending round always appears above synced ones. Use
    /// [`RoundFilter::apply`](super::RoundFilter::apply) for a strictly
    /// time-ordered list.
    ///
    /// # Errors
    ///
    /// Returns an error if either collection cannot be read.
    pub fn list_rounds(&self) -> Result<Vec<RoundLog>> {
        self.store.atomically(|txn| {
            let mut rounds: Vec<RoundLog> = txn.read_or_default(Collection::RoundsQueue)?;
            let synced: Vec<RoundLog> = txn.read_or_default(Collection::RoundsSynced)?;
            rounds.extend(synced);
            Ok(rounds)
        })
    }

    /// Rounds still waiting in the offline queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn pending_rounds(&self) -> Result<Vec<RoundLog>> {
        self.store.read_or_default(Collection::RoundsQueue)
    }

    /// Look up a single round by id in either collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collections cannot be read.
    pub fn find(&self, id: &str) -> Result<Option<RoundLog>> {
        Ok(self.list_rounds()?.into_iter().find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SyncFlag, Task};

    fn round(start_time: i64, sync: SyncFlag) -> RoundLog {
        let task = Task::new("Kitchen", "Gas valves", "Ana");
        RoundLog::for_task(&task, start_time, start_time + 10_000).with_sync(sync)
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let view = HistoryView::new(Arc::new(Store::open_in_memory().unwrap()));
        assert!(view.list_rounds().unwrap().is_empty());
        assert!(view.pending_rounds().unwrap().is_empty());
    }

    #[test]
    fn test_queue_is_listed_before_synced_regardless_of_time() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let old_pending = round(1_000, SyncFlag::Pending);
        let new_synced = round(9_000, SyncFlag::Synced);
        store
            .write(Collection::RoundsQueue, &vec![old_pending.clone()])
            .unwrap();
        store
            .write(Collection::RoundsSynced, &vec![new_synced.clone()])
            .unwrap();

        let view = HistoryView::new(store);
        let rounds = view.list_rounds().unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].id, old_pending.id);
        assert_eq!(rounds[1].id, new_synced.id);
        assert_eq!(view.pending_rounds().unwrap().len(), 1);
    }

    #[test]
    fn test_find() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let synced = round(5, SyncFlag::Synced);
        store
            .write(Collection::RoundsSynced, &vec![synced.clone()])
            .unwrap();

        let view = HistoryView::new(store);
        assert_eq!(view.find(&synced.id).unwrap(), Some(synced));
        assert!(view.find("missing").unwrap().is_none());
    }
}
