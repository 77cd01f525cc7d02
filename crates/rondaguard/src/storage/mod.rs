//! Storage layer for rondaguard.
//!
//! This module provides the durable on-device store. It holds six independent
//! collections, each persisted as one JSON document in `SQLite`:
//! - `users`, `tasks`, `templates`, `settings`
//! - `rounds_synced` (the canonical history) and `rounds_queue` (the offline queue)
//!
//! A single mutex guards the connection. Multi-collection read-modify-write
//! sequences go through [`Store::atomically`], which holds that mutex for the
//! whole closure and runs it inside one transaction.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::RoundLog;

/// Page ceiling that `SQLite` treats as "no limit".
const UNLIMITED_PAGES: i64 = 4_294_967_294;

/// The named collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// User accounts.
    Users,
    /// Inspection tasks.
    Tasks,
    /// Checklist templates.
    Templates,
    /// Report branding settings.
    Settings,
    /// Canonical round history, sorted by start time descending.
    RoundsSynced,
    /// Rounds saved while offline, newest first.
    RoundsQueue,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::Users,
        Self::Tasks,
        Self::Templates,
        Self::Settings,
        Self::RoundsSynced,
        Self::RoundsQueue,
    ];

    /// Storage key of the collection.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::Templates => "templates",
            Self::Settings => "settings",
            Self::RoundsSynced => "rounds_synced",
            Self::RoundsQueue => "rounds_queue",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Durable collection store.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, the single point of mutual exclusion.
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Store opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cap the database size. Zero removes the cap.
    ///
    /// The cap never drops below the pages already in use, so existing data
    /// stays readable; only growth is refused, with [`Error::StorageFull`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be applied.
    pub fn set_quota_bytes(&self, bytes: u64) -> Result<()> {
        let conn = self.lock()?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        let pages = if bytes == 0 {
            UNLIMITED_PAGES
        } else {
            let page_size = u64::try_from(page_size.max(1)).unwrap_or(4096);
            i64::try_from(bytes.div_ceil(page_size)).unwrap_or(UNLIMITED_PAGES)
        };

        let effective: i64 =
            conn.pragma_update_and_check(None, "max_page_count", pages, |row| row.get(0))?;
        debug!("Store quota set to {} pages of {} bytes", effective, page_size);
        Ok(())
    }

    /// Read a collection, or `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is corrupt.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Option<T>> {
        let conn = self.lock()?;
        read_collection(&conn, collection)
    }

    /// Read a collection, falling back to the type's default when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is corrupt.
    pub fn read_or_default<T: DeserializeOwned + Default>(
        &self,
        collection: Collection,
    ) -> Result<T> {
        Ok(self.read(collection)?.unwrap_or_default())
    }

    /// Replace a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the write is refused.
    pub fn write<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) -> Result<()> {
        let conn = self.lock()?;
        write_collection(&conn, collection, value)
    }

    /// Check whether a collection has ever been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn contains(&self, collection: Collection) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE key = ?1",
            [collection.key()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Run `f` with exclusive access to the store inside one transaction.
    ///
    /// If `f` or the commit fails, every write made through the transaction is
    /// rolled back and the error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the transaction cannot be
    /// started or committed.
    pub fn atomically<R>(&self, f: impl FnOnce(&StoreTxn<'_>) -> Result<R>) -> Result<R> {
        let mut conn = self.lock()?;
        let txn = StoreTxn {
            tx: conn.transaction()?,
        };
        let output = f(&txn)?;
        txn.tx.commit()?;
        Ok(output)
    }

    /// Remove every round from both round collections.
    ///
    /// History is append-only; this exists for resets, not for editing.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn clear_rounds(&self) -> Result<()> {
        self.atomically(|txn| {
            txn.write(Collection::RoundsSynced, &Vec::<RoundLog>::new())?;
            txn.write(Collection::RoundsQueue, &Vec::<RoundLog>::new())
        })?;
        info!("Cleared all rounds");
        Ok(())
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (synced_rounds, pending_rounds) = {
            let conn = self.lock()?;
            (
                array_len(&conn, Collection::RoundsSynced)?,
                array_len(&conn, Collection::RoundsQueue)?,
            )
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            synced_rounds,
            pending_rounds,
            db_size_bytes,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}

/// Exclusive, transactional view of the store handed to [`Store::atomically`].
#[derive(Debug)]
pub struct StoreTxn<'a> {
    tx: Transaction<'a>,
}

impl StoreTxn<'_> {
    /// Read a collection, or `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is corrupt.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Option<T>> {
        read_collection(&self.tx, collection)
    }

    /// Read a collection, falling back to the type's default when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is corrupt.
    pub fn read_or_default<T: DeserializeOwned + Default>(
        &self,
        collection: Collection,
    ) -> Result<T> {
        Ok(self.read(collection)?.unwrap_or_default())
    }

    /// Replace a collection within the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the write is refused.
    pub fn write<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) -> Result<()> {
        write_collection(&self.tx, collection, value)
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Rounds in the synced log.
    pub synced_rounds: u64,
    /// Rounds waiting in the offline queue.
    pub pending_rounds: u64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn read_collection<T: DeserializeOwned>(
    conn: &Connection,
    collection: Collection,
) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM collections WHERE key = ?1",
            [collection.key()],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        debug!("Collection {} not yet written", collection);
        return Ok(None);
    };

    debug!("Read {} bytes from {}", raw.len(), collection);
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| Error::CorruptCollection {
            collection: collection.key(),
            source,
        })
}

fn write_collection<T: Serialize + ?Sized>(
    conn: &Connection,
    collection: Collection,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        r"
        INSERT INTO collections (key, value, updated_at)
        VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        ",
        (collection.key(), &raw),
    )?;
    debug!("Wrote {} bytes to {}", raw.len(), collection);
    Ok(())
}

fn array_len(conn: &Connection, collection: Collection) -> Result<u64> {
    let len: Option<i64> = conn
        .query_row(
            "SELECT json_array_length(value) FROM collections WHERE key = ?1",
            [collection.key()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(len.map_or(0, |n| u64::try_from(n).unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportConfig, SyncFlag, Task};

    fn create_test_store() -> Store {
        Store::open_in_memory().expect("failed to create test store")
    }

    fn create_test_round(start_time: i64) -> RoundLog {
        let task = Task::new("Warehouse", "Night patrol", "João");
        RoundLog::for_task(&task, start_time, start_time + 60_000)
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_path() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_collection_keys_are_unique() {
        let mut keys: Vec<_> = Collection::ALL.iter().map(|c| c.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Collection::ALL.len());
    }

    #[test]
    fn test_read_missing_collection() {
        let store = create_test_store();
        let rounds: Option<Vec<RoundLog>> = store.read(Collection::RoundsSynced).unwrap();
        assert!(rounds.is_none());
        assert!(!store.contains(Collection::RoundsSynced).unwrap());

        let settings: ReportConfig = store.read_or_default(Collection::Settings).unwrap();
        assert_eq!(settings, ReportConfig::default());
    }

    #[test]
    fn test_write_and_read() {
        let store = create_test_store();
        let rounds = vec![create_test_round(1_000).with_sync(SyncFlag::Synced)];

        store.write(Collection::RoundsSynced, &rounds).unwrap();
        assert!(store.contains(Collection::RoundsSynced).unwrap());

        let loaded: Vec<RoundLog> = store.read_or_default(Collection::RoundsSynced).unwrap();
        assert_eq!(loaded, rounds);
    }

    #[test]
    fn test_overwrite_replaces_document() {
        let store = create_test_store();
        store
            .write(Collection::Templates, &vec!["a".to_string()])
            .unwrap();
        store
            .write(Collection::Templates, &vec!["b".to_string(), "c".to_string()])
            .unwrap();

        let loaded: Vec<String> = store.read_or_default(Collection::Templates).unwrap();
        assert_eq!(loaded, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_corrupt_collection() {
        let store = create_test_store();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO collections (key, value) VALUES ('tasks', '{not json')",
                [],
            )
            .unwrap();

        let err = store.read::<Vec<Task>>(Collection::Tasks).unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptCollection {
                collection: "tasks",
                ..
            }
        ));
        assert!(err.is_store_error());
    }

    #[test]
    fn test_atomically_commits() {
        let store = create_test_store();
        store
            .atomically(|txn| {
                txn.write(Collection::RoundsQueue, &vec![create_test_round(1)])?;
                txn.write(Collection::RoundsSynced, &Vec::<RoundLog>::new())
            })
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending_rounds, 1);
        assert_eq!(stats.synced_rounds, 0);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let store = create_test_store();
        store
            .write(Collection::RoundsQueue, &vec![create_test_round(1)])
            .unwrap();

        let result: Result<()> = store.atomically(|txn| {
            txn.write(Collection::RoundsQueue, &Vec::<RoundLog>::new())?;
            Err(Error::internal("abort"))
        });
        assert!(result.is_err());

        let queue: Vec<RoundLog> = store.read_or_default(Collection::RoundsQueue).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_quota_refuses_growth() {
        let store = create_test_store();
        store
            .write(Collection::RoundsQueue, &vec![create_test_round(1)])
            .unwrap();
        store.set_quota_bytes(1).unwrap();

        let mut big = create_test_round(2);
        big.observations = "x".repeat(256 * 1024);
        let err = store
            .write(Collection::RoundsQueue, &vec![big])
            .unwrap_err();
        assert!(err.is_storage_full(), "unexpected error: {err}");

        let queue: Vec<RoundLog> = store.read_or_default(Collection::RoundsQueue).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_quota_zero_is_unlimited() {
        let store = create_test_store();
        store.set_quota_bytes(1).unwrap();
        store.set_quota_bytes(0).unwrap();

        let mut big = create_test_round(2);
        big.observations = "x".repeat(256 * 1024);
        store.write(Collection::RoundsQueue, &vec![big]).unwrap();
    }

    #[test]
    fn test_clear_rounds() {
        let store = create_test_store();
        store
            .write(Collection::RoundsQueue, &vec![create_test_round(1)])
            .unwrap();
        store
            .write(Collection::RoundsSynced, &vec![create_test_round(2)])
            .unwrap();

        store.clear_rounds().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending_rounds, 0);
        assert_eq!(stats.synced_rounds, 0);
    }

    #[test]
    fn test_stats_empty() {
        let store = create_test_store();
        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                synced_rounds: 0,
                pending_rounds: 0,
                db_size_bytes: 0,
            }
        );
    }

    #[test]
    fn test_open_file_based_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("rondaguard.db");

        {
            let store = Store::open(&db_path).unwrap();
            store
                .write(Collection::RoundsQueue, &vec![create_test_round(1)])
                .unwrap();
            assert_eq!(store.path(), db_path);
        }

        let reopened = Store::open(&db_path).unwrap();
        let stats = reopened.stats().unwrap();
        assert_eq!(stats.pending_rounds, 1);
        assert!(stats.db_size_bytes > 0);
    }
}
