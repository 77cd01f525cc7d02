//! Error types for rondaguard.
//!
//! This module defines all error types used throughout the rondaguard crate.
//! Store failures are always surfaced to the caller; queued (offline) saves are
//! reported through [`crate::sync::Ack`] and never through this type.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rondaguard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The store quota is exhausted.
    #[error("storage is full: {0}")]
    StorageFull(rusqlite::Error),

    /// A stored collection could not be decoded.
    #[error("collection '{collection}' is corrupt: {source}")]
    CorruptCollection {
        /// Name of the collection.
        collection: &'static str,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    // === Sync Errors ===
    /// A reconciliation attempt failed before the queue was migrated.
    #[error("reconciliation failed, queue left untouched: {source}")]
    Reconcile {
        /// The failure that aborted the reconciliation.
        #[source]
        source: Box<Error>,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Domain Errors ===
    /// A round with this id has already been recorded.
    #[error("round {id} has already been recorded")]
    DuplicateRound {
        /// Id of the round.
        id: String,
    },

    /// A round failed validation before submission.
    #[error("invalid round: {message}")]
    InvalidRound {
        /// Description of the problem.
        message: String,
    },

    /// A record was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record (user, task, template).
        kind: &'static str,
        /// Id that was looked up.
        id: String,
    },

    /// Invalid input supplied by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Email and password did not match an account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but is deactivated.
    #[error("user is inactive")]
    UserInactive,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rondaguard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::DiskFull) {
            Self::StorageFull(err)
        } else {
            Self::DatabaseQuery(err)
        }
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a new invalid round error.
    #[must_use]
    pub fn invalid_round(message: impl Into<String>) -> Self {
        Self::InvalidRound {
            message: message.into(),
        }
    }

    /// Create a not found error for the given record kind.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wrap a failure that aborted a reconciliation.
    #[must_use]
    pub fn reconcile(source: Self) -> Self {
        Self::Reconcile {
            source: Box::new(source),
        }
    }

    /// Check if this error came from the durable store.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        match self {
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::StorageFull(_)
            | Self::CorruptCollection { .. }
            | Self::LockPoisoned => true,
            Self::Reconcile { source } => source.is_store_error(),
            _ => false,
        }
    }

    /// Check if this error means the store quota is exhausted.
    #[must_use]
    pub fn is_storage_full(&self) -> bool {
        match self {
            Self::StorageFull(_) => true,
            Self::Reconcile { source } => source.is_storage_full(),
            _ => false,
        }
    }
}
