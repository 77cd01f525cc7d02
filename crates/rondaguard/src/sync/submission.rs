//! Round submission.
//!
//! A finished round is written exactly once, into exactly one collection,
//! chosen by the connectivity flag at the moment of submission.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{RoundLog, SyncFlag};
use crate::storage::{Collection, Store};

use super::Connectivity;

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ack {
    /// The round was written to the synced log.
    Synced,
    /// The round was saved to the offline queue and awaits reconciliation.
    Queued,
}

impl Ack {
    /// Check if the round is still pending.
    #[must_use]
    pub fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "saved"),
            Self::Queued => write!(f, "saved offline, pending sync"),
        }
    }
}

/// Records finished rounds in the store.
#[derive(Debug, Clone)]
pub struct RoundSubmitter {
    store: Arc<Store>,
    connectivity: Connectivity,
}

impl RoundSubmitter {
    /// Create a submitter over the given store and connectivity flag.
    #[must_use]
    pub fn new(store: Arc<Store>, connectivity: Connectivity) -> Self {
        Self {
            store,
            connectivity,
        }
    }

    /// Record a finished round.
    ///
    /// Online, the round is inserted at the head of the synced log with its
    /// flag set to synced. Offline, it is inserted at the head of the queue
    /// with its flag set to pending, and [`Ack::Queued`] is returned. No other
    /// field of the round is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRound`] for a round without an id,
    /// [`Error::DuplicateRound`] if the id is already recorded in either
    /// collection, and any store error (including [`Error::StorageFull`]) if
    /// the write fails. Nothing is written on error.
    pub fn submit_round(&self, log: RoundLog) -> Result<Ack> {
        if log.id.trim().is_empty() {
            return Err(Error::invalid_round("round id is empty"));
        }

        let (ack, target, other) = if self.connectivity.is_online() {
            (Ack::Synced, Collection::RoundsSynced, Collection::RoundsQueue)
        } else {
            (Ack::Queued, Collection::RoundsQueue, Collection::RoundsSynced)
        };
        let log = log.with_sync(match ack {
            Ack::Synced => SyncFlag::Synced,
            Ack::Queued => SyncFlag::Pending,
        });
        let id = log.id.clone();

        self.store.atomically(|txn| {
            let mut rounds: Vec<RoundLog> = txn.read_or_default(target)?;
            let elsewhere: Vec<RoundLog> = txn.read_or_default(other)?;
            if rounds.iter().chain(&elsewhere).any(|r| r.id == log.id) {
                return Err(Error::DuplicateRound { id: log.id.clone() });
            }

            rounds.insert(0, log);
            txn.write(target, &rounds)
        })?;

        match ack {
            Ack::Synced => info!(round = %id, "Round saved"),
            Ack::Queued => warn!(round = %id, "Offline, round saved to queue"),
        }
        Ok(ack)
    }
}
