// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction state management
//!
//! This module defines the transaction identifier, the lifecycle states
//! exposed to the session, and the live transaction value itself.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::log::ChangeLog;
use super::savepoint::SavepointStack;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate the next process-wide transaction ID
    pub fn next() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }

    /// Create TransactionId from u64 (used when replaying persisted journals)
    pub fn from_u64(id: u64) -> Self {
        TransactionId(id)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Transaction lifecycle states as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// No transaction; every operation runs in its own implicit transaction
    None,
    /// Transaction accepts changes and savepoints
    Active,
    /// An unrecoverable error occurred; only rollback (or rollback to a
    /// savepoint) is permitted
    Failed,
    /// Transaction was finalized
    Committed,
    /// Transaction was undone
    RolledBack,
}

impl TransactionStatus {
    /// Whether a live transaction exists in this state
    pub fn is_live(&self) -> bool {
        matches!(self, TransactionStatus::Active | TransactionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::None => "none",
            TransactionStatus::Active => "active",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One all-or-nothing unit of work owned by a session
///
/// Owns its change log and savepoint stack exclusively; both are dropped
/// with the transaction.
#[derive(Debug)]
pub struct Transaction<T> {
    /// Unique transaction identifier
    pub(crate) id: TransactionId,
    /// Either `Active` or `Failed` while the transaction is live
    pub(crate) status: TransactionStatus,
    /// Undoable changes in creation order
    pub(crate) change_log: ChangeLog<T>,
    /// Named checkpoints into the change log
    pub(crate) savepoints: SavepointStack,
    /// Why the transaction entered `Failed`
    pub(crate) failure: Option<String>,
    started_at: Instant,
}

impl<T> Transaction<T> {
    pub(crate) fn begin() -> Self {
        Self {
            id: TransactionId::next(),
            status: TransactionStatus::Active,
            change_log: ChangeLog::new(),
            savepoints: SavepointStack::new(),
            failure: None,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn change_log(&self) -> &ChangeLog<T> {
        &self.change_log
    }

    pub fn savepoints(&self) -> &SavepointStack {
        &self.savepoints
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Time since `begin`
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.status = TransactionStatus::Failed;
        self.failure = Some(reason);
    }

    pub(crate) fn recover(&mut self) {
        self.status = TransactionStatus::Active;
        self.failure = None;
    }
}
