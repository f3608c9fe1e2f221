// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction introspection: summaries and counters

use serde::{Deserialize, Serialize};

use super::state::{Transaction, TransactionStatus};

/// Snapshot of one savepoint for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavepointSummary {
    pub name: String,
    pub position: u64,
}

/// Serialisable view of a controller's current transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// `None` when no transaction is live
    pub transaction_id: Option<u64>,
    pub status: TransactionStatus,
    pub change_count: usize,
    pub savepoints: Vec<SavepointSummary>,
    pub failure: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl TransactionSummary {
    pub(crate) fn idle(status: TransactionStatus) -> Self {
        Self {
            transaction_id: None,
            status,
            change_count: 0,
            savepoints: Vec::new(),
            failure: None,
            elapsed_ms: None,
        }
    }

    pub(crate) fn of<T>(txn: &Transaction<T>) -> Self {
        Self {
            transaction_id: Some(txn.id().id()),
            status: txn.status(),
            change_count: txn.change_log().len(),
            savepoints: txn
                .savepoints()
                .iter()
                .map(|sp| SavepointSummary {
                    name: sp.name.clone(),
                    position: sp.position.value(),
                })
                .collect(),
            failure: txn.failure().map(str::to_string),
            elapsed_ms: Some(txn.elapsed().as_millis() as u64),
        }
    }
}

/// Lifetime counters of a controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatistics {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub commit_failures: u64,
    pub changes_recorded: u64,
    pub savepoints_created: u64,
    /// Undo calls issued to the storage engine, including ones that faulted
    pub undo_invocations: u64,
}

impl TransactionStatistics {
    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &TransactionStatistics) {
        self.begun += other.begun;
        self.committed += other.committed;
        self.rolled_back += other.rolled_back;
        self.commit_failures += other.commit_failures;
        self.changes_recorded += other.changes_recorded;
        self.savepoints_created += other.savepoints_created;
        self.undo_invocations += other.undo_invocations;
    }
}
