// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage engine traits
//!
//! The transaction controller never mutates data itself. Every change goes
//! through a storage engine that applies it, hands back an opaque token able
//! to reverse it, and finally makes a transaction's changes durable.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::types::StorageResult;
use crate::txn::log::ChangeRecord;
use crate::txn::state::TransactionId;

/// Contract between the transaction controller and the engine that owns
/// the data
///
/// Isolation between sessions is the engine's business; the controller only
/// relies on the three calls below.
pub trait StorageEngine: Send + Sync {
    /// Logical change understood by the engine
    type Operation;

    /// Opaque handle sufficient to reverse one applied operation
    type UndoToken: Clone + Debug + Send;

    /// Execute a logical change and return the token that reverses it
    fn apply(
        &self,
        transaction_id: TransactionId,
        operation: Self::Operation,
    ) -> StorageResult<Self::UndoToken>;

    /// Reverse exactly the change described by `token`
    fn undo(&self, transaction_id: TransactionId, token: &Self::UndoToken) -> StorageResult<()>;

    /// Durably and atomically commit all listed changes
    ///
    /// `changes` are in creation order.
    fn finalize(
        &self,
        transaction_id: TransactionId,
        changes: &[ChangeRecord<Self::UndoToken>],
    ) -> StorageResult<()>;
}

/// Key-value change understood by the reference engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOperation {
    /// Insert or overwrite `key`
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove `key` if present
    Delete { key: Vec<u8> },
}

impl KvOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        KvOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        KvOperation::Delete { key: key.into() }
    }

    /// Key touched by this operation
    pub fn key(&self) -> &[u8] {
        match self {
            KvOperation::Put { key, .. } | KvOperation::Delete { key } => key,
        }
    }
}

/// Undo token for a key-value change: the key and what it held before
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvUndo {
    pub key: Vec<u8>,
    pub previous: Option<Vec<u8>>,
}

/// Key-value engine with read access, implemented by the reference engines
pub trait KeyValueEngine: StorageEngine<Operation = KvOperation, UndoToken = KvUndo> {
    /// Read the current value of `key`
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// All key-value pairs in key order
    fn scan(&self) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Number of transactions finalized so far
    fn commit_count(&self) -> StorageResult<usize>;
}

/// Record written by the reference engines when a transaction finalizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub transaction_id: u64,
    pub positions: Vec<u64>,
    pub keys: Vec<Vec<u8>>,
}

impl CommitRecord {
    pub fn from_changes(transaction_id: TransactionId, changes: &[ChangeRecord<KvUndo>]) -> Self {
        Self {
            transaction_id: transaction_id.id(),
            positions: changes.iter().map(|c| c.position.value()).collect(),
            keys: changes.iter().map(|c| c.token.key.clone()).collect(),
        }
    }
}
