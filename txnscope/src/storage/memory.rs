// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage engine implementation for testing

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};

use super::traits::{CommitRecord, KeyValueEngine, KvOperation, KvUndo, StorageEngine};
use super::types::{StorageFault, StorageResult};
use crate::txn::log::ChangeRecord;
use crate::txn::state::TransactionId;

/// In-memory key-value engine
///
/// Changes are visible as soon as they are applied; `finalize` records the
/// transaction in an in-memory commit history. Faults can be injected to
/// exercise the controller's failure paths.
#[derive(Default)]
pub struct MemoryEngine {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    commits: RwLock<Vec<CommitRecord>>,
    faults: Mutex<FaultPlan>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    undo_keys: HashSet<Vec<u8>>,
    fail_next_finalize: bool,
}

impl MemoryEngine {
    /// Create an empty memory engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every undo touching `key` fault until faults are cleared
    pub fn fail_undo_for_key(&self, key: impl Into<Vec<u8>>) {
        self.faults.lock().undo_keys.insert(key.into());
    }

    /// Make the next `finalize` call fault
    pub fn fail_next_finalize(&self) {
        self.faults.lock().fail_next_finalize = true;
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        *self.faults.lock() = FaultPlan::default();
    }

    /// Commit history in finalize order
    pub fn commit_history(&self) -> Vec<CommitRecord> {
        self.commits.read().clone()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StorageEngine for MemoryEngine {
    type Operation = KvOperation;
    type UndoToken = KvUndo;

    fn apply(
        &self,
        transaction_id: TransactionId,
        operation: KvOperation,
    ) -> StorageResult<KvUndo> {
        let mut data = self.data.write();
        let undo = match operation {
            KvOperation::Put { key, value } => {
                let previous = data.insert(key.clone(), value);
                KvUndo { key, previous }
            }
            KvOperation::Delete { key } => {
                let previous = data.remove(&key);
                KvUndo { key, previous }
            }
        };
        log::debug!(
            "memory engine: {} applied change to {:?}",
            transaction_id,
            String::from_utf8_lossy(&undo.key)
        );
        Ok(undo)
    }

    fn undo(&self, transaction_id: TransactionId, token: &KvUndo) -> StorageResult<()> {
        if self.faults.lock().undo_keys.contains(&token.key) {
            return Err(StorageFault::Constraint(format!(
                "cannot restore key {:?} for {}",
                String::from_utf8_lossy(&token.key),
                transaction_id
            )));
        }

        let mut data = self.data.write();
        match &token.previous {
            Some(value) => {
                data.insert(token.key.clone(), value.clone());
            }
            None => {
                data.remove(&token.key);
            }
        }
        Ok(())
    }

    fn finalize(
        &self,
        transaction_id: TransactionId,
        changes: &[ChangeRecord<KvUndo>],
    ) -> StorageResult<()> {
        {
            let mut faults = self.faults.lock();
            if faults.fail_next_finalize {
                faults.fail_next_finalize = false;
                return Err(StorageFault::Durability(format!(
                    "commit record for {} could not be persisted",
                    transaction_id
                )));
            }
        }

        self.commits
            .write()
            .push(CommitRecord::from_changes(transaction_id, changes));
        Ok(())
    }
}

impl KeyValueEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(&self) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn commit_count(&self) -> StorageResult<usize> {
        Ok(self.commits.read().len())
    }
}
