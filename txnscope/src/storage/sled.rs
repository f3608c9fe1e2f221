// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage engine implementation
//!
//! Three trees:
//! - `data`: the key-value pairs, written as soon as a change is applied
//! - `journal`: one undo entry per applied change, keyed by
//!   `transaction id ++ sequence`, removed on undo and on finalize
//! - `commits`: one `CommitRecord` per finalized transaction, keyed by a
//!   sequence from `Db::generate_id` so records survive id reuse across
//!   restarts
//!
//! Journal entries left behind by a run that never finalized are replayed
//! newest first when the database is opened again.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::traits::{CommitRecord, KeyValueEngine, KvOperation, KvUndo, StorageEngine};
use super::types::{StorageFault, StorageResult};
use crate::txn::log::ChangeRecord;
use crate::txn::state::TransactionId;

const DATA_TREE: &str = "data";
const JOURNAL_TREE: &str = "journal";
const COMMITS_TREE: &str = "commits";

/// Persistent key-value engine backed by sled
pub struct SledEngine {
    db: sled::Db,
    data: sled::Tree,
    journal: sled::Tree,
    commits: sled::Tree,
    recovered: usize,
}

fn journal_key(transaction_id: u64, sequence: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&transaction_id.to_be_bytes());
    key[8..].copy_from_slice(&sequence.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn parse_journal_key(key: &[u8]) -> Option<(u64, u64)> {
    if key.len() != 16 {
        return None;
    }
    Some((decode_u64(&key[..8])?, decode_u64(&key[8..])?))
}

impl SledEngine {
    /// Open or create a sled engine at `path`, rolling back any transaction
    /// a previous run left unfinished
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        let data = db.open_tree(DATA_TREE)?;
        let journal = db.open_tree(JOURNAL_TREE)?;
        let commits = db.open_tree(COMMITS_TREE)?;
        let mut engine = Self {
            db,
            data,
            journal,
            commits,
            recovered: 0,
        };
        engine.recovered = engine.recover()?;
        Ok(engine)
    }

    /// Number of unfinished transactions rolled back when this engine opened
    pub fn recovered_transactions(&self) -> usize {
        self.recovered
    }

    /// Every commit record in finalize order
    pub fn commit_records(&self) -> StorageResult<Vec<CommitRecord>> {
        self.commits
            .iter()
            .map(|item| -> StorageResult<CommitRecord> {
                let (_, bytes) = item?;
                Ok(bincode::deserialize(&bytes)?)
            })
            .collect()
    }

    /// Most recent commit record written for `transaction_id`
    pub fn commit_record(&self, transaction_id: TransactionId) -> StorageResult<Option<CommitRecord>> {
        for item in self.commits.iter().rev() {
            let (_, bytes) = item?;
            let record: CommitRecord = bincode::deserialize(&bytes)?;
            if record.transaction_id == transaction_id.id() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Number of journal entries still pending undo or finalize
    pub fn pending_changes(&self) -> usize {
        self.journal.len()
    }

    fn restore(&self, undo: &KvUndo) -> StorageResult<()> {
        match &undo.previous {
            Some(value) => {
                self.data.insert(&undo.key, value.as_slice())?;
            }
            None => {
                self.data.remove(&undo.key)?;
            }
        }
        Ok(())
    }

    /// Flush every tree to disk
    pub fn flush(&self) -> StorageResult<()> {
        self.db
            .flush()
            .map_err(|e| StorageFault::Durability(e.to_string()))?;
        Ok(())
    }

    /// Replay the journal of every transaction without a later commit record
    fn recover(&self) -> StorageResult<usize> {
        let mut pending = Vec::new();
        for item in self.journal.iter() {
            let (key, bytes) = item?;
            let Some((transaction_id, sequence)) = parse_journal_key(&key) else {
                log::warn!("sled engine: skipping malformed journal key {:?}", key);
                continue;
            };
            let undo: KvUndo = bincode::deserialize(&bytes)?;
            pending.push((transaction_id, sequence, undo));
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let mut last_change: HashMap<u64, u64> = HashMap::new();
        for (transaction_id, sequence, _) in &pending {
            let last = last_change.entry(*transaction_id).or_insert(*sequence);
            *last = (*last).max(*sequence);
        }
        let oldest = pending.iter().map(|(_, sequence, _)| *sequence).min().unwrap_or(0);

        // Transaction ids restart with the process; only a record written
        // after the transaction's last change counts as its commit
        let mut committed = HashSet::new();
        for item in self.commits.iter().rev() {
            let (key, bytes) = item?;
            let Some(sequence) = decode_u64(&key) else {
                continue;
            };
            if sequence < oldest {
                break;
            }
            let record: CommitRecord = bincode::deserialize(&bytes)?;
            if last_change
                .get(&record.transaction_id)
                .map_or(false, |last| sequence > *last)
            {
                committed.insert(record.transaction_id);
            }
        }

        pending.retain(|(transaction_id, _, _)| !committed.contains(transaction_id));
        pending.sort_by(|a, b| b.1.cmp(&a.1));

        let mut rolled_back = HashSet::new();
        for (transaction_id, _, undo) in &pending {
            self.restore(undo)?;
            rolled_back.insert(*transaction_id);
        }
        for transaction_id in &rolled_back {
            log::warn!(
                "sled engine: rolled back {} left unfinished by a previous run",
                TransactionId::from_u64(*transaction_id)
            );
        }

        self.journal.clear()?;
        self.flush()?;
        Ok(rolled_back.len())
    }
}

impl StorageEngine for SledEngine {
    type Operation = KvOperation;
    type UndoToken = KvUndo;

    fn apply(
        &self,
        transaction_id: TransactionId,
        operation: KvOperation,
    ) -> StorageResult<KvUndo> {
        let previous = self.data.get(operation.key())?.map(|v| v.to_vec());
        let undo = KvUndo {
            key: operation.key().to_vec(),
            previous,
        };

        // Journal before data so a crash never leaves an unjournaled write
        let entry = journal_key(transaction_id.id(), self.db.generate_id()?);
        self.journal.insert(entry, bincode::serialize(&undo)?)?;

        let written = match operation {
            KvOperation::Put { key, value } => self.data.insert(key, value).map(|_| ()),
            KvOperation::Delete { key } => self.data.remove(key).map(|_| ()),
        };
        if let Err(err) = written {
            if let Err(cleanup) = self.journal.remove(entry) {
                log::error!(
                    "sled engine: {} could not drop journal entry after failed write: {}",
                    transaction_id,
                    cleanup
                );
            }
            return Err(err.into());
        }

        log::debug!(
            "sled engine: {} applied change to {:?}",
            transaction_id,
            String::from_utf8_lossy(&undo.key)
        );
        Ok(undo)
    }

    fn undo(&self, transaction_id: TransactionId, token: &KvUndo) -> StorageResult<()> {
        self.restore(token)?;

        // Undo runs newest first, so the token is the transaction's last entry
        let prefix = transaction_id.id().to_be_bytes();
        if let Some(item) = self.journal.scan_prefix(prefix).next_back() {
            let (entry, bytes) = item?;
            let journaled: KvUndo = bincode::deserialize(&bytes)?;
            if journaled == *token {
                self.journal.remove(entry)?;
            } else {
                log::warn!(
                    "sled engine: {} undo of {:?} does not match its last journal entry",
                    transaction_id,
                    String::from_utf8_lossy(&token.key)
                );
            }
        }
        Ok(())
    }

    fn finalize(
        &self,
        transaction_id: TransactionId,
        changes: &[ChangeRecord<KvUndo>],
    ) -> StorageResult<()> {
        let mut batch = sled::Batch::default();
        for item in self.journal.scan_prefix(transaction_id.id().to_be_bytes()) {
            let (entry, _) = item?;
            batch.remove(entry);
        }

        let record = CommitRecord::from_changes(transaction_id, changes);
        let sequence = self.db.generate_id()?;
        self.commits
            .insert(sequence.to_be_bytes(), bincode::serialize(&record)?)?;
        self.journal.apply_batch(batch)?;
        self.flush()
    }
}

impl KeyValueEngine for SledEngine {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.get(key)?.map(|v| v.to_vec()))
    }

    fn scan(&self) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.data
            .iter()
            .map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(StorageFault::from)
            })
            .collect()
    }

    fn commit_count(&self) -> StorageResult<usize> {
        Ok(self.commits.len())
    }
}
