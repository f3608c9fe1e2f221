//! Storage engine that records calls for assertions
//!
//! Operations and undo tokens are plain labels: applying `"t1"` returns the
//! undo token `"t1"`.

use parking_lot::Mutex;
use std::collections::HashSet;

use txnscope::{ChangeRecord, StorageEngine, StorageFault, StorageResult, TransactionId};

/// One call made by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Apply(String),
    Undo(String),
    Finalize(Vec<String>),
}

#[derive(Debug, Default)]
struct Faults {
    apply: HashSet<String>,
    undo: HashSet<String>,
    fail_next_finalize: bool,
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    faults: Mutex<Faults>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault every `apply` of `operation`
    pub fn fail_apply(&self, operation: &str) {
        self.faults.lock().apply.insert(operation.to_string());
    }

    /// Fault every `undo` of `token`
    pub fn fail_undo(&self, token: &str) {
        self.faults.lock().undo.insert(token.to_string());
    }

    /// Fault the next `finalize` only
    pub fn fail_next_finalize(&self) {
        self.faults.lock().fail_next_finalize = true;
    }

    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Undo tokens in invocation order, including ones that faulted
    pub fn undone(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Undo(token) => Some(token.clone()),
                _ => None,
            })
            .collect()
    }

    /// Token lists passed to each `finalize`, including ones that faulted
    pub fn finalized(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Finalize(tokens) => Some(tokens.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StorageEngine for RecordingEngine {
    type Operation = String;
    type UndoToken = String;

    fn apply(&self, _transaction_id: TransactionId, operation: String) -> StorageResult<String> {
        self.calls.lock().push(EngineCall::Apply(operation.clone()));
        if self.faults.lock().apply.contains(&operation) {
            return Err(StorageFault::Constraint(format!("cannot apply {}", operation)));
        }
        Ok(operation)
    }

    fn undo(&self, _transaction_id: TransactionId, token: &String) -> StorageResult<()> {
        self.calls.lock().push(EngineCall::Undo(token.clone()));
        if self.faults.lock().undo.contains(token) {
            return Err(StorageFault::Constraint(format!("cannot undo {}", token)));
        }
        Ok(())
    }

    fn finalize(
        &self,
        transaction_id: TransactionId,
        changes: &[ChangeRecord<String>],
    ) -> StorageResult<()> {
        let tokens = changes.iter().map(|c| c.token.clone()).collect();
        self.calls.lock().push(EngineCall::Finalize(tokens));

        let mut faults = self.faults.lock();
        if faults.fail_next_finalize {
            faults.fail_next_finalize = false;
            return Err(StorageFault::Durability(format!(
                "flush failed for {}",
                transaction_id
            )));
        }
        Ok(())
    }
}
