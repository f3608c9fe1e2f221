// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! txnscope - nested transactions and savepoints for a database session
//!
//! txnscope tracks the scope hierarchy of changes made inside one session's
//! transaction and drives a pluggable storage engine to apply, undo and
//! finalize them.
//!
//! # Features
//!
//! - **Transaction state machine**: `none`, `active`, `failed`,
//!   `committed`, `rolled_back`
//! - **Savepoints**: SAVEPOINT / RELEASE / ROLLBACK TO with reusable names
//! - **Reverse-order undo**: every discarded change is undone newest first
//! - **All-or-nothing commit**: a failed finalize rolls the transaction back
//! - **Reference engines**: in-memory map and Sled
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use txnscope::{KvOperation, MemoryEngine, SessionTransactionState, TransactionConfig};
//!
//! let engine = Arc::new(MemoryEngine::new());
//! let mut session = SessionTransactionState::new(engine, TransactionConfig::default());
//!
//! session.begin_transaction()?;
//! session.execute(KvOperation::put("a", "1"))?;
//! session.savepoint("s1")?;
//! session.execute(KvOperation::put("b", "2"))?;
//! session.rollback_to_savepoint("s1")?;
//! session.commit_transaction()?;
//! ```

pub mod config;
pub mod session;
pub mod storage;
pub mod txn;

pub use config::{ConfigError, TransactionConfig};
pub use session::{SessionHandle, SessionManager, SessionTransactionState};
pub use storage::{
    create_engine, CommitRecord, EngineType, KeyValueEngine, KvOperation, KvUndo, MemoryEngine,
    StorageEngine, StorageFault, StorageResult,
};
#[cfg(feature = "sled-backend")]
pub use storage::SledEngine;
pub use txn::{
    ChangeLog, ChangePosition, ChangeRecord, Savepoint, SavepointStack, TransactionController,
    TransactionError, TransactionId, TransactionResult, TransactionStatistics, TransactionStatus,
    TransactionSummary, TxnOperation,
};

/// txnscope version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// txnscope crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
