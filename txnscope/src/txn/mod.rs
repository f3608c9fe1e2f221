// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Nested transaction and savepoint management
//!
//! This module tracks the scope hierarchy of changes made inside one
//! session's transaction.
//!
//! # Features
//! - Transaction lifecycle (BEGIN, COMMIT, ROLLBACK)
//! - Named savepoints with SAVEPOINT, RELEASE and ROLLBACK TO
//! - Reverse-order undo through the storage engine's undo tokens
//! - A `failed` state that only rollback (or rollback to a savepoint) leaves
//!
//! # Components
//! - [`ChangeLog`]: ordered undoable change records, truncated with undo
//! - [`SavepointStack`]: named markers into the change log
//! - [`TransactionController`]: the state machine exposed to the session

pub mod controller;
pub mod error;
pub mod log;
pub mod savepoint;
pub mod state;
pub mod stats;

pub use controller::TransactionController;
pub use error::{TransactionError, TransactionResult, TxnOperation};
pub use log::{ChangeLog, ChangePosition, ChangeRecord, UndoFailure};
pub use savepoint::{Savepoint, SavepointError, SavepointStack};
pub use state::{Transaction, TransactionId, TransactionStatus};
pub use stats::{SavepointSummary, TransactionStatistics, TransactionSummary};
