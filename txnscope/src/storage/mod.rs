// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage engine boundary
//!
//! The transaction controller reaches the data only through the
//! [`StorageEngine`] trait: `apply` a change and get an undo token back,
//! `undo` a token, `finalize` a transaction's ordered change list.
//!
//! # Architecture
//!
//! ```text
//! SessionTransactionState (session layer)
//!     ↓
//! TransactionController (scope hierarchy, state machine)
//!     ↓
//! StorageEngine (apply / undo / finalize)
//!     ↓
//! Reference engines (Memory, Sled)
//! ```

// Core modules
pub mod factory;
pub mod traits;
pub mod types;

// Engine implementations
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;

// Public API re-exports
pub use factory::create_engine;
pub use memory::MemoryEngine;
#[cfg(feature = "sled-backend")]
pub use self::sled::SledEngine;
pub use traits::{CommitRecord, KeyValueEngine, KvOperation, KvUndo, StorageEngine};
pub use types::{EngineType, StorageFault, StorageResult};
