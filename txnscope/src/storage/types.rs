// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage engine types and error handling
//!
//! This module defines the fault type reported by storage engines and the
//! engine selector used by the factory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fault reported by a storage engine when it cannot apply, undo or
/// finalize a change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageFault {
    /// A constraint prevents the change (or its reversal)
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The durability step could not complete
    #[error("durability failure: {0}")]
    Durability(String),

    /// Backend-specific failure (I/O, corrupted tree, ...)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Encoding a record for persistence failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage engine operations
pub type StorageResult<T> = Result<T, StorageFault>;

#[cfg(feature = "sled-backend")]
impl From<sled::Error> for StorageFault {
    fn from(err: sled::Error) -> Self {
        StorageFault::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StorageFault {
    fn from(err: bincode::Error) -> Self {
        StorageFault::Serialization(err.to_string())
    }
}

/// Storage engine selector
///
/// Specifies which reference engine backs a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineType {
    /// Memory - in-memory ordered map
    /// Best for: Unit testing, exploration
    Memory,

    /// Sled - Pure Rust embedded database
    /// Best for: Persistent sessions
    Sled,
}

impl Default for EngineType {
    fn default() -> Self {
        EngineType::Memory
    }
}

impl std::str::FromStr for EngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(EngineType::Memory),
            "sled" => Ok(EngineType::Sled),
            _ => Err(format!(
                "Unknown engine type: {}. Valid options: memory, sled",
                s
            )),
        }
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineType::Memory => "memory",
            EngineType::Sled => "sled",
        };
        write!(f, "{}", name)
    }
}
