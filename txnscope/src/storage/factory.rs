// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage engine factory
//!
//! Creates one of the reference key-value engines from an [`EngineType`].

use std::path::Path;
use std::sync::Arc;

use super::memory::MemoryEngine;
use super::traits::KeyValueEngine;
use super::types::{EngineType, StorageResult};

/// Create a key-value engine of the requested type
///
/// `path` is ignored by the memory engine.
///
/// # Examples
/// ```ignore
/// let engine = create_engine(EngineType::Sled, "./data")?;
/// let session = SessionTransactionState::new(engine, TransactionConfig::default());
/// ```
pub fn create_engine<P: AsRef<Path>>(
    engine_type: EngineType,
    path: P,
) -> StorageResult<Arc<dyn KeyValueEngine>> {
    match engine_type {
        EngineType::Memory => Ok(Arc::new(MemoryEngine::new()) as Arc<dyn KeyValueEngine>),
        #[cfg(feature = "sled-backend")]
        EngineType::Sled => {
            use super::sled::SledEngine;
            let engine = SledEngine::open(path)?;
            Ok(Arc::new(engine) as Arc<dyn KeyValueEngine>)
        }
        #[cfg(not(feature = "sled-backend"))]
        EngineType::Sled => {
            let _ = path;
            Err(super::types::StorageFault::Backend(
                "sled engine not compiled in (enable the sled-backend feature)".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_engine() {
        let engine = create_engine(EngineType::Memory, "unused").unwrap();
        assert_eq!(engine.commit_count().unwrap(), 0);
    }

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_create_sled_engine() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let engine = create_engine(EngineType::Sled, temp_dir.path()).unwrap();
        assert!(engine.scan().unwrap().is_empty());
    }
}
