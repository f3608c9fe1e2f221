// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction configuration and presets

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Session-level transaction configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Wrap each operation outside an explicit transaction in an implicit one
    pub auto_commit: bool,

    /// Maximum number of live savepoints per transaction (`None` = unlimited)
    pub max_savepoint_depth: Option<usize>,

    /// Allow a savepoint name to be defined again while an earlier one with
    /// the same name is still live
    pub allow_duplicate_savepoint_names: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            auto_commit: true,
            max_savepoint_depth: None,
            allow_duplicate_savepoint_names: true,
        }
    }
}

impl TransactionConfig {
    /// Explicit transactions only, unique savepoint names, bounded nesting
    pub fn strict() -> Self {
        Self {
            auto_commit: false,
            max_savepoint_depth: Some(64),
            allow_duplicate_savepoint_names: false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_savepoint_depth == Some(0) {
            return Err("max_savepoint_depth must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TransactionConfig = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
