// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store and processor configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration document
///
/// ```toml
/// [store]
/// wal_path = "/var/lib/wr/revisions.wal"
///
/// [processor]
/// workers = 4
/// lock_timeout = "250ms"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub processor: ProcessorConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.processor.workers == 0 {
            return Err(ConfigError::Invalid(
                "processor.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Write-ahead log location; `None` keeps everything in memory
    pub wal_path: Option<PathBuf>,
    /// fsync after every appended entry
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            wal_path: None,
            sync_writes: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Concurrent loop workers sharing one store
    pub workers: usize,
    /// How long a worker waits for a due chain's lock; zero only probes
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            lock_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
