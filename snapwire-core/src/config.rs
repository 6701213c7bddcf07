//! Configuration for the snapshot store
//!
//! This module provides the configuration structure used to open a
//! [`SnapshotStore`](crate::SnapshotStore): where snapshots live and how
//! scalar payloads are compressed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::Codec;
use crate::compression::{NoCompression, ZlibCompressor};
use crate::{Result, SnapwireError};

/// Default snapshot directory, relative to the working directory.
pub const DEFAULT_SNAPSHOT_DIR: &str = "./snapshot";

/// Payload compression setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum CompressionSetting {
    /// Never compress payloads
    None,
    /// Zlib at the given level (0-9)
    Zlib { level: u32 },
}

impl Default for CompressionSetting {
    fn default() -> Self {
        CompressionSetting::Zlib { level: 6 }
    }
}

/// Configuration structure for the snapshot store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the snapshot files
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Payload compression
    #[serde(default)]
    pub compression: CompressionSetting,
}

fn default_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_DIR)
}

impl StoreConfig {
    /// Default configuration rooted at `dir`
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        StoreConfig {
            dir: dir.as_ref().to_path_buf(),
            compression: CompressionSetting::default(),
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SnapwireError::validation(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: StoreConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(SnapwireError::validation(
                "Snapshot directory must not be empty",
            ));
        }
        if let CompressionSetting::Zlib { level } = self.compression {
            if level > 9 {
                return Err(SnapwireError::validation(format!(
                    "Zlib level must be between 0 and 9, got {level}"
                )));
            }
        }
        Ok(())
    }

    /// Build the codec this configuration describes
    pub fn build_codec(&self) -> Codec {
        match self.compression {
            CompressionSetting::None => Codec::with_compressor(NoCompression::new()),
            CompressionSetting::Zlib { level } => {
                Codec::with_compressor(ZlibCompressor::with_level(level))
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_dir(DEFAULT_SNAPSHOT_DIR)
    }
}
