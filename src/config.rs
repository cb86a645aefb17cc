//! Configuration for structer.
//!
//! Provides centralized limits for mapping inputs and for walking structures whose length
//! comes from target data (link-map chains, note segments, archive members).

use crate::error::Result;
use crate::io::error::IoError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructerConfig {
    /// Limits applied when mapping input files.
    pub io: IoConfig,
    /// Caps on data-driven walks.
    pub limits: WalkLimits,
}

impl StructerConfig {
    /// Parse a configuration from JSON; absent keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(IoError::access(path))?;
        Self::from_json_str(&text)
    }
}

/// I/O configuration for memory-mapped inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Largest file that may be mapped (default: 64 GiB, core dumps get big).
    pub max_file_size: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_file_size: 64 * 1024 * 1024 * 1024,
        }
    }
}

/// Upper bounds for walks whose length is read from the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkLimits {
    /// Maximum link-map nodes visited before the chain is declared cyclic.
    pub max_link_map_entries: usize,
    /// Maximum notes decoded from one image.
    pub max_notes: usize,
    /// Maximum members read from one archive.
    pub max_archive_members: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_link_map_entries: 4096,
            max_notes: 65536,
            max_archive_members: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StructerConfig::default();
        assert_eq!(config.limits.max_link_map_entries, 4096);
        assert_eq!(config.io.max_file_size, 64 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            StructerConfig::from_json_str(r#"{"limits": {"max_link_map_entries": 8}}"#).unwrap();
        assert_eq!(config.limits.max_link_map_entries, 8);
        assert_eq!(config.limits.max_notes, 65536);
        assert_eq!(config.io, IoConfig::default());
    }

    #[test]
    fn test_round_trip_json() {
        let mut config = StructerConfig::default();
        config.io.max_file_size = 1024;
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(StructerConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = StructerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, crate::error::StructerError::Config(_)));
    }
}
