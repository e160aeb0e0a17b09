//! Engine configuration
//!
//! Loaded from a TOML file; every field is optional.
//!
//! ```toml
//! max_variables = 16384
//! max_array_items = 1048576
//! max_call_depth = 512
//! rand_seed = 42
//! keep_stat_text_on_goto = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Most variables alive at once before TOOMANYVARS
    pub max_variables: usize,
    /// Items one array may hold before TOOMANYITEMS
    pub max_array_items: usize,
    /// Nesting of GOSUB/FUNC/DYNAMIC calls before STACKOVERFLOW
    pub max_call_depth: usize,
    /// Fixed random seed; seeded from the clock when absent
    pub rand_seed: Option<u32>,
    /// GOTO leaves the stat text alone instead of clearing it
    pub keep_stat_text_on_goto: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_variables: 16384,
            max_array_items: 1 << 20,
            max_call_depth: 512,
            rand_seed: None,
            keep_stat_text_on_goto: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl EngineConfig {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = EngineConfig::from_toml("rand_seed = 7").unwrap();
        assert_eq!(config.rand_seed, Some(7));
        assert_eq!(config.max_variables, 16384);
        assert_eq!(config.max_array_items, 1 << 20);
        assert_eq!(config.max_call_depth, 512);
        assert!(config.keep_stat_text_on_goto);
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_bad_field_type() {
        assert!(EngineConfig::from_toml("max_call_depth = 'deep'").is_err());
    }
}
