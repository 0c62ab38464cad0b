//! AudioShelf configuration
//!
//! Preference storage consulted by the sync engine: author delimiters,
//! grouping policy, directory allow/block lists, the force-rescan flag and
//! the last-sync timestamp.
//!
//! - **Trait-based sections**: each section implements `ConfigSection`
//! - **Atomic writes**: config files are never left in a corrupted state
//! - **Graceful degradation**: invalid values warn on load, error on save

mod directory_config;
mod error;
mod persistence;
mod sync_config;
mod validation;

pub use directory_config::DirectoryConfig;
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use persistence::ConfigStore;
pub use sync_config::SyncConfig;
pub use validation::{ConfigSection, Validator};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Sync preferences
    pub sync: SyncConfig,

    /// Directory allow/block lists
    pub directories: DirectoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            sync: SyncConfig::default(),
            directories: DirectoryConfig::default(),
        }
    }
}

impl Config {
    /// Validates the entire configuration, collecting all section errors
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.sync.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.directories.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_across_sections() {
        let mut config = Config::default();
        config.sync.author_delimiters = vec!["".to_string()];
        config.directories.allowed = vec![PathBuf::from("relative/path")];

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_version_defaults_to_current() {
        assert_eq!(Config::default().version, CONFIG_VERSION);
    }
}
