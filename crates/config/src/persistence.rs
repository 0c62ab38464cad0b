//! File system persistence for configuration
//!
//! Atomic writes (no partial/corrupted files), directory creation, and
//! graceful error handling. All errors are surfaced via Result types.

use crate::{Config, ConfigError, ConfigResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handles configuration file persistence
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Creates a persistence handler for the given config file path
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Creates a persistence handler rooted at the platform config dir
    pub fn at_default_location() -> ConfigResult<Self> {
        let dirs = directories::ProjectDirs::from("org", "audioshelf", "audioshelf").ok_or_else(
            || ConfigError::PathResolutionError {
                reason: "no home directory available".to_string(),
            },
        )?;
        Ok(Self::new(dirs.config_dir().join("audioshelf.toml")))
    }

    /// Returns the path this store reads and writes
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    ///
    /// If the file doesn't exist, returns the default config. An empty or
    /// whitespace-only file is treated as corrupted, not as defaults.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::ReadError {
                path: self.config_path.clone(),
                source: e,
            })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.config_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Config file is empty or contains only whitespace",
                ),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.config_path.clone(),
            source: e,
        })?;

        // Warn but do not fail: users can fix invalid values without
        // losing the rest of the file
        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            log::warn!("Config validation warnings: {}", error_msg);
        }

        Ok(config)
    }

    /// Saves configuration to file atomically
    ///
    /// Uses a temporary file and atomic rename so the config file is never
    /// left in a corrupted state.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConfigError::ValidationError(error_msg));
        }

        if let Some(parent) = self.config_path.parent() {
            self.ensure_directory_exists(parent)?;
        }

        let toml_string = toml::to_string_pretty(config).map_err(ConfigError::SerializeError)?;

        let temp_file = self.create_temp_file()?;
        self.write_atomic(temp_file, &toml_string)?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    fn ensure_directory_exists(&self, path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| ConfigError::DirectoryCreationError {
                path: path.to_path_buf(),
                source: e,
            })?;
            log::info!("Created config directory: {}", path.display());
        }
        Ok(())
    }

    fn create_temp_file(&self) -> ConfigResult<NamedTempFile> {
        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Config path has no parent directory".to_string(),
            })?;

        NamedTempFile::new_in(dir).map_err(ConfigError::IoError)
    }

    fn write_atomic(&self, mut temp_file: NamedTempFile, content: &str) -> ConfigResult<()> {
        temp_file
            .write_all(content.as_bytes())
            .map_err(ConfigError::IoError)?;
        temp_file.flush().map_err(ConfigError::IoError)?;

        temp_file
            .persist(&self.config_path)
            .map_err(|e| ConfigError::WriteError {
                path: self.config_path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("audioshelf.toml");
        (temp_dir, config_path)
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        let config = store.load().expect("Should load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        let mut config = Config::default();
        config.sync.author_delimiters = vec!["&".to_string(), "feat.".to_string()];
        config.sync.last_sync_ms = 1700000000000;
        config.directories.allowed = vec![PathBuf::from("/audiobooks")];

        store.save(&config).expect("Should save config");
        let loaded = store.load().expect("Should load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("subdir").join("audioshelf.toml");
        let store = ConfigStore::new(config_path.clone());

        store
            .save(&Config::default())
            .expect("Should create directory and save");

        assert!(config_path.exists());
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "   \n").expect("Should write file");

        let store = ConfigStore::new(config_path);
        assert!(matches!(
            store.load().unwrap_err(),
            ConfigError::ReadError { .. }
        ));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let (_temp_dir, config_path) = setup_test_dir();
        fs::write(&config_path, "this is not valid TOML {{{").expect("Should write file");

        let store = ConfigStore::new(config_path);
        assert!(matches!(
            store.load().unwrap_err(),
            ConfigError::ParseError { .. }
        ));
    }

    #[test]
    fn test_validate_before_save() {
        let (_temp_dir, config_path) = setup_test_dir();
        let store = ConfigStore::new(config_path);

        let mut config = Config::default();
        config.sync.last_sync_ms = -7;

        assert!(matches!(
            store.save(&config).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }
}
