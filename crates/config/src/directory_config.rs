//! Directory allow/block list section

use crate::validation::{ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory roots consulted by the directory rule resolver
///
/// An empty allow list blocks everything (deny by default).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Roots whose contents are permitted
    pub allowed: Vec<PathBuf>,

    /// Roots whose contents are excluded, overriding shallower allows
    pub blocked: Vec<PathBuf>,
}

impl ConfigSection for DirectoryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (i, path) in self.allowed.iter().chain(self.blocked.iter()).enumerate() {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    format!("directories[{}]", i),
                    "path must not be empty",
                ));
            } else if path.is_relative() {
                errors.push(ValidationError::with_value(
                    format!("directories[{}]", i),
                    "path must be absolute",
                    path.display(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn section_name(&self) -> &'static str {
        "directories"
    }
}
