//! Optional user settings read from `<store>/.awsprof.json`.
//!
//! Every field has a default, so a missing file or a partial one both work.
//! Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::switch::{CommitMode, SwitchOptions};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Command run after a switch to show the active identity
    pub identity_command: Vec<String>,
    /// Identity output lines containing this token are highlighted
    pub highlight_token: String,
    /// Stage both live files and rename them into place together
    pub atomic: bool,
    /// Refuse credentials without a `[<profile>]` section
    pub strict_header: bool,
    /// Run the identity command after switching
    pub verify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            identity_command: vec![
                "aws".to_string(),
                "sts".to_string(),
                "get-caller-identity".to_string(),
            ],
            highlight_token: "Arn".to_string(),
            atomic: false,
            strict_header: false,
            verify: true,
        }
    }
}

impl Settings {
    /// Read settings, returning defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    pub fn switch_options(&self) -> SwitchOptions {
        SwitchOptions {
            mode: if self.atomic {
                CommitMode::Staged
            } else {
                CommitMode::Sequential
            },
            strict_header: self.strict_header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load(&temp_dir.path().join(".awsprof.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.identity_command[0], "aws");
        assert_eq!(settings.switch_options().mode, CommitMode::Sequential);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".awsprof.json");
        std::fs::write(&path, r#"{"atomic": true, "highlight_token": "Account"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.atomic);
        assert_eq!(settings.highlight_token, "Account");
        assert!(settings.verify);
        assert_eq!(settings.switch_options().mode, CommitMode::Staged);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".awsprof.json");
        std::fs::write(&path, "atomic = true").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
