use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::fs_utils::write_atomic;

/// Record of the last switch, kept in ~/.awsconfigs/.awsprof-state.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct State {
    /// The profile last promoted to [default]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,

    /// When that switch was committed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switched_at: Option<DateTime<Utc>>,
}

impl State {
    /// Read state from file, returning default if file doesn't exist
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {:?}", path))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content)
            .with_context(|| format!("Failed to parse state file: {:?}", path))
    }

    /// Write state without locking; see [`LockedState`] for concurrent writers
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        write_atomic(path, content.as_bytes())
            .with_context(|| format!("Failed to write state file: {:?}", path))
    }
}

/// Record `profile` as the active one, stamped with the current time
pub fn record_switch(path: &Path, profile: &str) -> Result<()> {
    let mut locked = LockedState::lock(path)?;
    locked.update(|s| s.active_profile = Some(profile.to_string()))
}

/// A locked state file handle for safe concurrent access
pub struct LockedState {
    file: File,
    state: State,
    path: PathBuf,
}

impl LockedState {
    /// Open and lock the state file for exclusive access.
    ///
    /// The store root must already exist; the state file lives inside it.
    pub fn lock(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open state file: {:?}", path))?;

        // Blocks until available
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock state file: {:?}", path))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read state file: {:?}", path))?;
        let state = State::parse(&content, path)?;

        Ok(Self {
            file,
            state,
            path: path.to_path_buf(),
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Apply `f`, stamp the switch time and save
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut State),
    {
        f(&mut self.state);
        self.state.switched_at = Some(Utc::now());
        self.save()
    }

    fn save(&mut self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.state).context("Failed to serialize state")?;

        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| self.file.write_all(content.as_bytes()))
            .and_then(|_| self.file.sync_all())
            .with_context(|| format!("Failed to write state file: {:?}", self.path))
    }
}

impl Drop for LockedState {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let state = State::read(&temp_dir.path().join("nonexistent.json")).unwrap();
        assert_eq!(state, State::default());
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let state = State {
            active_profile: Some("staging".to_string()),
            switched_at: Some(Utc::now()),
        };
        state.write(&path).unwrap();

        assert_eq!(State::read(&path).unwrap(), state);
    }

    #[test]
    fn test_record_switch_stamps_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        record_switch(&path, "prod").unwrap();

        let state = State::read(&path).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("prod"));
        assert!(state.switched_at.is_some());
    }

    #[test]
    fn test_locked_update_overwrites_longer_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        record_switch(&path, "a-very-long-profile-name").unwrap();

        {
            let mut locked = LockedState::lock(&path).unwrap();
            assert_eq!(
                locked.state().active_profile.as_deref(),
                Some("a-very-long-profile-name")
            );
            locked.update(|s| s.active_profile = Some("dev".to_string())).unwrap();
        }

        let state = State::read(&path).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("dev"));
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(State::read(&path).is_err());
    }
}
