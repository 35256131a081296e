//! Test utilities shared across test modules

use std::fs;

use anyhow::Result;
use tempfile::TempDir;

use crate::paths::Paths;
use crate::select::Selector;

/// Create a Paths struct rooted in a temporary directory,
/// mimicking the real ~/.awsconfigs/ and ~/.aws/ layout.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_store(
        temp_dir.path().join(".awsconfigs"),
        temp_dir.path().join(".aws/config"),
        temp_dir.path().join(".aws/credentials"),
    )
}

/// Write a stored profile; `credentials: None` leaves that file out
pub fn write_profile(paths: &Paths, name: &str, config: &str, credentials: Option<&str>) {
    let dir = paths.profile_dir(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config"), config).unwrap();
    if let Some(credentials) = credentials {
        fs::write(dir.join("credentials"), credentials).unwrap();
    }
}

/// Write the live config pair
pub fn write_live(paths: &Paths, config: &str, credentials: &str) {
    if let Some(parent) = paths.live_config.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&paths.live_config, config).unwrap();
    fs::write(&paths.live_credentials, credentials).unwrap();
}

/// Selector that always returns the same answer
pub struct FixedSelector(pub Option<usize>);

impl Selector for FixedSelector {
    fn select(&self, _prompt: &str, _items: &[String]) -> Result<Option<usize>> {
        Ok(self.0)
    }
}
