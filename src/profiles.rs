//! Profile store.
//!
//! A profile is a directory under the store root holding a `config` and a
//! `credentials` file in the AWS CLI's native format. Profiles are only ever
//! read; nothing here writes inside a profile directory.

use anyhow::{Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{SwitchError, SwitchResult};

/// File name of a profile's config member
pub const CONFIG_FILE: &str = "config";
/// File name of a profile's credentials member
pub const CREDENTIALS_FILE: &str = "credentials";

/// A stored profile, identified by its directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub dir: PathBuf,
}

impl Profile {
    /// Build a profile from its directory; the name is the final path component.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        let name = dir.file_name()?.to_str()?.to_string();
        Some(Self { name, dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }
}

/// List the profile names under `root`, in filesystem enumeration order.
///
/// Only directories are returned. Names that are not valid UTF-8 are skipped.
pub fn list_profiles(root: &Path) -> SwitchResult<Vec<String>> {
    let unavailable = |source| SwitchError::StoreUnavailable {
        path: root.to_path_buf(),
        source,
    };

    let mut profiles = Vec::new();
    for entry in fs::read_dir(root).map_err(unavailable)? {
        let entry = entry.map_err(unavailable)?;
        let path = entry.path();
        if path.is_dir()
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            profiles.push(name.to_string());
        }
    }

    debug!(root = %root.display(), count = profiles.len(), "listed profiles");
    Ok(profiles)
}

/// Check if a profile exists
pub fn profile_exists(root: &Path, name: &str) -> bool {
    root.join(name).is_dir()
}

/// Look up a profile by name, failing with a hint when it does not exist
pub fn find_profile(root: &Path, name: &str) -> Result<Profile> {
    validate_profile_name(name)?;
    if !profile_exists(root, name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'awsprof list' to see available profiles.",
            name
        );
    }
    match Profile::from_dir(root.join(name)) {
        Some(profile) => Ok(profile),
        None => bail!("Invalid profile directory name: {}", name),
    }
}

/// Validate a profile name given on the command line.
///
/// Rejects names that would escape the store root.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Profile name cannot be empty");
    }

    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        bail!(
            "Invalid profile name '{}'.\n\n Profile names must be a single directory name inside the store.",
            name
        );
    }

    Ok(())
}
