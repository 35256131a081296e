use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::fs_utils::backup_path;

/// Environment variable overriding the profile store root
pub const STORE_ENV: &str = "AWSPROF_HOME";
/// Environment variable the AWS CLI reads for the config file location
pub const CONFIG_FILE_ENV: &str = "AWS_CONFIG_FILE";
/// Environment variable the AWS CLI reads for the credentials file location
pub const CREDENTIALS_FILE_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// All computed paths used by awsprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.awsconfigs, one subdirectory per profile
    pub store_dir: PathBuf,
    /// ~/.awsconfigs/.awsprof-state.json
    pub state_file: PathBuf,
    /// ~/.awsconfigs/.awsprof.json
    pub settings_file: PathBuf,
    /// ~/.aws/config
    pub live_config: PathBuf,
    /// ~/.aws/credentials
    pub live_credentials: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::resolve(base_dirs.home_dir(), |key| std::env::var_os(key)))
    }

    /// Resolve paths relative to `home`, letting `lookup` supply environment overrides.
    pub fn resolve<F>(home: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let store_dir = non_empty(STORE_ENV).unwrap_or_else(|| home.join(".awsconfigs"));
        let aws_dir = home.join(".aws");
        let live_config = non_empty(CONFIG_FILE_ENV).unwrap_or_else(|| aws_dir.join("config"));
        let live_credentials =
            non_empty(CREDENTIALS_FILE_ENV).unwrap_or_else(|| aws_dir.join("credentials"));

        Self::with_store(store_dir, live_config, live_credentials)
    }

    /// Build paths from an explicit store root and live file pair
    pub fn with_store(store_dir: PathBuf, live_config: PathBuf, live_credentials: PathBuf) -> Self {
        Self {
            state_file: store_dir.join(".awsprof-state.json"),
            settings_file: store_dir.join(".awsprof.json"),
            store_dir,
            live_config,
            live_credentials,
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    pub fn config_backup(&self) -> PathBuf {
        backup_path(&self.live_config)
    }

    pub fn credentials_backup(&self) -> PathBuf {
        backup_path(&self.live_credentials)
    }

    /// Ensure the store root exists, returning `true` if it had to be created
    pub fn ensure_store(&self) -> Result<bool> {
        if self.store_dir.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.store_dir).with_context(|| {
            format!(
                "Failed to create profile store directory: {:?}",
                self.store_dir
            )
        })?;
        Ok(true)
    }
}
