//! Error types for the profile store and the switch engine.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The step of a switch that was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BackupConfig,
    BackupCredentials,
    InstallConfig,
    InstallCredentials,
    /// Staged mode only: renaming the staged files into place.
    Commit,
    RestoreConfig,
    RestoreCredentials,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::BackupConfig => "backup config",
            Step::BackupCredentials => "backup credentials",
            Step::InstallConfig => "install config",
            Step::InstallCredentials => "install credentials",
            Step::Commit => "commit",
            Step::RestoreConfig => "restore config",
            Step::RestoreCredentials => "restore credentials",
        };
        f.write_str(s)
    }
}

/// Errors raised while listing profiles or promoting one to the live configuration.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The store root could not be read
    #[error("Profile store is unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The selected profile lacks `config` or `credentials`
    #[error("Profile '{profile}' has no {file} file ({})", path.display())]
    ProfileFileMissing {
        profile: String,
        file: &'static str,
        path: PathBuf,
    },

    /// There is no live config to back up
    #[error("Live config file not found: {}", path.display())]
    LiveConfigMissing { path: PathBuf },

    /// There is no live credentials file to back up
    #[error("Live credentials file not found: {}", path.display())]
    LiveCredentialsMissing { path: PathBuf },

    /// A file exists but could not be read
    #[error("Failed to {step}: could not read {}: {source}", path.display())]
    ReadFailure {
        step: Step,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backup or install write failed
    #[error("Failed to {step}: could not write {}: {source}", path.display())]
    WriteFailure {
        step: Step,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile's credentials have no section named after the profile (strict mode)
    #[error("Profile '{profile}' credentials have no [{profile}] section to promote to [default]")]
    DefaultSectionMissing { profile: String },

    /// Another switch holds the live configuration lock
    #[error("Failed to lock live configuration ({}): {source}", path.display())]
    LockFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No profile was chosen
    #[error("No selection made")]
    SelectionCancelled,

    /// The external identity command errored
    #[error("Failed to get AWS caller identity ({command}): {reason}")]
    IdentityCheckFailed { command: String, reason: String },
}

/// Result type for store and engine operations.
pub type SwitchResult<T> = Result<T, SwitchError>;
