//! Profile switching logic.
//!
//! This module implements the core mechanism of `awsprof`: promoting a stored
//! profile to the live AWS configuration. A switch:
//! - Backs up the live `config` and `credentials` to `<path>.backup`.
//! - Installs the profile's `config` verbatim.
//! - Installs the profile's `credentials` with its own section renamed to `[default]`.
//!
//! Two commit modes exist. [`CommitMode::Sequential`] performs the steps one
//! after another and keeps whatever was already written when a later step
//! fails; the `.backup` files are the recovery path. [`CommitMode::Staged`]
//! reads and validates everything first and renames both new files into place
//! at the end, so the live pair is never left half-switched.
//!
//! Every switch and restore runs under an exclusive advisory lock on
//! `<live config>.lock`.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::credentials::{HeaderOutcome, promote_to_default};
use crate::error::{Step, SwitchError, SwitchResult};
use crate::fs_utils::{backup_path, read_if_exists, resolve_link, stage_file, write_atomic};
use crate::paths::Paths;
use crate::profiles::{CONFIG_FILE, CREDENTIALS_FILE, Profile};

/// The live configuration pair the AWS tooling reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePaths {
    pub config: PathBuf,
    pub credentials: PathBuf,
}

impl From<&Paths> for LivePaths {
    fn from(paths: &Paths) -> Self {
        Self {
            config: paths.live_config.clone(),
            credentials: paths.live_credentials.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Backup, install config, install credentials; no rollback
    #[default]
    Sequential,
    /// Validate everything, stage both files, rename both into place
    Staged,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchOptions {
    pub mode: CommitMode,
    /// Fail instead of installing credentials that have no `[<profile>]` section
    pub strict_header: bool,
}

/// What a committed switch did
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub profile: String,
    pub header: HeaderOutcome,
    pub config_backup: PathBuf,
    pub credentials_backup: PathBuf,
    pub mode: CommitMode,
}

/// Switch the live pair to the profile stored in `profile_dir`, sequentially
pub fn switch_to(
    profile_dir: &Path,
    live_config: &Path,
    live_credentials: &Path,
) -> SwitchResult<SwitchReport> {
    let profile = Profile::from_dir(profile_dir).unwrap_or_else(|| Profile {
        name: profile_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        dir: profile_dir.to_path_buf(),
    });
    let live = LivePaths {
        config: live_config.to_path_buf(),
        credentials: live_credentials.to_path_buf(),
    };
    switch_with(&profile, &live, SwitchOptions::default())
}

/// Switch the live pair to `profile` using the given options
pub fn switch_with(
    profile: &Profile,
    live: &LivePaths,
    options: SwitchOptions,
) -> SwitchResult<SwitchReport> {
    // No baseline to protect means nothing to lock beside either
    if !live.config.exists() {
        return Err(SwitchError::LiveConfigMissing {
            path: live.config.clone(),
        });
    }

    let _lock = SwitchLock::acquire(&live.config)?;
    info!(profile = %profile.name, mode = ?options.mode, "switching profile");

    let header = match options.mode {
        CommitMode::Sequential => run_sequential(profile, live, options)?,
        CommitMode::Staged => run_staged(profile, live, options)?,
    };

    info!(profile = %profile.name, ?header, "switch committed");
    Ok(SwitchReport {
        profile: profile.name.clone(),
        header,
        config_backup: backup_path(&live.config),
        credentials_backup: backup_path(&live.credentials),
        mode: options.mode,
    })
}

fn run_sequential(
    profile: &Profile,
    live: &LivePaths,
    options: SwitchOptions,
) -> SwitchResult<HeaderOutcome> {
    let old_config = read_live(&live.config, Step::BackupConfig)?;
    write_backup(&live.config, &old_config, Step::BackupConfig)?;

    let old_credentials = read_live(&live.credentials, Step::BackupCredentials)?;
    write_backup(&live.credentials, &old_credentials, Step::BackupCredentials)?;

    let config = read_profile_file(profile, CONFIG_FILE, Step::InstallConfig)?;
    write_live(&live.config, &config, Step::InstallConfig)?;
    debug!(path = %live.config.display(), "installed config");

    let raw = read_profile_file(profile, CREDENTIALS_FILE, Step::InstallCredentials)?;
    let (credentials, header) = promote(profile, &raw, options)?;
    write_live(&live.credentials, &credentials, Step::InstallCredentials)?;
    debug!(path = %live.credentials.display(), "installed credentials");

    Ok(header)
}

fn run_staged(
    profile: &Profile,
    live: &LivePaths,
    options: SwitchOptions,
) -> SwitchResult<HeaderOutcome> {
    // Gather and validate every input before touching the live directory
    let old_config = read_live(&live.config, Step::BackupConfig)?;
    let old_credentials = read_live(&live.credentials, Step::BackupCredentials)?;
    let config = read_profile_file(profile, CONFIG_FILE, Step::InstallConfig)?;
    let raw = read_profile_file(profile, CREDENTIALS_FILE, Step::InstallCredentials)?;
    let (credentials, header) = promote(profile, &raw, options)?;

    write_backup(&live.config, &old_config, Step::BackupConfig)?;
    write_backup(&live.credentials, &old_credentials, Step::BackupCredentials)?;

    // Renaming over a symlink would replace the link, so commit to its target
    let config_target = resolve_link(&live.config);
    let credentials_target = resolve_link(&live.credentials);

    let staged_config = stage_file(&config_target, &config)
        .map_err(|source| write_failure(Step::InstallConfig, &live.config, source))?;
    let staged_credentials = stage_file(&credentials_target, &credentials)
        .map_err(|source| write_failure(Step::InstallCredentials, &live.credentials, source))?;
    debug!("staged config and credentials");

    staged_config
        .persist(&config_target)
        .map_err(|e| write_failure(Step::Commit, &live.config, e.error))?;

    if let Err(e) = staged_credentials.persist(&credentials_target) {
        // Put the old config back so the pair stays consistent
        if let Err(rollback) = write_atomic(&live.config, &old_config) {
            warn!(
                path = %live.config.display(),
                error = %rollback,
                "failed to roll back config; restore it from the backup"
            );
        }
        return Err(write_failure(Step::Commit, &live.credentials, e.error));
    }

    Ok(header)
}

fn promote(
    profile: &Profile,
    credentials: &[u8],
    options: SwitchOptions,
) -> SwitchResult<(Vec<u8>, HeaderOutcome)> {
    let (rewritten, header) = promote_to_default(credentials, &profile.name);
    if header == HeaderOutcome::Unchanged {
        if options.strict_header {
            return Err(SwitchError::DefaultSectionMissing {
                profile: profile.name.clone(),
            });
        }
        warn!(
            profile = %profile.name,
            "credentials have no [{}] section; installing them unchanged",
            profile.name
        );
    }
    Ok((rewritten, header))
}

fn read_live(path: &Path, step: Step) -> SwitchResult<Vec<u8>> {
    match read_if_exists(path) {
        Ok(Some(bytes)) => Ok(bytes),
        Ok(None) => Err(match step {
            Step::BackupCredentials => SwitchError::LiveCredentialsMissing {
                path: path.to_path_buf(),
            },
            _ => SwitchError::LiveConfigMissing {
                path: path.to_path_buf(),
            },
        }),
        Err(source) => Err(read_failure(step, path, source)),
    }
}

fn read_profile_file(profile: &Profile, file: &'static str, step: Step) -> SwitchResult<Vec<u8>> {
    let path = profile.dir.join(file);
    read_if_exists(&path)
        .map_err(|source| read_failure(step, &path, source))?
        .ok_or_else(|| missing_member(profile, file, path.clone()))
}

fn write_backup(live: &Path, contents: &[u8], step: Step) -> SwitchResult<()> {
    let backup = backup_path(live);
    fs::write(&backup, contents).map_err(|source| write_failure(step, &backup, source))?;
    debug!(path = %backup.display(), "wrote backup");
    Ok(())
}

fn write_live(path: &Path, contents: &[u8], step: Step) -> SwitchResult<()> {
    fs::write(path, contents).map_err(|source| write_failure(step, path, source))
}

fn missing_member(profile: &Profile, file: &'static str, path: PathBuf) -> SwitchError {
    SwitchError::ProfileFileMissing {
        profile: profile.name.clone(),
        file,
        path,
    }
}

fn read_failure(step: Step, path: &Path, source: io::Error) -> SwitchError {
    SwitchError::ReadFailure {
        step,
        path: path.to_path_buf(),
        source,
    }
}

fn write_failure(step: Step, path: &Path, source: io::Error) -> SwitchError {
    SwitchError::WriteFailure {
        step,
        path: path.to_path_buf(),
        source,
    }
}

/// Which live files a restore put back
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub config: bool,
    pub credentials: bool,
}

/// Copy each existing `.backup` over its live file.
///
/// Live files without a backup are left alone. Backups are kept.
pub fn restore_backups(live: &LivePaths) -> SwitchResult<RestoreReport> {
    let _lock = SwitchLock::acquire(&live.config)?;
    let mut report = RestoreReport::default();

    for (path, step, restored) in [
        (&live.config, Step::RestoreConfig, &mut report.config),
        (
            &live.credentials,
            Step::RestoreCredentials,
            &mut report.credentials,
        ),
    ] {
        let backup = backup_path(path);
        let Some(bytes) = read_if_exists(&backup).map_err(|e| read_failure(step, &backup, e))?
        else {
            debug!(path = %backup.display(), "no backup to restore");
            continue;
        };
        write_atomic(path, &bytes).map_err(|e| write_failure(step, path, e))?;
        info!(path = %path.display(), "restored from backup");
        *restored = true;
    }

    Ok(report)
}

/// Path of the advisory lock guarding the live pair
pub fn lock_path(live_config: &Path) -> PathBuf {
    let mut name = live_config.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive advisory lock on the live configuration, released on drop
pub struct SwitchLock {
    file: File,
    path: PathBuf,
}

impl SwitchLock {
    /// Acquire the lock beside `live_config`, blocking while another switch holds it
    pub fn acquire(live_config: &Path) -> SwitchResult<Self> {
        let path = lock_path(live_config);
        let lock_failure = |source| SwitchError::LockFailure {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_failure)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() != fs2::lock_contended_error().kind() {
                return Err(lock_failure(e));
            }
            info!(path = %path.display(), "waiting for another switch to finish");
            file.lock_exclusive().map_err(lock_failure)?;
        }

        debug!(path = %path.display(), "acquired switch lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SwitchLock {
    fn drop(&mut self) {
        // Release the lock (ignore errors during drop)
        let _ = FileExt::unlock(&self.file);
    }
}

/// Represents the status of a live file such as ~/.aws/credentials
#[derive(Debug, PartialEq, Eq)]
pub enum LiveFileStatus {
    Missing,
    RegularFile { len: u64 },
    Symlink { target: PathBuf },
    NotAFile,
}

impl LiveFileStatus {
    pub fn detect(path: &Path) -> Self {
        // symlink_metadata so a link is reported as a link
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => match fs::read_link(path) {
                Ok(target) => Self::Symlink { target },
                Err(_) => Self::Symlink {
                    target: PathBuf::from("?"),
                },
            },
            Ok(meta) if meta.is_file() => Self::RegularFile { len: meta.len() },
            Ok(_) => Self::NotAFile,
            Err(_) => Self::Missing,
        }
    }
}
