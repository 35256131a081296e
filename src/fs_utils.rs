//! Filesystem utility functions
//!
//! Helpers shared by the switch engine: backup path derivation, reads that
//! distinguish a missing file from an unreadable one, and staged writes.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Suffix appended to a live file path to name its single backup
pub const BACKUP_SUFFIX: &str = ".backup";

/// Derive the backup path for a live file: the live path plus `.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Read a file's bytes, returning `Ok(None)` when it does not exist
pub fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Follow `path` to the file it points at when it is a symlink.
///
/// A rename replaces the link itself, so staged writes go to the resolved
/// target. Anything that is not a resolvable link comes back unchanged.
pub fn resolve_link(path: &Path) -> PathBuf {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Write `contents` to a temporary file beside `target`, flushed to disk.
///
/// The temporary inherits `target`'s permissions when `target` exists, so
/// persisting it over `target` does not change the file mode. Nothing is
/// visible at `target` until the returned file is persisted. Pass a path
/// from [`resolve_link`] when `target` may be a symlink.
pub fn stage_file(target: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".awsprof-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(target) {
        fs::set_permissions(staged.path(), meta.permissions())?;
    }

    Ok(staged)
}

/// Replace `target` with `contents` via a staged temporary and a rename.
///
/// A symlinked `target` keeps its link; the file it points at is replaced.
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let target = resolve_link(target);
    let staged = stage_file(&target, contents)?;
    staged.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/home/op/.aws/credentials")),
            PathBuf::from("/home/op/.aws/credentials.backup")
        );
    }

    #[test]
    fn test_read_if_exists_missing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(read_if_exists(&missing).unwrap().is_none());
    }

    #[test]
    fn test_read_directory_is_error_not_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_if_exists(temp_dir.path()).is_err());
    }

    #[test]
    fn test_stage_file_invisible_until_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("config");
        fs::write(&target, "old").unwrap();

        let staged = stage_file(&target, b"new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        staged.persist(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("config");
        fs::write(&target, "old").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&target, b"new").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_through_symlink_keeps_link() {
        let temp_dir = TempDir::new().unwrap();
        let dotfiles = temp_dir.path().join("dotfiles");
        fs::create_dir_all(&dotfiles).unwrap();
        let real = dotfiles.join("credentials");
        fs::write(&real, "old").unwrap();
        let link = temp_dir.path().join("credentials");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(resolve_link(&link), fs::canonicalize(&real).unwrap());
        write_atomic(&link, b"new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "new");
    }

    #[test]
    fn test_resolve_link_leaves_plain_paths() {
        let temp_dir = TempDir::new().unwrap();
        let plain = temp_dir.path().join("config");
        assert_eq!(resolve_link(&plain), plain);
        fs::write(&plain, "x").unwrap();
        assert_eq!(resolve_link(&plain), plain);
    }
}
