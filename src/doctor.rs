//! Diagnostic tool for awsprof.
//!
//! Implements `awsprof doctor`, which checks for the problems that make a
//! switch fail or leave the AWS CLI without a usable default identity:
//! - Missing store root or live files.
//! - Profiles lacking `config`/`credentials`.
//! - Credentials whose section is not named after the profile.
//! - Environment that overrides the default profile, or no identity command.

use anstyle::AnsiColor;
use std::env;
use std::path::Path;

use crate::commands::credential_sections;
use crate::credentials::DEFAULT_SECTION;
use crate::identity::IdentityCheck;
use crate::paths::Paths;
use crate::profiles::{CONFIG_FILE, CREDENTIALS_FILE, list_profiles};
use crate::settings::Settings;
use crate::state::State;
use crate::switch::LiveFileStatus;
use crate::ui::Ui;

/// Run the doctor diagnostics, returning `true` when no check failed
pub fn run_doctor(paths: &Paths, settings: &Settings, ui: &Ui) -> bool {
    ui.section("awsprof Doctor");
    ui.newline();

    let mut healthy = true;

    healthy &= check_step(ui, "Directories", || {
        if paths.store_dir.is_dir() {
            ui.println(format!(
                "  {} Profile store exists: {}",
                ui.icon_ok(),
                paths.store_dir.display()
            ));
        } else {
            ui.println(format!(
                "  {} Profile store missing: {} (created on first switch)",
                ui.icon_warn(),
                paths.store_dir.display()
            ));
        }
        // A missing store is created on demand
        true
    });

    healthy &= check_step(ui, "State File", || match State::read(&paths.state_file) {
        Ok(state) => {
            match &state.active_profile {
                Some(profile) if paths.profile_dir(profile).is_dir() => ui.println(format!(
                    "  {} Last switched to: {}",
                    ui.icon_info(),
                    profile
                )),
                Some(profile) => ui.println(format!(
                    "  {} Last switched to '{}', which no longer exists",
                    ui.icon_warn(),
                    profile
                )),
                None => ui.println(format!("  {} No switch recorded yet", ui.icon_info())),
            }
            true
        }
        Err(e) => {
            ui.println(format!("  {} State file corrupt: {:#}", ui.icon_err(), e));
            false
        }
    });

    healthy &= check_step(ui, "Live Files", || {
        let mut ok = true;
        for path in [&paths.live_config, &paths.live_credentials] {
            ok &= check_live_file(ui, path);
        }
        for backup in [paths.config_backup(), paths.credentials_backup()] {
            if backup.is_file() {
                ui.println(format!("  {} Backup present: {}", ui.icon_info(), backup.display()));
            }
        }
        ok
    });

    healthy &= check_step(ui, "Profiles", || {
        let profiles = match list_profiles(&paths.store_dir) {
            Ok(p) => p,
            Err(e) if !paths.store_dir.exists() => {
                ui.println(format!("  {} Skipped: {}", ui.icon_info(), e));
                return true;
            }
            Err(e) => {
                ui.println(format!("  {} {}", ui.icon_err(), e));
                return false;
            }
        };

        if profiles.is_empty() {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profiles:", profiles.len()));
        let mut all_valid = true;
        for name in profiles {
            all_valid &= check_profile(ui, &paths.profile_dir(&name), &name);
        }
        all_valid
    });

    healthy &= check_step(ui, "Environment", || {
        if let Ok(profile) = env::var("AWS_PROFILE") {
            ui.println(format!(
                "  {} AWS_PROFILE={} overrides the [default] profile awsprof installs",
                ui.icon_warn(),
                profile
            ));
        }

        match IdentityCheck::from_argv(&settings.identity_command) {
            Some(check) if on_path(check.program()) => {
                ui.println(format!("  {} Identity command: {}", ui.icon_ok(), check.display()));
                true
            }
            Some(check) => {
                ui.println(format!(
                    "  {} '{}' not found on PATH; identity checks will fail",
                    ui.icon_warn(),
                    check.program()
                ));
                true
            }
            None => {
                ui.println(format!("  {} identity_command is empty", ui.icon_err()));
                false
            }
        }
    });

    healthy
}

fn check_live_file(ui: &Ui, path: &Path) -> bool {
    match LiveFileStatus::detect(path) {
        LiveFileStatus::RegularFile { .. } => {
            ui.println(format!("  {} {}", ui.icon_ok(), path.display()));
            true
        }
        LiveFileStatus::Symlink { target } if path.is_file() => {
            ui.println(format!(
                "  {} {} is a symlink to {}",
                ui.icon_info(),
                path.display(),
                target.display()
            ));
            true
        }
        LiveFileStatus::Missing => {
            ui.println(format!(
                "  {} {} is missing; switching requires an existing file to back up",
                ui.icon_err(),
                path.display()
            ));
            false
        }
        LiveFileStatus::Symlink { .. } | LiveFileStatus::NotAFile => {
            ui.println(format!("  {} {} is not a regular file", ui.icon_err(), path.display()));
            false
        }
    }
}

fn check_profile(ui: &Ui, dir: &Path, name: &str) -> bool {
    let missing: Vec<&str> = [CONFIG_FILE, CREDENTIALS_FILE]
        .into_iter()
        .filter(|f| !dir.join(f).is_file())
        .collect();
    if !missing.is_empty() {
        ui.println(format!(
            "    {} {} (missing {})",
            ui.icon_err(),
            name,
            missing.join(", ")
        ));
        return false;
    }

    match credential_sections(&dir.join(CREDENTIALS_FILE)) {
        Ok(sections) if sections.iter().any(|s| s == name) => {
            ui.println(format!("    {} {}", ui.icon_ok(), name));
            true
        }
        Ok(sections) if sections.iter().any(|s| s == DEFAULT_SECTION) => {
            ui.println(format!(
                "    {} {} (credentials already use [default])",
                ui.icon_info(),
                name
            ));
            true
        }
        Ok(sections) => {
            ui.println(format!(
                "    {} {} (no [{}] section; found: {})",
                ui.icon_warn(),
                name,
                name,
                if sections.is_empty() {
                    "none".to_string()
                } else {
                    sections.join(", ")
                }
            ));
            true
        }
        Err(e) => {
            ui.println(format!("    {} {} ({:#})", ui.icon_err(), name, e));
            false
        }
    }
}

fn on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_test_paths, write_live, write_profile};
    use crate::ui::ColorMode;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    #[test]
    fn test_missing_live_files_fail() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        assert!(!run_doctor(&paths, &Settings::default(), &test_ui()));
    }

    #[test]
    fn test_healthy_setup_passes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_live(&paths, "cfg", "creds");
        write_profile(&paths, "dev", "cfg", Some("[dev]\nk=v\n"));
        write_profile(&paths, "prod", "cfg", Some("[PROD]\nk=v\n"));

        assert!(run_doctor(&paths, &Settings::default(), &test_ui()));
    }

    #[test]
    fn test_incomplete_profile_fails() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_live(&paths, "cfg", "creds");
        write_profile(&paths, "half", "cfg", None);

        assert!(!run_doctor(&paths, &Settings::default(), &test_ui()));
    }

    #[test]
    fn test_on_path() {
        assert!(!on_path("awsprof-no-such-binary"));
        #[cfg(unix)]
        assert!(on_path("sh"));
    }
}
