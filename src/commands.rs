//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs` and
//! coordinates the store (`crate::profiles`), the engine (`crate::switch`),
//! the identity check and the terminal output.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::credentials::{CredentialsDoc, HeaderOutcome};
use crate::doctor::run_doctor;
use crate::error::SwitchError;
use crate::identity::{IdentityCheck, highlight_lines};
use crate::paths::Paths;
use crate::profiles::{CONFIG_FILE, CREDENTIALS_FILE, Profile, find_profile, list_profiles};
use crate::select::{Selector, select_profile};
use crate::settings::Settings;
use crate::state::{State, record_switch};
use crate::switch::{
    CommitMode, LiveFileStatus, LivePaths, SwitchOptions, restore_backups, switch_with,
};
use crate::ui::Ui;

/// Per-invocation overrides for the settings file
#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchFlags {
    pub atomic: bool,
    pub strict: bool,
    pub no_verify: bool,
}

impl SwitchFlags {
    fn options(&self, settings: &Settings) -> SwitchOptions {
        let mut options = settings.switch_options();
        if self.atomic {
            options.mode = CommitMode::Staged;
        }
        options.strict_header |= self.strict;
        options
    }

    fn verify(&self, settings: &Settings) -> bool {
        settings.verify && !self.no_verify
    }
}

/// Create the store root on first use
fn prepare_store(paths: &Paths, ui: &Ui) -> Result<()> {
    if paths.ensure_store()? {
        ui.info(format!(
            "Creating directory for AWS configs: {}",
            paths.store_dir.display()
        ));
    }
    Ok(())
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SwitchError>(),
        Some(SwitchError::SelectionCancelled)
    )
}

/// Pick a profile interactively and switch to it
pub fn switch_interactive(
    paths: &Paths,
    settings: &Settings,
    flags: SwitchFlags,
    ui: &Ui,
    selector: &dyn Selector,
) -> Result<()> {
    prepare_store(paths, ui)?;

    let profiles = list_profiles(&paths.store_dir).context("Error reading config directory")?;
    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println(format!(
            "Create a directory per profile in {} holding 'config' and 'credentials'.",
            paths.store_dir.display()
        ));
        return Ok(());
    }

    let name = match select_profile(selector, &profiles) {
        Ok(name) => name,
        Err(e) if is_cancelled(&e) => {
            ui.warn("No selection made; nothing was changed.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let profile = find_profile(&paths.store_dir, &name)?;
    activate(paths, settings, flags, ui, &profile)
}

/// Switch to a named profile
pub fn use_profile(
    paths: &Paths,
    settings: &Settings,
    flags: SwitchFlags,
    ui: &Ui,
    name: &str,
) -> Result<()> {
    prepare_store(paths, ui)?;
    let profile = find_profile(&paths.store_dir, name)?;
    activate(paths, settings, flags, ui, &profile)
}

fn activate(
    paths: &Paths,
    settings: &Settings,
    flags: SwitchFlags,
    ui: &Ui,
    profile: &Profile,
) -> Result<()> {
    let spinner = ui.spinner(format!("Switching to profile '{}'...", profile.name));
    let result = switch_with(profile, &LivePaths::from(paths), flags.options(settings));
    ui.spinner_clear(&spinner);

    let report = result.context("Error switching AWS config")?;

    if let Err(e) = record_switch(&paths.state_file, &report.profile) {
        ui.warn(format!("Could not record the active profile: {:#}", e));
    }

    ui.ok("AWS configuration switched successfully!");
    ui.println(format!(
        "Switched AWS configuration to profile: {}",
        ui.bold(&report.profile)
    ));
    if report.header == HeaderOutcome::Unchanged {
        ui.warn(format!(
            "{} has no [{}] section; the live credentials may lack a [default] profile.",
            profile.credentials_path().display(),
            report.profile
        ));
    }
    ui.println(ui.dim(format!(
        "Previous files saved as {} and {}",
        report.config_backup.display(),
        report.credentials_backup.display()
    )));

    if flags.verify(settings) {
        ui.println("####################");
        show_identity(settings, ui)?;
    }

    Ok(())
}

/// Run the identity command and print its output
pub fn whoami(settings: &Settings, ui: &Ui) -> Result<()> {
    show_identity(settings, ui)
}

fn show_identity(settings: &Settings, ui: &Ui) -> Result<()> {
    let Some(check) = IdentityCheck::from_argv(&settings.identity_command) else {
        bail!("identity_command in the settings file is empty");
    };

    let spinner = ui.spinner(format!("Running {}...", check.display()));
    let result = check.run();
    ui.spinner_clear(&spinner);
    let output = result.context("Error getting AWS caller identity")?;

    ui.println("Current AWS Identity:");
    for (line, hit) in highlight_lines(&output, &settings.highlight_token) {
        if hit {
            ui.println(ui.highlight(line));
        } else {
            ui.println(line);
        }
    }
    Ok(())
}

/// One line of `awsprof list`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProfileRow {
    name: String,
    active: bool,
    /// Profile members that are not regular files
    missing: Vec<&'static str>,
}

fn profile_rows(paths: &Paths, profiles: &[String], current: Option<&str>) -> Vec<ProfileRow> {
    profiles
        .iter()
        .map(|name| {
            let dir = paths.profile_dir(name);
            ProfileRow {
                name: name.clone(),
                active: Some(name.as_str()) == current,
                missing: [CONFIG_FILE, CREDENTIALS_FILE]
                    .into_iter()
                    .filter(|f| !dir.join(f).is_file())
                    .collect(),
            }
        })
        .collect()
}

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui) -> Result<()> {
    prepare_store(paths, ui)?;
    let profiles = list_profiles(&paths.store_dir)?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.println(format!(
            "Add one as {}",
            ui.bold(paths.profile_dir("<name>").join(CONFIG_FILE).display().to_string())
        ));
        return Ok(());
    }

    let state = State::read(&paths.state_file).unwrap_or_default();
    let current = state.active_profile.as_deref();

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Files"),
        ui.header_cell("Status"),
    ]);

    for row in profile_rows(paths, &profiles, current) {
        let icon = if row.active { ui.icon_ok() } else { " " };
        let files_cell = if row.missing.is_empty() {
            ui.cell("config, credentials")
        } else {
            ui.colored_cell(format!("missing {}", row.missing.join(", ")), AnsiColor::Red)
        };
        let status_cell = if row.active {
            ui.colored_cell("active", AnsiColor::Green)
        } else {
            ui.cell("-")
        };

        table.add_row(vec![ui.cell(icon), ui.cell(&row.name), files_cell, status_cell]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Show the recorded active profile and the live/backup files
pub fn current(paths: &Paths, ui: &Ui) -> Result<()> {
    let state = State::read(&paths.state_file).unwrap_or_default();

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    match &state.active_profile {
        Some(profile) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(profile)]);
            if let Some(at) = &state.switched_at {
                table.add_row(vec![
                    ui.cell("Last switched:"),
                    ui.cell(at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
                ]);
            }
        }
        None => {
            table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        }
    }

    for (label, path) in [
        ("Config:", &paths.live_config),
        ("Credentials:", &paths.live_credentials),
    ] {
        table.add_row(vec![ui.cell(label), live_status_cell(ui, path)]);
    }

    for (label, path) in [
        ("Config backup:", paths.config_backup()),
        ("Credentials backup:", paths.credentials_backup()),
    ] {
        let cell = if path.is_file() {
            ui.cell(path.display().to_string())
        } else {
            ui.cell("(none)")
        };
        table.add_row(vec![ui.cell(label), cell]);
    }

    ui.println(table.to_string());
    Ok(())
}

fn live_status_cell(ui: &Ui, path: &Path) -> comfy_table::Cell {
    match LiveFileStatus::detect(path) {
        LiveFileStatus::Missing => {
            ui.colored_cell(format!("missing ({})", path.display()), AnsiColor::Yellow)
        }
        LiveFileStatus::RegularFile { len } => {
            ui.cell(format!("{} ({} bytes)", path.display(), len))
        }
        LiveFileStatus::Symlink { target } => ui.cell(format!(
            "{} → {}",
            path.display(),
            target.display()
        )),
        LiveFileStatus::NotAFile => {
            ui.colored_cell(format!("not a file ({})", path.display()), AnsiColor::Red)
        }
    }
}

/// Put the `.backup` files back over the live pair
pub fn restore(paths: &Paths, ui: &Ui, yes: bool) -> Result<()> {
    let backups = [paths.config_backup(), paths.credentials_backup()];
    if !backups.iter().any(|b| b.is_file()) {
        ui.warn("No backups found.");
        ui.println("Backups are written automatically each time a profile is switched.");
        return Ok(());
    }

    if !yes {
        let confirm = inquire::Confirm::new("Overwrite the live AWS config and credentials with their backups?")
            .with_default(false)
            .prompt()
            .context("Restore cancelled")?;
        if !confirm {
            ui.info("Restore cancelled.");
            return Ok(());
        }
    }

    let report = restore_backups(&LivePaths::from(paths)).context("Error restoring backups")?;
    for (restored, path) in [
        (report.config, &paths.live_config),
        (report.credentials, &paths.live_credentials),
    ] {
        if restored {
            ui.ok(format!("Restored {}", path.display()));
        } else {
            ui.println(ui.dim(format!("No backup for {}", path.display())));
        }
    }

    // The live pair no longer matches any recorded switch
    if let Err(e) = State::default().write(&paths.state_file) {
        ui.warn(format!("Could not reset the active profile: {:#}", e));
    }
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, settings: &Settings, ui: &Ui) -> Result<()> {
    if !run_doctor(paths, settings, ui) {
        bail!("awsprof doctor found issues");
    }
    Ok(())
}

/// Section names in a profile's credentials, for diagnostics
pub(crate) fn credential_sections(path: &Path) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CredentialsDoc::parse(&bytes).section_names())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FixedSelector, setup_test_paths, write_live, write_profile};
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    fn quiet_settings() -> Settings {
        Settings {
            verify: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_cancelled_selection_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "new config", Some("[dev]\nk=v\n"));
        write_live(&paths, "old config", "old creds");

        switch_interactive(
            &paths,
            &quiet_settings(),
            SwitchFlags::default(),
            &test_ui(),
            &FixedSelector(None),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&paths.live_config).unwrap(), "old config");
        assert_eq!(fs::read_to_string(&paths.live_credentials).unwrap(), "old creds");
        assert!(!paths.config_backup().exists());
        assert!(!paths.credentials_backup().exists());
        assert!(!crate::switch::lock_path(&paths.live_config).exists());
        assert!(!paths.state_file.exists());
    }

    #[test]
    fn test_interactive_switch_records_state() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "new config", Some("[dev]\nk=v\n"));
        write_live(&paths, "old config", "old creds");

        switch_interactive(
            &paths,
            &quiet_settings(),
            SwitchFlags::default(),
            &test_ui(),
            &FixedSelector(Some(0)),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&paths.live_credentials).unwrap(), "[default]\nk=v\n");
        let state = State::read(&paths.state_file).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("dev"));
    }

    #[test]
    fn test_empty_store_is_created_and_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        switch_interactive(
            &paths,
            &quiet_settings(),
            SwitchFlags::default(),
            &test_ui(),
            &FixedSelector(Some(0)),
        )
        .unwrap();
        assert!(paths.store_dir.is_dir());
    }

    #[test]
    fn test_use_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_live(&paths, "old config", "old creds");

        let result = use_profile(
            &paths,
            &quiet_settings(),
            SwitchFlags::default(),
            &test_ui(),
            "nonexistent",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_use_strict_flag_overrides_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "prod", "new config", Some("[PROD]\nk=v\n"));
        write_live(&paths, "old config", "old creds");

        let flags = SwitchFlags {
            atomic: true,
            strict: true,
            no_verify: true,
        };
        let err = use_profile(&paths, &Settings::default(), flags, &test_ui(), "prod").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SwitchError>(),
            Some(SwitchError::DefaultSectionMissing { .. })
        ));
        assert_eq!(fs::read_to_string(&paths.live_config).unwrap(), "old config");
    }

    #[cfg(unix)]
    #[test]
    fn test_use_with_identity_check() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "new config", Some("[dev]\nk=v\n"));
        write_live(&paths, "old config", "old creds");

        let settings = Settings {
            identity_command: vec!["echo".to_string(), "\"Arn\": \"arn:aws:iam::1:user/op\"".to_string()],
            ..Settings::default()
        };
        use_profile(&paths, &settings, SwitchFlags::default(), &test_ui(), "dev").unwrap();

        let failing = Settings {
            identity_command: vec!["false".to_string()],
            ..Settings::default()
        };
        let err = use_profile(&paths, &failing, SwitchFlags::default(), &test_ui(), "dev").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SwitchError>(),
            Some(SwitchError::IdentityCheckFailed { .. })
        ));
    }

    #[test]
    fn test_list_and_current() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        assert!(list(&paths, &ui).is_ok());
        assert!(current(&paths, &ui).is_ok());

        write_profile(&paths, "dev", "cfg", None);
        assert!(list(&paths, &ui).is_ok());
    }

    #[test]
    fn test_profile_rows_mark_active_and_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "cfg", None);
        write_profile(&paths, "prod", "cfg", Some("[prod]\nk=v\n"));
        fs::create_dir_all(paths.profile_dir("empty")).unwrap();

        let profiles = vec!["dev".to_string(), "prod".to_string(), "empty".to_string()];
        let rows = profile_rows(&paths, &profiles, Some("prod"));

        assert_eq!(
            rows,
            vec![
                ProfileRow {
                    name: "dev".to_string(),
                    active: false,
                    missing: vec!["credentials"],
                },
                ProfileRow {
                    name: "prod".to_string(),
                    active: true,
                    missing: vec![],
                },
                ProfileRow {
                    name: "empty".to_string(),
                    active: false,
                    missing: vec!["config", "credentials"],
                },
            ]
        );
        assert!(profile_rows(&paths, &profiles, None).iter().all(|r| !r.active));
    }

    #[test]
    fn test_restore_with_yes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "new config", Some("[dev]\nk=v\n"));
        write_live(&paths, "old config", "old creds");
        let ui = test_ui();

        use_profile(&paths, &quiet_settings(), SwitchFlags::default(), &ui, "dev").unwrap();
        restore(&paths, &ui, true).unwrap();

        assert_eq!(fs::read_to_string(&paths.live_config).unwrap(), "old config");
        assert_eq!(State::read(&paths.state_file).unwrap().active_profile, None);
    }

    #[test]
    fn test_restore_succeeds_when_state_reset_fails() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        write_profile(&paths, "dev", "new config", Some("[dev]\nk=v\n"));
        write_live(&paths, "old config", "old creds");
        let ui = test_ui();

        use_profile(&paths, &quiet_settings(), SwitchFlags::default(), &ui, "dev").unwrap();
        // A directory in place of the state file makes the reset fail
        fs::remove_file(&paths.state_file).unwrap();
        fs::create_dir_all(&paths.state_file).unwrap();

        restore(&paths, &ui, true).unwrap();

        assert_eq!(fs::read_to_string(&paths.live_config).unwrap(), "old config");
        assert_eq!(fs::read_to_string(&paths.live_credentials).unwrap(), "old creds");
        assert!(paths.state_file.is_dir());
    }

    #[test]
    fn test_credential_sections_tolerate_non_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials");
        fs::write(&path, b"\xEF\xBB\xBF[a] # work\nk=caf\xe9\n").unwrap();
        assert_eq!(credential_sections(&path).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_credential_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials");
        fs::write(&path, "[a]\nk=1\n[b]\nk=2\n").unwrap();
        assert_eq!(credential_sections(&path).unwrap(), vec!["a", "b"]);
    }
}
