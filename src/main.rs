use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use awsprof::{
    commands::{self, SwitchFlags},
    paths::Paths,
    select::FuzzySelector,
    settings::Settings,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "awsprof")]
#[command(about = "AWS Profile Switcher - promote a stored profile to the default AWS configuration")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    switch: SwitchArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Copy)]
struct SwitchArgs {
    /// Stage both files and rename them into place together
    #[arg(long)]
    atomic: bool,

    /// Fail if the profile's credentials lack a [<profile>] section
    #[arg(long)]
    strict: bool,

    /// Skip the identity check after switching
    #[arg(long)]
    no_verify: bool,
}

impl From<SwitchArgs> for SwitchFlags {
    fn from(args: SwitchArgs) -> Self {
        Self {
            atomic: args.atomic,
            strict: args.strict,
            no_verify: args.no_verify,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a profile interactively and switch to it (the default)
    Switch {
        #[command(flatten)]
        switch: SwitchArgs,
    },

    /// Switch to a profile by name
    Use {
        /// Name of the profile directory
        name: String,

        #[command(flatten)]
        switch: SwitchArgs,
    },

    /// List all stored profiles
    List,

    /// Show the active profile and live file status
    Current,

    /// Show the identity the live configuration resolves to
    Whoami,

    /// Copy the .backup files back over the live config and credentials
    Restore {
        /// Don't ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Run diagnostics on the awsprof setup
    Doctor,

    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ui = Ui::new(cli.color, cli.no_color);
    let paths = Paths::new()?;
    let settings = Settings::load(&paths.settings_file)?;
    let selector = FuzzySelector::default();

    match cli.command {
        None => commands::switch_interactive(&paths, &settings, cli.switch.into(), &ui, &selector),
        Some(Commands::Switch { switch }) => {
            commands::switch_interactive(&paths, &settings, switch.into(), &ui, &selector)
        }
        Some(Commands::Use { name, switch }) => {
            commands::use_profile(&paths, &settings, switch.into(), &ui, &name)
        }
        Some(Commands::List) => commands::list(&paths, &ui),
        Some(Commands::Current) => commands::current(&paths, &ui),
        Some(Commands::Whoami) => commands::whoami(&settings, &ui),
        Some(Commands::Restore { yes }) => commands::restore(&paths, &ui, yes),
        Some(Commands::Doctor) => commands::doctor(&paths, &settings, &ui),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "awsprof", &mut std::io::stdout());
            Ok(())
        }
    }
}
