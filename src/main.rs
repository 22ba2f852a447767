mod backup;
mod cli;
mod config;
mod discovery;
mod logging;
mod patch;
mod template;

use clap::{Parser, Subcommand};
use cli::{OutputEvent, OutputMode, commands, create_handler};
use config::{Overrides, PatchConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cc-metrics")]
#[command(version)]
#[command(about = "Add a session metrics bar to the Claude Code VS Code webview")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Extension directory to patch (skips discovery)
    #[arg(long, global = true)]
    ext_dir: Option<PathBuf>,

    /// Directory holding the backup slots
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// File with the base64 avatar payload
    #[arg(long, global = true)]
    avatar: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/cc-metrics/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (console, json or quiet)
    #[arg(long, global = true, default_value = "console")]
    format: String,

    /// Write logs to a file (default location when no path is given)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Patch the webview and verify the result (default)
    Apply,

    /// Save copies of the webview script and stylesheet
    Backup,

    /// Put the saved copies back
    Restore,

    /// Strip every patch from the webview
    Clean,

    /// Check whether the webview is fully patched
    Verify,
}

impl Commands {
    fn name(self) -> &'static str {
        match self {
            Commands::Apply => "apply",
            Commands::Backup => "backup",
            Commands::Restore => "restore",
            Commands::Clean => "clean",
            Commands::Verify => "verify",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Apply);

    let log_file = match cli.log_file.clone() {
        Some(Some(path)) => Some(path),
        Some(None) => match logging::default_log_path(command.name()) {
            Ok(path) => Some(path),
            Err(e) => {
                eprintln!("ERROR: {:#}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    if let Err(e) = logging::init_logging(cli.debug, cli.quiet, log_file) {
        eprintln!("ERROR: {:#}", e);
        return ExitCode::FAILURE;
    }

    let mode = match OutputMode::from_str(&cli.format) {
        OutputMode::Console if cli.quiet => OutputMode::Quiet,
        mode => mode,
    };
    let handler = create_handler(mode, cli.debug);

    let overrides = Overrides {
        ext_dir: cli.ext_dir,
        backup_dir: cli.backup_dir,
        avatar_path: cli.avatar,
    };

    let result = PatchConfig::load(cli.config.as_deref(), overrides).and_then(|config| {
        tracing::debug!(command = command.name(), ?config, "starting");
        match command {
            Commands::Apply => commands::apply(&config, &*handler),
            Commands::Backup => commands::backup(&config, &*handler),
            Commands::Restore => commands::restore(&config, &*handler),
            Commands::Clean => commands::clean(&config, &*handler),
            Commands::Verify => commands::verify_only(&config, &*handler),
        }
    });

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(code.clamp(1, 255) as u8),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            handler.emit(OutputEvent::Error {
                message: format!("{:#}", e),
            });
            handler.result(false, &format!("{} failed", command.name()));
            ExitCode::FAILURE
        }
    }
}
