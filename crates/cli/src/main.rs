//! ghsync command-line tool.
//!
//! Publishes local directories as GitHub repositories and keeps them in
//! sync: create, update and clone repositories, inspect metadata and
//! issues, and manage stored credentials.
//!
//! Exit codes: 0 success, 1 local/other failure, 2 authentication failure,
//! 3 GitHub API error or name conflict, 4 push failure, 5 unsupported
//! license (`license` subcommand only).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use ghsync_core::config::AppConfig;

use commands::{style, Commands};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Publish and sync local directories with GitHub.
#[derive(Parser, Debug)]
#[command(name = "ghsync", version, about = "Publish and sync local directories with GitHub")]
struct Cli {
    /// Path to the TOML configuration file
    /// (default: `<config dir>/ghsync/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    match commands::run(cli.command, &config_path).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

/// Compact stderr logging. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
