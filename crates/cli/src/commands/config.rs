//! `config init` and `config validate`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use ghsync_core::config::AppConfig;
use ghsync_core::credentials::CredentialStore;

use super::style;

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file.
    Init {
        /// Output path (defaults to the --config path).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file and show the effective settings.
    Validate,
}

pub fn run_config(action: ConfigAction, config_path: &Path) -> Result<u8> {
    match action {
        ConfigAction::Init { output } => cmd_init(output.as_deref().unwrap_or(config_path)),
        ConfigAction::Validate => cmd_validate(config_path),
    }
}

fn cmd_init(output: &Path) -> Result<u8> {
    if output.exists() {
        bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(output, AppConfig::default_template())
        .context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the file if you use GitHub Enterprise or a different branch name");
    println!("  2. Run: ghsync login");
    Ok(0)
}

fn cmd_validate(config_path: &Path) -> Result<u8> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("  {}", style::dim("No configuration file, defaults apply"));
    }
    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("{}", style::success("TOML structure is valid"));
    config.resolve_env_vars();

    if let Err(e) = config.validate() {
        println!("{}", style::error(&format!("Validation error: {}", e)));
        bail!("configuration validation failed");
    }
    println!("{}", style::success("All fields are valid"));

    let store = CredentialStore::new(config.credentials.resolved_path());
    println!();
    println!("Configuration summary:");
    println!("  API URL       : {}", config.github.api_url);
    println!(
        "  Clone URL     : {}",
        config.github.clone_url("<owner>/<name>")
    );
    println!("  Timeout       : {}s", config.github.timeout_secs);
    println!(
        "  Token env     : {} ({})",
        config.github.token_env,
        if config.github.token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!(
        "  Credentials   : {} ({})",
        store.path().display(),
        if store.path().exists() {
            "present"
        } else {
            "absent"
        }
    );
    println!("  Remote        : {}", config.git.remote_name);
    println!("  Branch        : {}", config.git.default_branch);
    Ok(0)
}
