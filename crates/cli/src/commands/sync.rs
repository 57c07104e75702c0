//! `create` and `update`: the two repository workflows.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use ghsync_core::errors::FailureKind;
use ghsync_core::models::{RemotePolicy, Visibility};
use ghsync_core::sync_engine::SyncResult;

use super::{style, Session};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Local directory to publish (initialized if needed).
    pub dir: PathBuf,

    /// Repository as `owner/name`, or `name` for your own account.
    pub repo: String,

    /// Repository description.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Create a private repository.
    #[arg(long)]
    pub private: bool,

    /// License to add: MIT, Apache-2.0, GPL-3.0 or none.
    #[arg(short, long)]
    pub license: Option<String>,

    /// Reuse the repository if it already exists instead of failing.
    #[arg(long)]
    pub existing_ok: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Local git working directory.
    pub dir: PathBuf,

    /// Repository; inferred from the directory's remote when omitted.
    pub repo: Option<String>,

    /// Commit message (defaults to `git.commit_message` from the config).
    #[arg(short, long)]
    pub message: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the create workflow.
pub async fn run_create(session: &Session, args: CreateArgs) -> Result<u8> {
    let credentials = session.credentials()?;
    let visibility = if args.private {
        Visibility::Private
    } else {
        Visibility::Public
    };
    let mut target = session
        .target(Some(args.repo.as_str()), &args.dir, &credentials)?
        .with_description(args.description)
        .with_visibility(visibility);
    target.license = args.license;
    let policy = if args.existing_ok {
        RemotePolicy::CreateIfMissing
    } else {
        RemotePolicy::CreateNew
    };

    let engine = session.engine()?;
    let spinner = spinner(format!("Publishing {} to {}...", args.dir.display(), target.full_name()));
    let result = engine.create(&args.dir, &target, &credentials, policy).await;
    spinner.finish_and_clear();

    finish(session, &result, &target.full_name(), engine.branch(), args.json)
}

/// Run the update workflow.
pub async fn run_update(session: &Session, args: UpdateArgs) -> Result<u8> {
    let credentials = session.credentials()?;
    let target = session.target(args.repo.as_deref(), &args.dir, &credentials)?;
    let message = args
        .message
        .unwrap_or_else(|| session.config.git.commit_message.clone());

    let engine = session.engine()?;
    let spinner = spinner(format!("Updating {}...", target.full_name()));
    let result = engine
        .update(&args.dir, &target, &credentials, &message)
        .await;
    spinner.finish_and_clear();

    finish(session, &result, &target.full_name(), engine.branch(), args.json)
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(
            template.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub(super) fn finish(
    session: &Session,
    result: &SyncResult,
    full_name: &str,
    branch: &str,
    json: bool,
) -> Result<u8> {
    if let Some(fatal) = result.fatal_error() {
        if fatal.kind == FailureKind::Auth {
            session.invalidate_credentials();
        }
    }

    if json {
        let out = serde_json::to_string_pretty(result).context("failed to serialize result")?;
        println!("{}", out);
    } else {
        print_report(result, full_name, branch);
    }
    Ok(result.exit_code())
}

fn print_report(result: &SyncResult, full_name: &str, branch: &str) {
    println!();
    if result.created_new {
        println!("{}", style::success(&format!("Created repository {}", full_name)));
    } else if result.remote_url.is_some() {
        println!("{}", style::success(&format!("Found repository {}", full_name)));
    }

    for warning in result.warnings() {
        println!("{}", style::warn(&warning.message));
    }

    if result.commit_made {
        println!("{}", style::success("Committed local changes"));
    } else if result.pushed {
        println!("  {}", style::dim("Nothing new to commit"));
    }
    if result.pushed {
        println!("{}", style::success(&format!("Pushed {}", branch)));
    }

    if let Some(fatal) = result.fatal_error() {
        eprintln!(
            "{}",
            style::error(&format!(
                "{} (at {}): {}",
                style::failure_label(fatal.kind),
                fatal.state,
                fatal.message
            ))
        );
        if result.created_new {
            eprintln!(
                "  {}",
                style::dim("The repository was created on GitHub and has been left in place.")
            );
        }
    }

    if let Some(url) = &result.remote_url {
        println!();
        println!("  {}", style::url(url));
    }
    println!();
}
