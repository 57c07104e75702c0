//! `clone` with a progress spinner fed by git transfer progress.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use ghsync_core::git::GitClient;
use ghsync_core::models::RemotePolicy;

use super::{style, Session};

/// Clone `repo` into `dir` (or a directory named after the repository).
pub async fn run_clone(session: &Session, repo: &str, dir: Option<PathBuf>) -> Result<u8> {
    let credentials = session.credentials()?;
    let cwd = PathBuf::from(".");
    let target = session.target(Some(repo), &cwd, &credentials)?;
    let dir = dir.unwrap_or_else(|| PathBuf::from(&target.name));

    if dir.exists()
        && std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .next()
            .is_some()
    {
        bail!("destination '{}' already exists and is not empty", dir.display());
    }

    let engine = session.engine()?;
    let remote = engine
        .ensure_remote(&target, &credentials, RemotePolicy::MustExist)
        .await
        .with_context(|| format!("failed to look up {}", target.full_name()))?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(format!("Cloning {}...", target.full_name()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress_bar = spinner.clone();
    let mut on_progress = move |line: &str| progress_bar.set_message(line.to_string());
    let cloned = GitClient::clone_repo(&remote.clone_url, &dir, Some(&credentials), &mut on_progress);
    spinner.finish_and_clear();
    let git = cloned.with_context(|| format!("failed to clone {}", target.full_name()))?;

    println!(
        "{}",
        style::success(&format!(
            "Cloned {} into {}",
            target.full_name(),
            dir.display()
        ))
    );
    match (git.current_branch(), git.head_sha()?) {
        (Some(branch), Some(sha)) => {
            println!("  {}", style::dim(&format!("{} at {}", branch, &sha[..7.min(sha.len())])))
        }
        _ => println!("  {}", style::dim("Repository is empty")),
    }
    Ok(0)
}
