//! Repository metadata view.

use std::path::Path;

use anyhow::{Context, Result};
use console::Style;

use ghsync_core::errors::GitHubError;
use ghsync_core::git::GitClient;
use ghsync_core::models::RepoDetails;

use super::{style, Session};

/// Show metadata for a repository, plus local status when `dir` is a clone.
pub async fn run_info(session: &Session, repo: Option<&str>, dir: &Path, json: bool) -> Result<u8> {
    let credentials = session.credentials()?;
    let target = session.target(repo, dir, &credentials)?;
    let details = session
        .github()?
        .get_repo(&credentials, &target.owner, &target.name)
        .await
        .with_context(|| format!("failed to fetch {}", target.full_name()))?
        .ok_or_else(|| GitHubError::RepositoryNotFound(target.full_name()))?;

    if json {
        let out = serde_json::to_string_pretty(&details).context("failed to serialize repository")?;
        println!("{}", out);
        return Ok(0);
    }

    print_details(&details, &target.full_name());
    if GitClient::is_repository(dir) {
        print_local(dir)?;
    }
    println!();
    Ok(0)
}

fn print_details(details: &RepoDetails, full_name: &str) {
    let label = Style::new().bold();
    let name: &str = if details.full_name.is_empty() {
        full_name
    } else {
        &details.full_name
    };

    println!();
    println!("{}", style::header(name));
    println!("{}", "═".repeat(name.chars().count()));
    if let Some(description) = details.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}", description);
    }
    println!();
    println!("  {}  {}", label.apply_to("URL       "), style::url(&details.html_url));
    println!(
        "  {}  {}",
        label.apply_to("Visibility"),
        if details.private { "private" } else { "public" }
    );
    println!(
        "  {}  {}",
        label.apply_to("Branch    "),
        details.default_branch.as_deref().unwrap_or("—")
    );
    println!(
        "  {}  {}",
        label.apply_to("License   "),
        details
            .license
            .as_ref()
            .map(|l| l.spdx_id.clone().unwrap_or_else(|| l.name.clone()))
            .unwrap_or_else(|| "none".into())
    );
    println!(
        "  {}  {} stars, {} forks, {} open issues",
        label.apply_to("Activity  "),
        details.stargazers_count,
        details.forks_count,
        details.open_issues_count
    );
    if let Some(pushed_at) = &details.pushed_at {
        println!("  {}  {}", label.apply_to("Pushed    "), pushed_at);
    }
}

fn print_local(dir: &Path) -> Result<()> {
    let git = GitClient::open(dir)?;
    let pending = git.pending_changes()?;

    println!();
    println!("  {}", style::header("Local"));
    println!("  {}", "─".repeat(40));
    println!("  Path      {}", dir.display());
    println!(
        "  Branch    {}",
        git.current_branch().unwrap_or_else(|| "—".into())
    );
    match git.head_sha()? {
        Some(sha) => println!("  HEAD      {}", &sha[..7.min(sha.len())]),
        None => println!("  HEAD      {}", style::dim("no commits yet")),
    }
    if pending == 0 {
        println!("  Changes   {}", style::dim("clean"));
    } else {
        println!("  Changes   {} uncommitted", pending);
    }
    Ok(())
}
