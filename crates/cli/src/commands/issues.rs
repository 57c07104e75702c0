//! Issue listing for a repository.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use ghsync_core::models::Issue;

use super::{style, Session};

/// List issues (pull requests excluded).
pub async fn run_issues(
    session: &Session,
    repo: Option<&str>,
    dir: &Path,
    state: &str,
    limit: u32,
    json: bool,
) -> Result<u8> {
    let credentials = session.credentials()?;
    let target = session.target(repo, dir, &credentials)?;
    let issues = session
        .github()?
        .list_issues(&credentials, &target.owner, &target.name, state, limit)
        .await
        .with_context(|| format!("failed to list issues of {}", target.full_name()))?;

    if json {
        let out = serde_json::to_string_pretty(&issues).context("failed to serialize issues")?;
        println!("{}", out);
        return Ok(0);
    }

    if issues.is_empty() {
        println!("No {} issues in {}.", state, target.full_name());
        return Ok(0);
    }

    println!();
    println!("{}", style::header(&format!("Issues: {}", target.full_name())));
    println!();
    println!("{}", issue_table(&issues));
    println!();
    println!("{} issue(s) shown", issues.len());
    Ok(0)
}

fn issue_table(issues: &[Issue]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Title", "State", "Author", "Comments", "Opened"]);

    for issue in issues {
        let state_cell = match issue.state.as_str() {
            "open" => Cell::new("open").fg(Color::Green),
            "closed" => Cell::new("closed").fg(Color::Red),
            other => Cell::new(other),
        };
        let opened = issue
            .created_at
            .as_deref()
            .map(|t| t.get(..10).unwrap_or(t))
            .unwrap_or("—");

        table.add_row(vec![
            Cell::new(format!("#{}", issue.number)),
            Cell::new(&issue.title),
            state_cell,
            Cell::new(issue.user.as_ref().map_or("—", |u| u.login.as_str())),
            Cell::new(issue.comments),
            Cell::new(opened),
        ]);
    }
    table
}
