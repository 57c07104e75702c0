//! `license`: render a license template on its own.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Datelike;

use ghsync_core::credentials::resolve_credentials;
use ghsync_core::license::materialize_license;

use super::{style, Session};

/// Print the license text for `id`, or write it to `output`.
///
/// An unsupported identifier (including `none`) is the command's only
/// failure mode that maps to the unsupported-license exit code.
pub fn run_license(
    session: &Session,
    id: &str,
    owner: Option<String>,
    year: Option<i32>,
    output: Option<&Path>,
    force: bool,
) -> Result<u8> {
    let owner = match owner {
        Some(owner) => owner,
        None => resolve_credentials(&session.store, &session.config)
            .map(|c| c.username)
            .context("no --owner given and no logged-in user to default to")?,
    };
    let year = year.unwrap_or_else(|| chrono::Local::now().year());
    let text = materialize_license(id, &owner, year)?;

    match output {
        None => print!("{}", text),
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            std::fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{}",
                style::success(&format!("Wrote {} license to {}", id, path.display()))
            );
        }
    }
    Ok(0)
}
