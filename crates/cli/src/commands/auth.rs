//! `login` and `logout`.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use dialoguer::Password;

use ghsync_core::models::Credentials;

use super::{style, Session};

/// Prompt for a token, verify it with `GET /user`, and store it.
pub async fn run_login(session: &Session, token_stdin: bool) -> Result<u8> {
    let token = if token_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read token from stdin")?;
        line.trim().to_string()
    } else {
        Password::new()
            .with_prompt("GitHub personal access token")
            .interact()
            .context("failed to read token")?
    };
    if token.is_empty() {
        bail!("no token given");
    }

    // GET /user only needs the token; the login it returns is the username.
    let probe = Credentials::new(String::new(), token);
    let user = session
        .github()?
        .get_authenticated_user(&probe)
        .await
        .context("token verification failed")?;
    let credentials = Credentials::new(user.login, probe.token);

    session
        .store
        .save(&credentials)
        .context("failed to save credentials")?;

    println!(
        "{}",
        style::success(&format!("Logged in as {}", credentials.username))
    );
    println!(
        "  {}",
        style::dim(&format!("Credentials saved to {}", session.store.path().display()))
    );
    Ok(0)
}

/// Remove the stored credential file.
pub fn run_logout(session: &Session) -> Result<u8> {
    if !session.store.path().exists() {
        println!("{}", style::dim("Not logged in."));
        return Ok(0);
    }
    session
        .store
        .invalidate()
        .context("failed to remove credentials")?;
    println!("{}", style::success("Logged out"));
    Ok(0)
}
