//! Credential file store.
//!
//! The file holds two `key=value` lines (`username`, `token`) and is only
//! readable by its owner. The sync engine never touches it: the CLI loads
//! credentials here, passes them into every call, and invalidates the file
//! when the API rejects them.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::CredentialError;
use crate::models::Credentials;

/// Environment variable naming the account that owns an env-provided token.
pub const USERNAME_ENV: &str = "GHSYNC_USERNAME";

/// Reads, writes and invalidates the credential file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored credentials; `Ok(None)` when no file exists.
    pub fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no credential file");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        self.parse(&contents).map(Some)
    }

    fn parse(&self, contents: &str) -> Result<Credentials, CredentialError> {
        let mut username = None;
        let mut token = None;
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line.split_once('=').ok_or_else(|| self.malformed(line))?;
            match key.trim() {
                "username" => username = Some(value.trim().to_string()),
                "token" => token = Some(value.trim().to_string()),
                other => warn!(key = other, "ignoring unknown credential key"),
            }
        }
        match (username, token) {
            (Some(u), Some(t)) if !u.is_empty() && !t.is_empty() => Ok(Credentials::new(u, t)),
            _ => Err(CredentialError::Malformed {
                path: self.path.display().to_string(),
                detail: "expected non-empty 'username' and 'token' entries".into(),
            }),
        }
    }

    fn malformed(&self, line: &str) -> CredentialError {
        CredentialError::Malformed {
            path: self.path.display().to_string(),
            detail: format!("line without '=': {}", line.split_whitespace().next().unwrap_or("")),
        }
    }

    /// Write credentials, replacing any previous file. The file is created
    /// with mode 0600 on unix.
    pub fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        writeln!(file, "username={}", credentials.username)?;
        writeln!(file, "token={}", credentials.token)?;

        info!(path = %self.path.display(), username = %credentials.username, "saved credentials");
        Ok(())
    }

    /// Remove the stored credentials. Missing files are not an error.
    pub fn invalidate(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "invalidated stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Credentials for a CLI invocation: the stored file first, then the token
/// from `github.token_env` paired with `GHSYNC_USERNAME`.
pub fn resolve_credentials(
    store: &CredentialStore,
    config: &AppConfig,
) -> Result<Credentials, CredentialError> {
    if let Some(creds) = store.load()? {
        debug!(username = %creds.username, "using stored credentials");
        return Ok(creds);
    }
    let username = std::env::var(USERNAME_ENV).ok().filter(|u| !u.is_empty());
    match (username, config.github.token.clone()) {
        (Some(username), Some(token)) => {
            debug!(username = %username, env = %config.github.token_env, "using credentials from environment");
            Ok(Credentials::new(username, token))
        }
        (None, Some(_)) => {
            warn!(env = USERNAME_ENV, "token found in environment but no username");
            Err(CredentialError::Missing {
                token_env: format!("{} and {}", config.github.token_env, USERNAME_ENV),
            })
        }
        _ => Err(CredentialError::Missing {
            token_env: config.github.token_env.clone(),
        }),
    }
}
