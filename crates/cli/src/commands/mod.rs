//! ghsync subcommands.
//!
//! Provides the repository workflows (create, update, clone), read-only
//! views (info, issues), credential management (login, logout), and the
//! license and config helpers.

pub mod auth;
pub mod clone;
pub mod config;
pub mod info;
pub mod issues;
pub mod license;
pub mod style;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use ghsync_core::config::AppConfig;
use ghsync_core::credentials::{resolve_credentials, CredentialStore};
use ghsync_core::errors::{FailureKind, GitError, GitHubError, LicenseError, SyncError};
use ghsync_core::git::{GitClient, GitHubClient};
use ghsync_core::models::{Credentials, RepositoryTarget};
use ghsync_core::sync_engine::SyncEngine;

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a GitHub repository from a local directory and push it.
    Create(sync::CreateArgs),

    /// Commit local changes and force-push them to an existing repository.
    Update(sync::UpdateArgs),

    /// Clone a GitHub repository into a local directory.
    Clone {
        /// Repository as `owner/name`, or `name` for your own account.
        repo: String,

        /// Target directory (defaults to the repository name).
        dir: Option<PathBuf>,
    },

    /// Show repository metadata.
    Info {
        /// Repository; inferred from the directory's remote when omitted.
        repo: Option<String>,

        /// Local working directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// List repository issues.
    Issues {
        /// Repository; inferred from the directory's remote when omitted.
        repo: Option<String>,

        /// Local working directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Issue state: open, closed or all.
        #[arg(short, long, default_value = "open", value_parser = ["open", "closed", "all"])]
        state: String,

        /// Maximum number of issues.
        #[arg(short, long, default_value = "30")]
        limit: u32,

        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// Verify a personal access token and store it.
    Login {
        /// Read the token from stdin instead of prompting.
        #[arg(long)]
        token_stdin: bool,
    },

    /// Remove stored credentials.
    Logout,

    /// Print or write a license text.
    License {
        /// License identifier: MIT, Apache-2.0 or GPL-3.0.
        id: String,

        /// Copyright holder (defaults to the logged-in username).
        #[arg(long)]
        owner: Option<String>,

        /// Copyright year (defaults to the current year).
        #[arg(long)]
        year: Option<i32>,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing output file.
        #[arg(long)]
        force: bool,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

/// Run a subcommand and return the process exit code.
pub async fn run(command: Commands, config_path: &Path) -> Result<u8> {
    if let Commands::Config { action } = command {
        return config::run_config(action, config_path);
    }

    let session = Session::load(config_path)?;
    let invalidate_on_auth = !matches!(command, Commands::Login { .. });

    let outcome = match command {
        Commands::Create(args) => sync::run_create(&session, args).await,
        Commands::Update(args) => sync::run_update(&session, args).await,
        Commands::Clone { repo, dir } => clone::run_clone(&session, &repo, dir).await,
        Commands::Info { repo, dir, json } => {
            info::run_info(&session, repo.as_deref(), &dir, json).await
        }
        Commands::Issues {
            repo,
            dir,
            state,
            limit,
            json,
        } => issues::run_issues(&session, repo.as_deref(), &dir, &state, limit, json).await,
        Commands::Login { token_stdin } => auth::run_login(&session, token_stdin).await,
        Commands::Logout => auth::run_logout(&session),
        Commands::License {
            id,
            owner,
            year,
            output,
            force,
        } => license::run_license(&session, &id, owner, year, output.as_deref(), force),
        Commands::Config { .. } => unreachable!("handled above"),
    };

    discard_rejected_credentials(&session, invalidate_on_auth, outcome)
}

/// Remove stored credentials when the outcome is an authentication failure.
/// `login` passes `invalidate_on_auth = false`: a rejected new token says
/// nothing about the stored one.
fn discard_rejected_credentials(
    session: &Session,
    invalidate_on_auth: bool,
    outcome: Result<u8>,
) -> Result<u8> {
    if let Err(e) = &outcome {
        if invalidate_on_auth && failure_kind(e) == Some(FailureKind::Auth) {
            session.invalidate_credentials();
        }
    }
    outcome
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Configuration and credential store for one invocation.
pub struct Session {
    pub config: AppConfig,
    pub store: CredentialStore,
}

impl Session {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = AppConfig::load_and_resolve(config_path).with_context(|| {
            format!("failed to load configuration from {}", config_path.display())
        })?;
        let store = CredentialStore::new(config.credentials.resolved_path());
        Ok(Self { config, store })
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Ok(resolve_credentials(&self.store, &self.config)?)
    }

    pub fn engine(&self) -> Result<SyncEngine> {
        SyncEngine::from_config(self.config.clone()).context("failed to create GitHub client")
    }

    pub fn github(&self) -> Result<GitHubClient> {
        Ok(self.engine()?.github().clone())
    }

    /// Resolve a repository argument, falling back to the remote of `dir`.
    pub fn target(
        &self,
        repo: Option<&str>,
        dir: &Path,
        credentials: &Credentials,
    ) -> Result<RepositoryTarget> {
        let slug = match repo {
            Some(repo) => repo.to_string(),
            None => slug_from_remote(dir, &self.config.git.remote_name).with_context(|| {
                format!(
                    "no repository given and '{}' has no '{}' remote to infer it from",
                    dir.display(),
                    self.config.git.remote_name
                )
            })?,
        };
        RepositoryTarget::parse_slug(&slug, &credentials.username)
            .with_context(|| format!("invalid repository name '{}', expected owner/name", slug))
    }

    /// Remove stored credentials after the API rejected them.
    pub fn invalidate_credentials(&self) {
        if !self.store.path().exists() {
            return;
        }
        match self.store.invalidate() {
            Ok(()) => eprintln!(
                "{}",
                style::warn("Stored credentials were rejected and have been removed. Run 'ghsync login'.")
            ),
            Err(e) => tracing::warn!(error = %e, "failed to remove rejected credentials"),
        }
    }
}

/// `owner/name` from the URL of `remote_name` in `dir`.
fn slug_from_remote(dir: &Path, remote_name: &str) -> Option<String> {
    let git = GitClient::open(dir).ok()?;
    let (_, url) = git
        .remotes()
        .ok()?
        .into_iter()
        .find(|(name, _)| name == remote_name)?;
    slug_from_url(&url)
}

/// Last two path segments of a remote URL, `.git` stripped. Handles both
/// `https://host/owner/name.git` and `git@host:owner/name.git`.
fn slug_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = trimmed.rsplit(['/', ':']);
    let name = parts.next()?;
    let owner = parts.next()?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Classify the first typed core error in the chain.
pub fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<SyncError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<GitHubError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<GitError>() {
            Some(e.kind())
        } else if cause.downcast_ref::<LicenseError>().is_some() {
            Some(FailureKind::UnsupportedLicense)
        } else {
            None
        }
    })
}

/// Exit code for a command that ended with `err`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    failure_kind(err).map_or(1, FailureKind::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghsync_core::sync_engine::{FailureRecord, SyncResult, SyncState};

    fn session_with_stored_credentials(dir: &Path) -> Session {
        let store = CredentialStore::new(dir.join("credentials"));
        store
            .save(&Credentials::new("alice", "stale-token"))
            .unwrap();
        assert!(store.path().exists());
        Session {
            config: AppConfig::default(),
            store,
        }
    }

    fn failed_result(kind: FailureKind) -> SyncResult {
        SyncResult {
            remote_url: None,
            created_new: false,
            commit_made: false,
            pushed: false,
            errors: vec![FailureRecord {
                state: SyncState::Idle,
                kind,
                message: "Bad credentials".into(),
            }],
            state: SyncState::Failed,
        }
    }

    #[test]
    fn test_fatal_auth_result_removes_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_stored_credentials(dir.path());

        let result = failed_result(FailureKind::Auth);
        let code = sync::finish(&session, &result, "alice/demo", "main", true).unwrap();
        assert_eq!(code, 2);
        assert!(!session.store.path().exists());
    }

    #[test]
    fn test_other_failures_keep_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_stored_credentials(dir.path());

        let result = failed_result(FailureKind::Api);
        let code = sync::finish(&session, &result, "alice/demo", "main", true).unwrap();
        assert_eq!(code, 3);
        assert!(session.store.path().exists());

        let outcome: Result<u8> = Err(anyhow::anyhow!("network unreachable"));
        assert!(discard_rejected_credentials(&session, true, outcome).is_err());
        assert!(session.store.path().exists());
    }

    #[test]
    fn test_auth_error_chain_removes_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_stored_credentials(dir.path());

        let outcome: Result<u8> = Err(anyhow::Error::new(GitHubError::AuthenticationFailed(
            "Bad credentials".into(),
        ))
        .context("failed to fetch repository"));
        let err = discard_rejected_credentials(&session, true, outcome).unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert!(!session.store.path().exists());
    }

    #[test]
    fn test_rejected_login_keeps_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_stored_credentials(dir.path());

        let outcome: Result<u8> = Err(anyhow::Error::new(GitHubError::AuthenticationFailed(
            "Bad credentials".into(),
        ))
        .context("token verification failed"));
        assert!(discard_rejected_credentials(&session, false, outcome).is_err());
        assert!(session.store.path().exists());
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(
            slug_from_url("https://github.com/alice/demo.git").as_deref(),
            Some("alice/demo")
        );
        assert_eq!(
            slug_from_url("git@github.com:acme/widgets.git").as_deref(),
            Some("acme/widgets")
        );
        assert_eq!(
            slug_from_url("/tmp/bare/alice/demo.git/").as_deref(),
            Some("alice/demo")
        );
        assert!(slug_from_url("demo").is_none());
    }

    #[test]
    fn test_slug_from_remote() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitClient::init(dir.path(), "main").unwrap();
        assert!(slug_from_remote(dir.path(), "origin").is_none());
        git.link_remote("origin", "https://github.com/alice/demo.git")
            .unwrap();
        assert_eq!(
            slug_from_remote(dir.path(), "origin").as_deref(),
            Some("alice/demo")
        );
    }

    #[test]
    fn test_exit_code_from_error_chain() {
        let err = anyhow::Error::new(GitHubError::AuthenticationFailed("Bad credentials".into()))
            .context("failed to fetch repository");
        assert_eq!(failure_kind(&err), Some(FailureKind::Auth));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(LicenseError::Unsupported("BSD".into()));
        assert_eq!(exit_code(&err), 5);

        let err: anyhow::Error = SyncError::from(GitError::PushFailed {
            branch: "main".into(),
            detail: "rejected".into(),
        })
        .into();
        assert_eq!(exit_code(&err), 4);

        assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
    }
}
