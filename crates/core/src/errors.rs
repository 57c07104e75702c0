//! Error types for the ghsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The
//! top-level [`SyncError`] unifies them for the sync engine, and
//! [`FailureKind`] classifies any of them into the small taxonomy callers
//! act on (abort or not, which exit code).

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invalid or expired credentials. Stored credentials must be invalidated.
    Auth,
    /// Repository name collision on create.
    Conflict,
    /// Any other non-success response from the hosting API.
    Api,
    /// Update requested on a directory without git metadata.
    NotARepository,
    /// Transport failure or ref rejection while pushing.
    Push,
    /// License choice outside the supported set. Never aborts a workflow.
    UnsupportedLicense,
    /// Local git, configuration or I/O failure.
    Local,
}

impl FailureKind {
    /// Whether a failure of this kind aborts the remaining workflow steps.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::UnsupportedLicense)
    }

    /// Process exit code for a CLI invocation that ended with this failure.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Auth => 2,
            Self::Conflict | Self::Api => 3,
            Self::Push => 4,
            Self::UnsupportedLicense => 5,
            Self::NotARepository | Self::Local => 1,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Conflict => write!(f, "conflict"),
            Self::Api => write!(f, "api"),
            Self::NotARepository => write!(f, "not_a_repository"),
            Self::Push => write!(f, "push"),
            Self::UnsupportedLicense => write!(f, "unsupported_license"),
            Self::Local => write!(f, "local"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync engine errors
// ---------------------------------------------------------------------------

/// Errors from the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A state-machine transition was invalid.
    #[error("invalid sync state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Underlying local git error.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Underlying GitHub API error.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// License text could not be produced.
    #[error(transparent)]
    License(#[from] LicenseError),

    /// Failed to write a generated file into the working directory.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Git(e) => e.kind(),
            Self::GitHub(e) => e.kind(),
            Self::License(_) => FailureKind::UnsupportedLicense,
            Self::InvalidStateTransition { .. } | Self::WriteFile { .. } => FailureKind::Local,
        }
    }
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The directory has no git metadata.
    #[error("not a git repository: '{0}'")]
    NotARepository(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// The push failed in transport or a ref update was rejected.
    #[error("git push of branch '{branch}' failed: {detail}")]
    PushFailed { branch: String, detail: String },

    /// Clone failed.
    #[error("git clone of '{url}' failed: {detail}")]
    CloneFailed { url: String, detail: String },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotARepository(_) => FailureKind::NotARepository,
            Self::PushFailed { .. } => FailureKind::Push,
            Self::Git2Error(_) | Self::CloneFailed { .. } | Self::IoError(_) => FailureKind::Local,
        }
    }
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Credentials were rejected (HTTP 401).
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The repository name is already taken.
    #[error("repository '{repo}' already exists")]
    Conflict { repo: String },

    /// The repository does not exist and creation was not requested.
    #[error("repository '{0}' not found")]
    RepositoryNotFound(String),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A success response that lacks a required field.
    #[error("unexpected GitHub response: {0}")]
    UnexpectedResponse(String),
}

impl GitHubError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthenticationFailed(_) => FailureKind::Auth,
            Self::Conflict { .. } => FailureKind::Conflict,
            Self::HttpError(_)
            | Self::RepositoryNotFound(_)
            | Self::ApiError { .. }
            | Self::UnexpectedResponse(_) => FailureKind::Api,
        }
    }
}

// ---------------------------------------------------------------------------
// License errors
// ---------------------------------------------------------------------------

/// Errors from license text generation.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The requested license is not one of MIT, Apache-2.0, GPL-3.0.
    #[error("unsupported license '{0}' (supported: MIT, Apache-2.0, GPL-3.0)")]
    Unsupported(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

/// Errors from the credential file store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credentials are stored or configured.
    #[error("no GitHub credentials found; run 'ghsync login' or set {token_env}")]
    Missing { token_env: String },

    /// The credential file exists but is not in `key=value` form.
    #[error("malformed credential file '{path}': {detail}")]
    Malformed { path: String, detail: String },

    /// Generic I/O error.
    #[error("credential store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
