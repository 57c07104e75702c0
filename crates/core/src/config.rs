//! TOML-based configuration for ghsync.
//!
//! The configuration file is optional: every field has a default, so a
//! missing file behaves like an empty one. The GitHub token is never stored
//! here; `token_env` names the environment variable that holds it and
//! [`AppConfig::resolve_env_vars`] reads it at runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Local git behaviour.
    #[serde(default)]
    pub git: GitConfig,

    /// Credential file location.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Explicit git clone/push base URL. Overrides the derivation from
    /// `api_url` for enterprise hosts where the two differ.
    #[serde(default)]
    pub git_base_url: Option<String>,

    /// Environment variable holding a personal access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            git_base_url: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl GitHubConfig {
    /// HTTPS clone URL for `owner/name` on the configured host.
    pub fn clone_url(&self, full_name: &str) -> String {
        crate::git::remote_url::derive_git_remote_url(
            &self.api_url,
            self.git_base_url.as_deref(),
            full_name,
        )
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Local git settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Name of the remote link managed by ghsync.
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Branch that is committed to and force-pushed.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Commit author name when git config has none.
    #[serde(default)]
    pub author_name: Option<String>,

    /// Commit author email when git config has none.
    #[serde(default)]
    pub author_email: Option<String>,

    /// Commit message used by `update` when none is given.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote_name: default_remote_name(),
            default_branch: default_branch(),
            author_name: None,
            author_email: None,
            commit_message: default_commit_message(),
        }
    }
}

fn default_remote_name() -> String {
    "origin".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_commit_message() -> String {
    "Update from ghsync".into()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Credential file settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Path of the credential file. Defaults to
    /// `<config dir>/ghsync/credentials`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CredentialsConfig {
    /// The credential file path, with a leading `~` expanded to the home
    /// directory.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => expand_home(path),
            None => config_dir().join("credentials"),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => {
            warn!(path = %path.display(), "no home directory to expand '~' against");
            path.to_path_buf()
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

/// `<platform config dir>/ghsync`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghsync")
}

impl AppConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `github.token_env` from the environment.
    pub fn resolve_env_vars(&mut self) {
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
    }

    /// Validate that all fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must not be empty".into(),
            });
        }
        if !self.github.api_url.starts_with("http://")
            && !self.github.api_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must start with http:// or https://".into(),
            });
        }
        if self.github.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "github.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.git.remote_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "git.remote_name".into(),
                detail: "remote name must not be empty".into(),
            });
        }
        if self.git.default_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "git.default_branch".into(),
                detail: "branch name must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Load, resolve and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Commented default configuration file.
    pub fn default_template() -> &'static str {
        r#"# ghsync configuration

[github]
api_url = "https://api.github.com"
# git_base_url = "https://github.company.com"
token_env = "GITHUB_TOKEN"
timeout_secs = 30

[git]
remote_name = "origin"
default_branch = "main"
# author_name = "Your Name"
# author_email = "you@example.com"
commit_message = "Update from ghsync"

[credentials]
# path = "~/.config/ghsync/credentials"
"#
    }
}

/// Try to read an environment variable by name.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => None,
    }
}
