//! Domain model types shared by the sync engine, the GitHub client and the CLI.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Repository target
// ---------------------------------------------------------------------------

/// Visibility of a hosted repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// The remote repository a workflow operates on.
///
/// Built once per invocation and never mutated while a workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// License identifier as requested by the caller (`MIT`, `Apache-2.0`,
    /// `GPL-3.0`, `none`). `None` means no license file was requested.
    #[serde(default)]
    pub license: Option<String>,
}

impl RepositoryTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            description: String::new(),
            visibility: Visibility::Public,
            license: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Parse `owner/name` or a bare `name` (owned by `default_owner`).
    ///
    /// Returns `None` when either part is empty or there are extra slashes.
    pub fn parse_slug(slug: &str, default_owner: &str) -> Option<Self> {
        let slug = slug.trim().trim_end_matches(".git");
        let (owner, name) = match slug.split_once('/') {
            Some((owner, name)) => (owner, name),
            None => (default_owner, slug),
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// GitHub username and personal access token.
///
/// Passed explicitly into every engine and client call. The token is never
/// printed: `Debug` shows only a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Token with everything but the first four characters masked.
    pub fn redacted_token(&self) -> String {
        let prefix: String = self.token.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.redacted_token())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Remote repository
// ---------------------------------------------------------------------------

/// How `ensure_remote` treats a missing or already existing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePolicy {
    /// The repository must already exist.
    MustExist,
    /// Create the repository when it is missing; reuse it otherwise.
    CreateIfMissing,
    /// Create the repository; an existing one is a name conflict.
    CreateNew,
}

impl RemotePolicy {
    pub fn creates(self) -> bool {
        !matches!(self, Self::MustExist)
    }
}

/// Outcome of `ensure_remote`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteRepo {
    /// Whether the repository existed before the call.
    pub existed: bool,
    /// Browser URL of the repository.
    pub html_url: String,
    /// URL used for the git remote link.
    pub clone_url: String,
}

// ---------------------------------------------------------------------------
// GitHub read models
// ---------------------------------------------------------------------------

/// Repository metadata from `GET /repos/{owner}/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDetails {
    #[serde(default)]
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub license: Option<RepoLicense>,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
    pub name: String,
}

/// An issue from `GET /repos/{owner}/{name}/issues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub user: Option<IssueUser>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present only when the entry is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

/// The authenticated user from `GET /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
