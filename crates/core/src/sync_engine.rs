//! Repository synchronization engine.
//!
//! The [`SyncEngine`] runs one workflow per invocation as a linear pipeline:
//!
//! - **create**: ensure the remote exists (creating it), write README and
//!   LICENSE (best effort), stage and commit, link the remote, force-push.
//! - **update**: verify the remote exists, link it, stage and commit,
//!   force-push.
//!
//! Each step moves a small state machine forward. The first fatal error
//! moves it to [`SyncState::Failed`] and the partial [`SyncResult`] is
//! returned. Completed steps are not rolled back: a repository created
//! before a failed push stays on the server.

use std::path::Path;

use chrono::Datelike;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::{FailureKind, GitError, GitHubError, SyncError};
use crate::git::client::{CommitIdentity, GitClient};
use crate::git::github::GitHubClient;
use crate::license::{is_no_license, materialize_license};
use crate::models::{Credentials, RemotePolicy, RemoteRepo, RepoDetails, RepositoryTarget};

/// Commit message of the first commit made by `create`.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

// ---------------------------------------------------------------------------
// Sync state machine
// ---------------------------------------------------------------------------

/// States of one workflow invocation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    RemoteChecked,
    RemoteCreated,
    RemoteConfirmed,
    Committed,
    Linked,
    Pushed,
    Failed,
}

impl SyncState {
    /// Whether `next` is a legal successor. `Failed` is reachable from every
    /// non-terminal state; `Pushed` and `Failed` have no successors.
    pub fn can_transition_to(self, next: SyncState) -> bool {
        use SyncState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Idle, RemoteChecked)
                | (RemoteChecked, RemoteCreated)
                | (RemoteChecked, RemoteConfirmed)
                | (RemoteCreated | RemoteConfirmed, Committed)
                | (RemoteCreated | RemoteConfirmed, Linked)
                | (Committed, Linked)
                | (Linked, Committed)
                | (Committed | Linked, Pushed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Pushed | Self::Failed)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RemoteChecked => write!(f, "remote_checked"),
            Self::RemoteCreated => write!(f, "remote_created"),
            Self::RemoteConfirmed => write!(f, "remote_confirmed"),
            Self::Committed => write!(f, "committed"),
            Self::Linked => write!(f, "linked"),
            Self::Pushed => write!(f, "pushed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    /// State the workflow was in when the step failed.
    pub state: SyncState,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureRecord {
    fn from_error(state: SyncState, err: &SyncError) -> Self {
        Self {
            state,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    /// Browser URL of the remote, once known.
    pub remote_url: Option<String>,
    pub created_new: bool,
    pub commit_made: bool,
    pub pushed: bool,
    /// Failures in the order they happened. Non-fatal ones do not stop the
    /// workflow; a fatal one is always last.
    pub errors: Vec<FailureRecord>,
    pub state: SyncState,
}

impl SyncResult {
    fn new() -> Self {
        Self {
            remote_url: None,
            created_new: false,
            commit_made: false,
            pushed: false,
            errors: Vec::new(),
            state: SyncState::Idle,
        }
    }

    /// The workflow reached `Pushed`.
    pub fn is_success(&self) -> bool {
        self.state == SyncState::Pushed
    }

    /// The failure that aborted the workflow, if any.
    pub fn fatal_error(&self) -> Option<&FailureRecord> {
        self.errors.iter().find(|e| e.kind.is_fatal())
    }

    /// Non-fatal failures.
    pub fn warnings(&self) -> impl Iterator<Item = &FailureRecord> {
        self.errors.iter().filter(|e| !e.kind.is_fatal())
    }

    /// Process exit code: 0 on success, else the code of the fatal failure.
    pub fn exit_code(&self) -> u8 {
        match self.fatal_error() {
            Some(record) => record.kind.exit_code(),
            None if self.is_success() => 0,
            None => FailureKind::Local.exit_code(),
        }
    }
}

/// Tracks state and results while a workflow runs.
struct SyncRun {
    result: SyncResult,
}

impl SyncRun {
    fn new() -> Self {
        Self {
            result: SyncResult::new(),
        }
    }

    fn state(&self) -> SyncState {
        self.result.state
    }

    fn advance(&mut self, next: SyncState) -> Result<(), SyncError> {
        let current = self.result.state;
        if !current.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %current, to = %next, "sync state transition");
        self.result.state = next;
        Ok(())
    }

    /// Record a failure that does not stop the workflow.
    fn warn(&mut self, err: &SyncError) {
        warn!(state = %self.state(), error = %err, "non-fatal sync failure");
        self.result
            .errors
            .push(FailureRecord::from_error(self.state(), err));
    }

    /// Record the aborting failure and move to `Failed`.
    fn fail(mut self, err: SyncError) -> SyncResult {
        warn!(state = %self.state(), kind = %err.kind(), error = %err, "sync aborted");
        self.result
            .errors
            .push(FailureRecord::from_error(self.state(), &err));
        self.result.state = SyncState::Failed;
        self.result
    }

    fn finish(self) -> SyncResult {
        self.result
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs the create and update workflows.
pub struct SyncEngine {
    config: AppConfig,
    github: GitHubClient,
}

impl SyncEngine {
    pub fn new(config: AppConfig, github: GitHubClient) -> Self {
        Self { config, github }
    }

    /// Build the GitHub client from the configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, GitHubError> {
        let github = GitHubClient::new(
            config.github.api_url.clone(),
            std::time::Duration::from_secs(config.github.timeout_secs),
        )?;
        Ok(Self::new(config, github))
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Branch committed to and pushed.
    pub fn branch(&self) -> &str {
        &self.config.git.default_branch
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Make sure the remote repository exists according to `policy`.
    #[instrument(skip(self, target, credentials), fields(repo = %target.full_name()))]
    pub async fn ensure_remote(
        &self,
        target: &RepositoryTarget,
        credentials: &Credentials,
        policy: RemotePolicy,
    ) -> Result<RemoteRepo, SyncError> {
        let existing = self
            .github
            .get_repo(credentials, &target.owner, &target.name)
            .await?;

        match existing {
            Some(_) if policy == RemotePolicy::CreateNew => Err(GitHubError::Conflict {
                repo: target.full_name(),
            }
            .into()),
            Some(details) => {
                info!("remote repository exists");
                Ok(self.remote_repo(target, details, true))
            }
            None if !policy.creates() => {
                Err(GitHubError::RepositoryNotFound(target.full_name()).into())
            }
            None => {
                info!(visibility = %target.visibility, "creating remote repository");
                let details = self.github.create_repo(credentials, target).await?;
                Ok(self.remote_repo(target, details, false))
            }
        }
    }

    fn remote_repo(&self, target: &RepositoryTarget, details: RepoDetails, existed: bool) -> RemoteRepo {
        let clone_url = details
            .clone_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.config.github.clone_url(&target.full_name()));
        RemoteRepo {
            existed,
            html_url: details.html_url,
            clone_url,
        }
    }

    /// Stage everything in `working_dir` and commit it on the configured
    /// branch. Returns `false` without committing when nothing changed.
    #[instrument(skip(self, message, identity), fields(dir = %working_dir.display()))]
    pub fn stage_and_commit(
        &self,
        working_dir: &Path,
        message: &str,
        identity: &CommitIdentity,
    ) -> Result<bool, SyncError> {
        let git = GitClient::open(working_dir)?;
        git.checkout_branch(self.branch())?;
        let committed = git.stage_and_commit(message, identity)?.is_some();
        Ok(committed)
    }

    /// Point the canonical remote at `remote_url`, replacing any old link.
    #[instrument(skip(self), fields(dir = %working_dir.display()))]
    pub fn link_remote(&self, working_dir: &Path, remote_url: &str) -> Result<(), SyncError> {
        let git = GitClient::open(working_dir)?;
        git.link_remote(&self.config.git.remote_name, remote_url)?;
        Ok(())
    }

    /// Force-push `branch` to the canonical remote.
    #[instrument(skip(self, credentials), fields(dir = %working_dir.display()))]
    pub fn push(
        &self,
        working_dir: &Path,
        branch: &str,
        credentials: &Credentials,
    ) -> Result<(), SyncError> {
        let git = GitClient::open(working_dir)?;
        git.push(&self.config.git.remote_name, branch, Some(credentials))?;
        Ok(())
    }

    /// Identity for commits when git config has none.
    pub fn commit_identity(&self, credentials: &Credentials) -> CommitIdentity {
        let git = &self.config.git;
        match (&git.author_name, &git.author_email) {
            (Some(name), Some(email)) => CommitIdentity::new(name.as_str(), email.as_str()),
            _ => CommitIdentity::noreply(&credentials.username),
        }
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Create workflow: ensure remote → license → commit → link → push.
    pub async fn create(
        &self,
        working_dir: &Path,
        target: &RepositoryTarget,
        credentials: &Credentials,
        policy: RemotePolicy,
    ) -> SyncResult {
        info!(repo = %target.full_name(), dir = %working_dir.display(), "starting create workflow");
        let mut run = SyncRun::new();
        let outcome = self
            .run_create(&mut run, working_dir, target, credentials, policy)
            .await;
        match outcome {
            Ok(()) => run.finish(),
            Err(e) => run.fail(e),
        }
    }

    async fn run_create(
        &self,
        run: &mut SyncRun,
        working_dir: &Path,
        target: &RepositoryTarget,
        credentials: &Credentials,
        policy: RemotePolicy,
    ) -> Result<(), SyncError> {
        let remote = self.ensure_remote(target, credentials, policy).await?;
        run.result.remote_url = Some(remote.html_url.clone());
        run.result.created_new = !remote.existed;
        run.advance(SyncState::RemoteChecked)?;
        run.advance(if remote.existed {
            SyncState::RemoteConfirmed
        } else {
            SyncState::RemoteCreated
        })?;

        std::fs::create_dir_all(working_dir).map_err(|source| SyncError::WriteFile {
            path: working_dir.display().to_string(),
            source,
        })?;
        GitClient::open_or_init(working_dir, self.branch())?;
        write_readme(working_dir, target)?;
        if let Err(e) = write_license(working_dir, target) {
            if e.kind().is_fatal() {
                return Err(e);
            }
            run.warn(&e);
        }

        let identity = self.commit_identity(credentials);
        run.result.commit_made =
            self.stage_and_commit(working_dir, INITIAL_COMMIT_MESSAGE, &identity)?;
        run.advance(SyncState::Committed)?;

        self.link_remote(working_dir, &remote.clone_url)?;
        run.advance(SyncState::Linked)?;

        self.push(working_dir, self.branch(), credentials)?;
        run.result.pushed = true;
        run.advance(SyncState::Pushed)?;

        info!(html_url = %remote.html_url, "create workflow completed");
        Ok(())
    }

    /// Update workflow: verify remote → link → commit → push.
    pub async fn update(
        &self,
        working_dir: &Path,
        target: &RepositoryTarget,
        credentials: &Credentials,
        message: &str,
    ) -> SyncResult {
        info!(repo = %target.full_name(), dir = %working_dir.display(), "starting update workflow");
        let mut run = SyncRun::new();
        let outcome = self
            .run_update(&mut run, working_dir, target, credentials, message)
            .await;
        match outcome {
            Ok(()) => run.finish(),
            Err(e) => run.fail(e),
        }
    }

    async fn run_update(
        &self,
        run: &mut SyncRun,
        working_dir: &Path,
        target: &RepositoryTarget,
        credentials: &Credentials,
        message: &str,
    ) -> Result<(), SyncError> {
        if !GitClient::is_repository(working_dir) {
            return Err(GitError::NotARepository(working_dir.display().to_string()).into());
        }

        let remote = self
            .ensure_remote(target, credentials, RemotePolicy::MustExist)
            .await?;
        run.result.remote_url = Some(remote.html_url.clone());
        run.advance(SyncState::RemoteChecked)?;
        run.advance(SyncState::RemoteConfirmed)?;

        self.link_remote(working_dir, &remote.clone_url)?;
        run.advance(SyncState::Linked)?;

        let identity = self.commit_identity(credentials);
        run.result.commit_made = self.stage_and_commit(working_dir, message, &identity)?;
        run.advance(SyncState::Committed)?;

        self.push(working_dir, self.branch(), credentials)?;
        run.result.pushed = true;
        run.advance(SyncState::Pushed)?;

        info!(commit_made = run.result.commit_made, "update workflow completed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generated files
// ---------------------------------------------------------------------------

const README_NAMES: [&str; 4] = ["README.md", "README", "readme.md", "README.txt"];

/// Write `README.md` unless the directory already has a README.
fn write_readme(working_dir: &Path, target: &RepositoryTarget) -> Result<(), SyncError> {
    if README_NAMES.iter().any(|n| working_dir.join(n).exists()) {
        debug!("README already present");
        return Ok(());
    }
    let mut text = format!("# {}\n", target.name);
    if !target.description.trim().is_empty() {
        text.push('\n');
        text.push_str(target.description.trim());
        text.push('\n');
    }
    write_file(&working_dir.join("README.md"), &text)
}

/// Write `LICENSE` for the requested choice unless one already exists.
///
/// Returns a non-fatal [`SyncError::License`] for unsupported choices.
fn write_license(working_dir: &Path, target: &RepositoryTarget) -> Result<(), SyncError> {
    let choice = match target.license.as_deref() {
        Some(choice) if !is_no_license(choice) => choice,
        _ => return Ok(()),
    };
    let path = working_dir.join("LICENSE");
    if path.exists() {
        debug!("LICENSE already present, not overwriting");
        return Ok(());
    }
    let year = chrono::Local::now().year();
    let text = materialize_license(choice, &target.owner, year)?;
    write_file(&path, &text)?;
    info!(license = choice, "wrote LICENSE");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), SyncError> {
    std::fs::write(path, contents).map_err(|source| SyncError::WriteFile {
        path: path.display().to_string(),
        source,
    })
}
