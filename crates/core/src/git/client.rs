//! Local git repository operations via `git2`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

use git2::{
    BranchType, Cred, ErrorCode, FetchOptions, Index, IndexAddOption, IndexEntry, IndexTime, Oid,
    PushOptions, RemoteCallbacks, Repository, RepositoryInitOptions, Signature, StatusOptions,
};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;
use crate::models::Credentials;

/// Index mode of a gitlink (a commit recorded in place of a directory).
const GITLINK_MODE: u32 = 0o160000;

/// Author/committer identity used when git config has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl CommitIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// `{username} <{username}@users.noreply.github.com>`
    pub fn noreply(username: &str) -> Self {
        Self::new(username, format!("{}@users.noreply.github.com", username))
    }
}

/// High-level client wrapping a `git2::Repository` working directory.
pub struct GitClient {
    repo: Repository,
}

impl GitClient {
    /// Open the repository whose working directory is `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::NotARepository(path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// Initialize a new repository at `path` with `branch` as the unborn HEAD.
    #[instrument(fields(path = %path.display()))]
    pub fn init(path: &Path, branch: &str) -> Result<Self, GitError> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(branch);
        let repo = Repository::init_opts(path, &opts)?;
        info!("initialized git repository");
        Ok(Self { repo })
    }

    /// Open `path` if it is a repository, initialize it otherwise.
    pub fn open_or_init(path: &Path, branch: &str) -> Result<Self, GitError> {
        if Self::is_repository(path) {
            Self::open(path)
        } else {
            Self::init(path, branch)
        }
    }

    /// Whether `path` has git metadata of its own.
    pub fn is_repository(path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    /// Clone `url` into `path`, reporting progress lines to `progress`.
    #[instrument(skip(credentials, progress), fields(url = %url, path = %path.display()))]
    pub fn clone_repo(
        url: &str,
        path: &Path,
        credentials: Option<&Credentials>,
        progress: &mut dyn FnMut(&str),
    ) -> Result<Self, GitError> {
        info!("cloning repository");
        let progress = RefCell::new(progress);
        let mut last_percent = None::<usize>;

        let mut callbacks = auth_callbacks(credentials);
        callbacks.sideband_progress(|data| {
            let text = String::from_utf8_lossy(data);
            for line in text.split(['\r', '\n']).map(str::trim).filter(|l| !l.is_empty()) {
                (*progress.borrow_mut())(line);
            }
            true
        });
        callbacks.transfer_progress(|stats| {
            let total = stats.total_objects();
            if total > 0 {
                let received = stats.received_objects();
                let percent = received * 100 / total;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    let line = format!(
                        "Receiving objects: {:>3}% ({}/{})",
                        percent, received, total
                    );
                    (*progress.borrow_mut())(&line);
                }
            }
            true
        });

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        let repo = builder.clone(url, path).map_err(|e| GitError::CloneFailed {
            url: url.to_string(),
            detail: e.message().to_string(),
        })?;
        info!("clone completed");
        Ok(Self { repo })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Number of paths that differ from HEAD (`status --porcelain` line count).
    pub fn pending_changes(&self) -> Result<usize, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.len())
    }

    /// Make `branch` the checked-out branch (`checkout -B` semantics).
    ///
    /// An unborn HEAD is pointed at the branch. Otherwise the branch is
    /// created or moved to the current HEAD commit and HEAD is switched to
    /// it; the working tree is not touched.
    #[instrument(skip(self))]
    pub fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        let target_ref = format!("refs/heads/{}", branch);
        match self.repo.head() {
            Ok(head) => {
                if head.name() == Some(target_ref.as_str()) {
                    return Ok(());
                }
                let commit = head.peel_to_commit()?;
                self.repo.branch(branch, &commit, true)?;
                self.repo.set_head(&target_ref)?;
                info!(branch, sha = %commit.id(), "switched branch");
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                self.repo.set_head(&target_ref)?;
                debug!(branch, "pointed unborn HEAD at branch");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Stage every tracked and untracked path (honouring ignore rules,
    /// including deletions) and commit it on HEAD.
    ///
    /// Returns `None` without committing when the staged tree equals
    /// HEAD's tree (or is empty on an unborn branch).
    #[instrument(skip(self, message, fallback))]
    pub fn stage_and_commit(
        &self,
        message: &str,
        fallback: &CommitIdentity,
    ) -> Result<Option<Oid>, GitError> {
        let mut index = self.repo.index()?;
        let workdir = self.repo.workdir().map(Path::to_path_buf);
        let mut nested = BTreeSet::new();
        {
            // Nested repositories cannot be staged path by path; record them
            // and add them as gitlinks below.
            let mut skip_nested = |path: &Path, _: &[u8]| -> i32 {
                match &workdir {
                    Some(root) if root.join(path).join(".git").exists() => {
                        nested.insert(path.to_string_lossy().trim_end_matches('/').to_string());
                        1
                    }
                    _ => 0,
                }
            };
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, Some(&mut skip_nested))?;
            index.update_all(["*"].iter(), Some(&mut skip_nested))?;
        }
        // The workdir diff reports tracked gitlinks as unchanged even when the
        // nested HEAD moved, so refresh every one still backed by a repository.
        if let Some(root) = &workdir {
            for entry in index.iter().filter(|e| e.mode == GITLINK_MODE) {
                let path = String::from_utf8_lossy(&entry.path).into_owned();
                if root.join(&path).join(".git").exists() {
                    nested.insert(path);
                }
            }
        }
        for path in &nested {
            self.stage_gitlink(&mut index, path)?;
        }
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };

        let unchanged = match &parent {
            Some(commit) => commit.tree_id() == tree_oid,
            None => tree.is_empty(),
        };
        if unchanged {
            info!("working tree clean, nothing to commit");
            return Ok(None);
        }

        let signature = self.signature(fallback)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!(sha = %oid, files = tree.len(), "created commit");
        Ok(Some(oid))
    }

    /// Record the nested repository at `path` as a gitlink pointing at its
    /// HEAD commit. A nested repository without commits is left out.
    fn stage_gitlink(&self, index: &mut Index, path: &str) -> Result<(), GitError> {
        let Some(root) = self.repo.workdir() else {
            return Ok(());
        };
        let head = Repository::open(root.join(path)).and_then(|nested| {
            let commit = nested.head()?.peel_to_commit()?;
            Ok(commit.id())
        });
        let oid = match head {
            Ok(oid) => oid,
            Err(e) => {
                warn!(path, error = %e.message(), "skipping nested repository without a commit");
                return Ok(());
            }
        };
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: GITLINK_MODE,
            uid: 0,
            gid: 0,
            file_size: 0,
            id: oid,
            flags: path.len().min(0xfff) as u16,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        };
        index.add(&entry)?;
        debug!(path, sha = %oid, "staged nested repository as gitlink");
        Ok(())
    }

    fn signature(&self, fallback: &CommitIdentity) -> Result<Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => {
                debug!(name = %fallback.name, "no git identity configured, using fallback");
                Ok(Signature::now(&fallback.name, &fallback.email)?)
            }
        }
    }

    /// Point the remote `name` at `url`, removing any previous link first.
    #[instrument(skip(self))]
    pub fn link_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        if self.repo.find_remote(name).is_ok() {
            self.repo.remote_delete(name)?;
            debug!(remote = name, "removed existing remote");
        }
        self.repo.remote(name, url)?;
        info!(remote = name, url, "linked remote");
        Ok(())
    }

    /// `(name, url)` for every configured remote.
    pub fn remotes(&self) -> Result<Vec<(String, String)>, GitError> {
        let names = self.repo.remotes()?;
        let mut out = Vec::new();
        for name in names.iter().flatten() {
            let remote = self.repo.find_remote(name)?;
            out.push((name.to_string(), remote.url().unwrap_or("").to_string()));
        }
        Ok(out)
    }

    /// Force-push `branch` to `remote_name`. Never retried.
    #[instrument(skip(self, credentials))]
    pub fn push(
        &self,
        remote_name: &str,
        branch: &str,
        credentials: Option<&Credentials>,
    ) -> Result<(), GitError> {
        info!(remote = remote_name, branch, "force-pushing");
        let push_failed = |detail: String| GitError::PushFailed {
            branch: branch.to_string(),
            detail,
        };

        self.repo
            .find_branch(branch, BranchType::Local)
            .map_err(|_| push_failed(format!("local branch '{}' does not exist", branch)))?;
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|e| push_failed(e.message().to_string()))?;

        let rejection = RefCell::new(None::<String>);
        let mut callbacks = auth_callbacks(credentials);
        callbacks.push_update_reference(|refname, status| {
            if let Some(msg) = status {
                warn!(refname, msg, "push rejected");
                *rejection.borrow_mut() = Some(format!("{}: {}", refname, msg));
            }
            Ok(())
        });
        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);

        let refspec = format!("+refs/heads/{}:refs/heads/{}", branch, branch);
        remote
            .push(&[&refspec], Some(&mut push_opts))
            .map_err(|e| push_failed(e.message().to_string()))?;
        if let Some(detail) = rejection.borrow_mut().take() {
            return Err(push_failed(detail));
        }
        info!("push completed");
        Ok(())
    }

    /// SHA of HEAD, `None` on an unborn branch.
    pub fn head_sha(&self) -> Result<Option<String>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> Result<usize, GitError> {
        if self.head_sha()?.is_none() {
            return Ok(0);
        }
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        Ok(revwalk.count())
    }

    /// Name of the checked-out branch, if any.
    pub fn current_branch(&self) -> Option<String> {
        self.repo
            .head()
            .ok()
            .and_then(|h| h.shorthand().map(str::to_string))
    }
}

/// Callbacks answering credential requests with the access token.
fn auth_callbacks<'a>(credentials: Option<&Credentials>) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(creds) = credentials {
        let username = creds.username.clone();
        let token = creds.token.clone();
        callbacks.credentials(move |_url, _username, _allowed| {
            Cred::userpass_plaintext(&username, &token)
        });
    }
    callbacks
}
