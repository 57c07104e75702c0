//! In-process fake of the GitHub REST API.
//!
//! Served by axum on `127.0.0.1:0`. Repositories "created" through it are
//! local bare git repositories, and their `clone_url` is the bare repo's
//! filesystem path, so push and clone work without network access.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use ghsync_core::config::AppConfig;
use ghsync_core::git::GitHubClient;
use ghsync_core::models::Credentials;
use ghsync_core::sync_engine::SyncEngine;

pub const USERNAME: &str = "alice";
pub const GOOD_TOKEN: &str = "good-token";

// ===========================================================================
// Fake server state
// ===========================================================================

#[derive(Clone)]
struct FakeRepo {
    owner: String,
    name: String,
    description: String,
    private: bool,
    bare_path: PathBuf,
}

impl FakeRepo {
    fn to_json(&self) -> Value {
        json!({
            "full_name": format!("{}/{}", self.owner, self.name),
            "html_url": format!("https://github.test/{}/{}", self.owner, self.name),
            "clone_url": self.bare_path.display().to_string(),
            "description": self.description,
            "private": self.private,
            "default_branch": "main",
            "stargazers_count": 3,
            "forks_count": 1,
            "open_issues_count": 2,
            "license": { "spdx_id": "MIT", "name": "MIT License" },
            "pushed_at": "2024-05-01T12:00:00Z",
        })
    }
}

#[derive(Default)]
struct Inner {
    repos: HashMap<String, FakeRepo>,
    create_calls: usize,
    /// When set, create requests succeed but omit `html_url`.
    omit_html_url: bool,
}

#[derive(Clone)]
struct FakeState {
    inner: Arc<Mutex<Inner>>,
    bare_root: PathBuf,
}

impl FakeState {
    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", GOOD_TOKEN))
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Bad credentials" })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not Found" })),
    )
        .into_response()
}

// ===========================================================================
// Handlers
// ===========================================================================

async fn get_user(headers: HeaderMap) -> Response {
    if !FakeState::authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "login": USERNAME, "id": 1, "name": "Alice Example" })).into_response()
}

async fn get_repo(
    State(state): State<FakeState>,
    headers: HeaderMap,
    UrlPath((owner, name)): UrlPath<(String, String)>,
) -> Response {
    if !FakeState::authorized(&headers) {
        return unauthorized();
    }
    let inner = state.inner.lock().unwrap();
    match inner.repos.get(&format!("{}/{}", owner, name)) {
        Some(repo) => Json(repo.to_json()).into_response(),
        None => not_found(),
    }
}

async fn create_user_repo(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !FakeState::authorized(&headers) {
        return unauthorized();
    }
    create_repo(&state, USERNAME, &body)
}

async fn create_org_repo(
    State(state): State<FakeState>,
    headers: HeaderMap,
    UrlPath(org): UrlPath<String>,
    Json(body): Json<Value>,
) -> Response {
    if !FakeState::authorized(&headers) {
        return unauthorized();
    }
    create_repo(&state, &org, &body)
}

fn create_repo(state: &FakeState, owner: &str, body: &Value) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let full_name = format!("{}/{}", owner, name);
    let mut inner = state.inner.lock().unwrap();
    inner.create_calls += 1;

    if name.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "Validation Failed",
                "errors": [{ "resource": "Repository", "field": "name", "code": "missing_field" }]
            })),
        )
            .into_response();
    }
    if inner.repos.contains_key(&full_name) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "Repository creation failed.",
                "errors": [{
                    "resource": "Repository",
                    "code": "custom",
                    "field": "name",
                    "message": "name already exists on this account"
                }]
            })),
        )
            .into_response();
    }

    let bare_path = state.bare_root.join(owner).join(format!("{}.git", name));
    if let Err(e) = git2::Repository::init_bare(&bare_path) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": e.to_string() })),
        )
            .into_response();
    }
    let repo = FakeRepo {
        owner: owner.to_string(),
        name,
        description: body["description"].as_str().unwrap_or_default().to_string(),
        private: body["private"].as_bool().unwrap_or(false),
        bare_path,
    };
    let mut payload = repo.to_json();
    inner.repos.insert(full_name, repo);
    if inner.omit_html_url {
        if let Some(obj) = payload.as_object_mut() {
            obj.remove("html_url");
        }
    }
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn list_issues(
    State(state): State<FakeState>,
    headers: HeaderMap,
    UrlPath((owner, name)): UrlPath<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !FakeState::authorized(&headers) {
        return unauthorized();
    }
    if !state
        .inner
        .lock()
        .unwrap()
        .repos
        .contains_key(&format!("{}/{}", owner, name))
    {
        return not_found();
    }
    let wanted = params.get("state").map(String::as_str).unwrap_or("open");
    let all = vec![
        json!({
            "number": 1, "title": "Crash on empty input", "state": "open",
            "html_url": format!("https://github.test/{}/{}/issues/1", owner, name),
            "user": { "login": "bob" }, "comments": 2,
            "created_at": "2024-04-01T09:00:00Z"
        }),
        json!({
            "number": 2, "title": "Add docs", "state": "open",
            "html_url": format!("https://github.test/{}/{}/pull/2", owner, name),
            "user": { "login": "carol" }, "comments": 0,
            "pull_request": { "url": "https://api.github.test/pulls/2" }
        }),
        json!({
            "number": 3, "title": "Typo in README", "state": "closed",
            "html_url": format!("https://github.test/{}/{}/issues/3", owner, name),
            "user": { "login": "dave" }, "comments": 1
        }),
    ];
    let issues: Vec<Value> = all
        .into_iter()
        .filter(|i| wanted == "all" || i["state"] == wanted)
        .collect();
    Json(issues).into_response()
}

// ===========================================================================
// Harness
// ===========================================================================

/// A running fake API plus the temp directory holding its bare repos.
pub struct FakeGitHub {
    pub api_url: String,
    state: FakeState,
    _bare_dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let bare_dir = TempDir::new().expect("failed to create bare repo dir");
        let state = FakeState {
            inner: Arc::new(Mutex::new(Inner::default())),
            bare_root: bare_dir.path().to_path_buf(),
        };
        let app = Router::new()
            .route("/user", get(get_user))
            .route("/user/repos", post(create_user_repo))
            .route("/orgs/:org/repos", post(create_org_repo))
            .route("/repos/:owner/:name", get(get_repo))
            .route("/repos/:owner/:name/issues", get(list_issues))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://{}", addr),
            state,
            _bare_dir: bare_dir,
            _handle: handle,
        }
    }

    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.github.api_url = self.api_url.clone();
        config.github.timeout_secs = 10;
        config
    }

    pub fn client(&self) -> GitHubClient {
        GitHubClient::new(self.api_url.clone(), Duration::from_secs(10)).unwrap()
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.config(), self.client())
    }

    /// Pre-create a repository as if it already existed on the server.
    pub fn seed_repo(&self, owner: &str, name: &str) -> PathBuf {
        let response = create_repo(
            &self.state,
            owner,
            &json!({ "name": name, "description": "seeded" }),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        let mut inner = self.state.inner.lock().unwrap();
        inner.create_calls -= 1;
        inner.repos[&format!("{}/{}", owner, name)].bare_path.clone()
    }

    pub fn bare_path(&self, owner: &str, name: &str) -> Option<PathBuf> {
        self.state
            .inner
            .lock()
            .unwrap()
            .repos
            .get(&format!("{}/{}", owner, name))
            .map(|r| r.bare_path.clone())
    }

    pub fn is_private(&self, owner: &str, name: &str) -> Option<bool> {
        self.state
            .inner
            .lock()
            .unwrap()
            .repos
            .get(&format!("{}/{}", owner, name))
            .map(|r| r.private)
    }

    pub fn create_calls(&self) -> usize {
        self.state.inner.lock().unwrap().create_calls
    }

    pub fn omit_html_url_on_create(&self) {
        self.state.inner.lock().unwrap().omit_html_url = true;
    }
}

pub fn good_credentials() -> Credentials {
    Credentials::new(USERNAME, GOOD_TOKEN)
}

pub fn bad_credentials() -> Credentials {
    Credentials::new(USERNAME, "expired-token")
}

// ===========================================================================
// Git helpers
// ===========================================================================

/// Commits reachable from `refs/heads/{branch}` in the repository at `path`.
pub fn branch_commits(path: &Path, branch: &str) -> Vec<git2::Oid> {
    let repo = git2::Repository::open(path).unwrap();
    let Ok(reference) = repo.find_reference(&format!("refs/heads/{}", branch)) else {
        return Vec::new();
    };
    let mut walk = repo.revwalk().unwrap();
    walk.push(reference.target().unwrap()).unwrap();
    walk.map(|oid| oid.unwrap()).collect()
}

/// File names in the tree at the tip of `refs/heads/{branch}`.
pub fn branch_files(path: &Path, branch: &str) -> Vec<String> {
    let repo = git2::Repository::open(path).unwrap();
    let commit = repo
        .find_reference(&format!("refs/heads/{}", branch))
        .unwrap()
        .peel_to_commit()
        .unwrap();
    let tree = commit.tree().unwrap();
    let mut names: Vec<String> = tree
        .iter()
        .filter_map(|e| e.name().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Contents of `file` at the tip of `refs/heads/{branch}`.
pub fn branch_file_contents(path: &Path, branch: &str, file: &str) -> String {
    let repo = git2::Repository::open(path).unwrap();
    let commit = repo
        .find_reference(&format!("refs/heads/{}", branch))
        .unwrap()
        .peel_to_commit()
        .unwrap();
    let entry = commit.tree().unwrap().get_path(Path::new(file)).unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    String::from_utf8_lossy(blob.content()).into_owned()
}
