//! GitHub REST API client.
//!
//! Credentials are passed into every call; the client itself holds only the
//! HTTP connection pool and the API base URL.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::errors::GitHubError;
use crate::models::{Credentials, GitHubUser, Issue, RepoDetails, RepositoryTarget};

/// Error body returned by the API, e.g.
/// `{"message": "Validation Failed", "errors": [{"message": "name already exists on this account"}]}`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl ApiErrorBody {
    fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// Top-level message followed by detail messages.
    fn describe(&self, status: StatusCode) -> String {
        let mut parts: Vec<String> = self.message.iter().cloned().collect();
        parts.extend(self.errors.iter().filter_map(|e| e.message.clone()));
        if parts.is_empty() {
            format!("HTTP {}", status)
        } else {
            parts.join(": ")
        }
    }

    fn reports_existing_name(&self) -> bool {
        self.errors.iter().any(|e| {
            e.code.as_deref() == Some("already_exists")
                || e.message
                    .as_deref()
                    .is_some_and(|m| m.contains("already exists"))
        })
    }
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghsync/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        debug!(api_url = %api_url, "created GitHubClient");
        Ok(Self { http, api_url })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `GET /user`: verify credentials and return the account they belong to.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn get_authenticated_user(
        &self,
        credentials: &Credentials,
    ) -> Result<GitHubUser, GitHubError> {
        let url = format!("{}/user", self.api_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&credentials.token)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let user: GitHubUser = resp.json().await?;
        debug!(login = %user.login, "fetched authenticated user");
        Ok(user)
    }

    /// `GET /repos/{owner}/{name}`: `Ok(None)` on 404.
    #[instrument(skip(self, credentials))]
    pub async fn get_repo(
        &self,
        credentials: &Credentials,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepoDetails>, GitHubError> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, name);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&credentials.token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(owner, name, "repository not found");
            return Ok(None);
        }
        let resp = check_response(resp).await?;
        let details: RepoDetails = resp.json().await?;
        debug!(full_name = %details.full_name, "fetched repository");
        Ok(Some(details))
    }

    /// Create a repository for `target`.
    ///
    /// Uses `POST /user/repos` when the target is owned by the authenticated
    /// user and `POST /orgs/{owner}/repos` otherwise. Expects `201 Created`
    /// with an `html_url`; a success response without it is an
    /// [`GitHubError::UnexpectedResponse`].
    #[instrument(skip(self, credentials, target), fields(repo = %target.full_name()))]
    pub async fn create_repo(
        &self,
        credentials: &Credentials,
        target: &RepositoryTarget,
    ) -> Result<RepoDetails, GitHubError> {
        let url = if target.owner.eq_ignore_ascii_case(&credentials.username) {
            format!("{}/user/repos", self.api_url)
        } else {
            format!("{}/orgs/{}/repos", self.api_url, target.owner)
        };
        let payload = serde_json::json!({
            "name": target.name,
            "description": target.description,
            "private": target.visibility.is_private(),
            "auto_init": false,
        });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&credentials.token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let raw = resp.text().await.unwrap_or_default();
            let body = ApiErrorBody::parse(&raw);
            if body.reports_existing_name() {
                return Err(GitHubError::Conflict {
                    repo: target.full_name(),
                });
            }
            return Err(GitHubError::ApiError {
                status: status.as_u16(),
                message: body.describe(status),
            });
        }
        let resp = check_response(resp).await?;
        if status != StatusCode::CREATED {
            warn!(status = %status, "repository create returned a non-201 success status");
        }

        let value: serde_json::Value = resp.json().await?;
        if value.get("html_url").and_then(|v| v.as_str()).is_none() {
            return Err(GitHubError::UnexpectedResponse(
                "create response has no 'html_url'".into(),
            ));
        }
        let details: RepoDetails = serde_json::from_value(value)
            .map_err(|e| GitHubError::UnexpectedResponse(e.to_string()))?;
        info!(html_url = %details.html_url, private = details.private, "created repository");
        Ok(details)
    }

    /// `GET /repos/{owner}/{name}/issues`, pull requests excluded.
    #[instrument(skip(self, credentials))]
    pub async fn list_issues(
        &self,
        credentials: &Credentials,
        owner: &str,
        name: &str,
        state: &str,
        limit: u32,
    ) -> Result<Vec<Issue>, GitHubError> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, owner, name);
        let per_page = limit.clamp(1, 100).to_string();
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&credentials.token)
            .query(&[("state", state), ("per_page", per_page.as_str())])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GitHubError::RepositoryNotFound(format!("{}/{}", owner, name)));
        }
        let resp = check_response(resp).await?;
        let issues: Vec<Issue> = resp.json().await?;
        let issues: Vec<Issue> = issues
            .into_iter()
            .filter(|i| !i.is_pull_request())
            .take(limit as usize)
            .collect();
        debug!(count = issues.len(), "fetched issues");
        Ok(issues)
    }
}

/// Map a non-success response to a typed error, keeping the provider's
/// message when the body is structured.
async fn check_response(resp: Response) -> Result<Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let raw = resp.text().await.unwrap_or_default();
    let message = ApiErrorBody::parse(&raw).describe(status);
    if status == StatusCode::UNAUTHORIZED {
        return Err(GitHubError::AuthenticationFailed(message));
    }
    warn!(status = status.as_u16(), %message, "GitHub API request failed");
    Err(GitHubError::ApiError {
        status: status.as_u16(),
        message,
    })
}
