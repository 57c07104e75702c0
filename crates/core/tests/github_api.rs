//! GitHub REST client and `ensure_remote` against the fake API.

mod common;

use common::{bad_credentials, good_credentials, FakeGitHub, USERNAME};
use ghsync_core::errors::{FailureKind, GitHubError, SyncError};
use ghsync_core::models::{RemotePolicy, RepositoryTarget, Visibility};

#[tokio::test(flavor = "multi_thread")]
async fn test_authenticated_user() {
    let server = FakeGitHub::start().await;
    let user = server
        .client()
        .get_authenticated_user(&good_credentials())
        .await
        .unwrap();
    assert_eq!(user.login, USERNAME);
    assert_eq!(user.name.as_deref(), Some("Alice Example"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_token_is_authentication_failure() {
    let server = FakeGitHub::start().await;
    let err = server
        .client()
        .get_authenticated_user(&bad_credentials())
        .await
        .unwrap_err();
    match &err {
        GitHubError::AuthenticationFailed(msg) => assert_eq!(msg, "Bad credentials"),
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
    assert_eq!(err.kind(), FailureKind::Auth);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_repo_is_none() {
    let server = FakeGitHub::start().await;
    let repo = server
        .client()
        .get_repo(&good_credentials(), USERNAME, "nope")
        .await
        .unwrap();
    assert!(repo.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_then_get_repo() {
    let server = FakeGitHub::start().await;
    let client = server.client();
    let creds = good_credentials();
    let target = RepositoryTarget::new(USERNAME, "demo")
        .with_description("A demo")
        .with_visibility(Visibility::Private);

    let created = client.create_repo(&creds, &target).await.unwrap();
    assert_eq!(created.html_url, "https://github.test/alice/demo");
    assert!(created.private);
    assert_eq!(server.is_private(USERNAME, "demo"), Some(true));

    let fetched = client
        .get_repo(&creds, USERNAME, "demo")
        .await
        .unwrap()
        .expect("repo should exist after create");
    assert_eq!(fetched.full_name, "alice/demo");
    assert_eq!(fetched.description.as_deref(), Some("A demo"));
    assert_eq!(fetched.license.unwrap().spdx_id.as_deref(), Some("MIT"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_duplicate_is_conflict() {
    let server = FakeGitHub::start().await;
    server.seed_repo(USERNAME, "taken");
    let err = server
        .client()
        .create_repo(&good_credentials(), &RepositoryTarget::new(USERNAME, "taken"))
        .await
        .unwrap_err();
    assert!(matches!(err, GitHubError::Conflict { ref repo } if repo == "alice/taken"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_validation_error_keeps_message() {
    let server = FakeGitHub::start().await;
    let err = server
        .client()
        .create_repo(&good_credentials(), &RepositoryTarget::new(USERNAME, ""))
        .await
        .unwrap_err();
    match err {
        GitHubError::ApiError { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Validation Failed");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_without_html_url_is_unexpected() {
    let server = FakeGitHub::start().await;
    server.omit_html_url_on_create();
    let err = server
        .client()
        .create_repo(&good_credentials(), &RepositoryTarget::new(USERNAME, "demo"))
        .await
        .unwrap_err();
    assert!(matches!(err, GitHubError::UnexpectedResponse(_)));
    assert_eq!(err.kind(), FailureKind::Api);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_org_repo_uses_org_endpoint() {
    let server = FakeGitHub::start().await;
    let created = server
        .client()
        .create_repo(&good_credentials(), &RepositoryTarget::new("acme", "widgets"))
        .await
        .unwrap();
    assert_eq!(created.full_name, "acme/widgets");
    assert!(server.bare_path("acme", "widgets").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_issues_filters_pull_requests() {
    let server = FakeGitHub::start().await;
    server.seed_repo(USERNAME, "demo");
    let client = server.client();
    let creds = good_credentials();

    let open = client
        .list_issues(&creds, USERNAME, "demo", "open", 30)
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].number, 1);
    assert_eq!(open[0].user.as_ref().unwrap().login, "bob");

    let all = client
        .list_issues(&creds, USERNAME, "demo", "all", 30)
        .await
        .unwrap();
    let numbers: Vec<u64> = all.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![1, 3]);

    let limited = client
        .list_issues(&creds, USERNAME, "demo", "all", 1)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_issues_missing_repo() {
    let server = FakeGitHub::start().await;
    let err = server
        .client()
        .list_issues(&good_credentials(), USERNAME, "ghost", "open", 30)
        .await
        .unwrap_err();
    assert!(matches!(err, GitHubError::RepositoryNotFound(_)));
}

// ===========================================================================
// ensure_remote policies
// ===========================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_remote_create_if_missing_is_idempotent() {
    let server = FakeGitHub::start().await;
    let engine = server.engine();
    let creds = good_credentials();
    let target = RepositoryTarget::new(USERNAME, "demo");

    let first = engine
        .ensure_remote(&target, &creds, RemotePolicy::CreateIfMissing)
        .await
        .unwrap();
    assert!(!first.existed);
    assert_eq!(first.html_url, "https://github.test/alice/demo");
    assert!(!first.clone_url.is_empty());

    let second = engine
        .ensure_remote(&target, &creds, RemotePolicy::CreateIfMissing)
        .await
        .unwrap();
    assert!(second.existed);
    assert_eq!(second.html_url, first.html_url);
    assert_eq!(server.create_calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_remote_create_new_conflicts_on_existing() {
    let server = FakeGitHub::start().await;
    server.seed_repo(USERNAME, "demo");
    let err = server
        .engine()
        .ensure_remote(
            &RepositoryTarget::new(USERNAME, "demo"),
            &good_credentials(),
            RemotePolicy::CreateNew,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Conflict);
    assert_eq!(server.create_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_remote_must_exist() {
    let server = FakeGitHub::start().await;
    let err = server
        .engine()
        .ensure_remote(
            &RepositoryTarget::new(USERNAME, "missing"),
            &good_credentials(),
            RemotePolicy::MustExist,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::GitHub(GitHubError::RepositoryNotFound(_))
    ));
    assert_eq!(server.create_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_remote_unauthorized() {
    let server = FakeGitHub::start().await;
    let err = server
        .engine()
        .ensure_remote(
            &RepositoryTarget::new(USERNAME, "demo"),
            &bad_credentials(),
            RemotePolicy::CreateNew,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Auth);
}
