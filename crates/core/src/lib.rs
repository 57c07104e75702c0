//! ghsync core library.
//!
//! This crate provides the building blocks for publishing a local directory
//! to GitHub and keeping it in sync: configuration, credential storage, the
//! GitHub REST client, the git2-backed local repository client, license
//! templates, and the sync engine that drives the create and update workflows.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod git;
pub mod license;
pub mod models;
pub mod sync_engine;

// Re-exports for convenience.
pub use config::AppConfig;
pub use credentials::CredentialStore;
pub use errors::{FailureKind, SyncError};
pub use models::{Credentials, RemotePolicy, RepositoryTarget, Visibility};
pub use sync_engine::{SyncEngine, SyncResult, SyncState};
