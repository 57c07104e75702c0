//! Git operations for ghsync: the local repository client and the GitHub API.

pub mod client;
pub mod github;
pub mod remote_url;

pub use client::GitClient;
pub use github::GitHubClient;
