//! Git host URL derivation.
//!
//! The API host and the git host differ on GitHub (`api.github.com` vs
//! `github.com`) and on GitHub Enterprise (`<host>/api/v3` vs `<host>`).
//! These helpers turn the configured API URL into clone URLs.

/// Browser/git base URL for the host behind `api_url`.
///
/// Resolution order:
/// 1. a non-blank `git_base_url` override, without trailing slash;
/// 2. `https://api.github.com` → `https://github.com`;
/// 3. `https://<host>/api/v3` → `https://<host>`;
/// 4. `api_url` itself, without trailing slash.
pub fn derive_git_base_url(api_url: &str, git_base_url: Option<&str>) -> String {
    if let Some(explicit) = git_base_url.map(str::trim).filter(|s| !s.is_empty()) {
        return explicit.trim_end_matches('/').to_string();
    }

    let url = api_url.trim().trim_end_matches('/');
    if url.eq_ignore_ascii_case("https://api.github.com") {
        return "https://github.com".to_string();
    }
    match url.strip_suffix("/api/v3") {
        Some(base) => base.to_string(),
        None => url.to_string(),
    }
}

/// `{base}/{owner/name}.git`
pub fn derive_git_remote_url(api_url: &str, git_base_url: Option<&str>, full_name: &str) -> String {
    format!("{}/{}.git", derive_git_base_url(api_url, git_base_url), full_name)
}
