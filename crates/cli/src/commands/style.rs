//! Shared styling utilities for terminal output.

use console::Style;

use ghsync_core::errors::FailureKind;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Cyan, underlined URL.
pub fn url(url: &str) -> String {
    let style = Style::new().cyan().underlined();
    style.apply_to(url).to_string()
}

/// Short human label for a failure category.
pub fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Auth => "authentication failed",
        FailureKind::Conflict => "name conflict",
        FailureKind::Api => "GitHub API error",
        FailureKind::NotARepository => "not a git repository",
        FailureKind::Push => "push failed",
        FailureKind::UnsupportedLicense => "unsupported license",
        FailureKind::Local => "local error",
    }
}
