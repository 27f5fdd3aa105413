//! Repository path preflight (SPEC_FULL §4.10, §7's `RepoPreflightError`).
//!
//! Grounded on `original_source/lit_platform/repo_preflight.py`'s
//! `validate_repo_path`: same five reason codes, same order of checks.

use std::path::{Path, PathBuf};

use lc_domain::error::{Error, Result};

/// Sentinel file marking a directory as a lit-critic project root. An
/// implementation constant, not user-configurable (§4.10).
pub const MARKER_FILENAME: &str = "lit-critic.toml";

fn preflight_error(reason_code: &'static str, message: impl Into<String>) -> Error {
    Error::RepoPreflight { reason_code, message: message.into() }
}

/// Validates a candidate repository path against the canonical rule set,
/// returning the canonicalized path on success.
pub fn validate_repo_path(raw_path: &str) -> Result<PathBuf> {
    let candidate = raw_path.trim();
    if candidate.is_empty() {
        return Err(preflight_error("empty", "Repository path is empty."));
    }

    let expanded = expand_home(candidate);
    let normalized = std::fs::canonicalize(&expanded).map_err(|_| {
        preflight_error(
            "not_found",
            format!(
                "Repository path was not found: {}. Choose a directory containing {MARKER_FILENAME}.",
                expanded.display()
            ),
        )
    })?;

    if !normalized.is_dir() {
        return Err(preflight_error(
            "not_directory",
            format!("Repository path is not a directory: {}.", normalized.display()),
        ));
    }

    let marker_path = normalized.join(MARKER_FILENAME);
    if !marker_path.exists() {
        return Err(preflight_error(
            "missing_marker",
            format!("Repository directory does not contain {MARKER_FILENAME}: {}.", normalized.display()),
        ));
    }

    Ok(normalized)
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        let err = validate_repo_path("   ").unwrap_err();
        assert!(matches!(err, Error::RepoPreflight { reason_code: "empty", .. }));
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = validate_repo_path(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::RepoPreflight { reason_code: "not_found", .. }));
    }

    #[test]
    fn file_path_is_not_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        std::fs::write(&file_path, "x").unwrap();
        let err = validate_repo_path(file_path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::RepoPreflight { reason_code: "not_directory", .. }));
    }

    #[test]
    fn directory_without_marker_is_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_repo_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::RepoPreflight { reason_code: "missing_marker", .. }));
    }

    #[test]
    fn directory_with_marker_validates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MARKER_FILENAME), "").unwrap();
        let result = validate_repo_path(dir.path().to_str().unwrap());
        assert!(result.is_ok());
    }
}
