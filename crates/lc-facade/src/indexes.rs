//! Local filesystem loading of scene text and project index files
//! (SPEC_FULL §4.10, §6's on-disk project layout).
//!
//! Grounded on `original_source/lit_platform/facade.py`'s
//! `load_scene_text` / `load_indexes_from_project`.

use std::path::Path;

use lc_domain::error::{Error, Result};
use lc_domain::prompt::{Indexes, INDEX_FILES};

/// Reads one scene file. The platform owns all scene-file I/O; neither the
/// pipeline nor the core ever touches a path.
pub fn load_scene_text(scene_path: &Path) -> Result<String> {
    std::fs::read_to_string(scene_path).map_err(Error::Io)
}

/// Reads the six well-known index files under `project_path`, skipping any
/// that don't exist. Missing indexes mean the author hasn't populated that
/// area yet, not an error.
pub fn load_indexes_from_project(project_path: &Path) -> Indexes {
    let mut indexes = Indexes::new();
    for name in INDEX_FILES {
        let path = project_path.join(format!("{name}.md"));
        if let Ok(body) = std::fs::read_to_string(&path) {
            indexes.insert(name.to_string(), body);
        }
    }
    indexes
}

/// Reads `LEARNING.md` if present, for the one-time import on a project's
/// first session (§4.6).
pub fn load_legacy_learning_markdown(project_path: &Path) -> Option<String> {
    std::fs::read_to_string(project_path.join("LEARNING.md")).ok()
}

/// Combined content hash of every index file present, used to detect when
/// an author edits an index mid-session (§4.6's index-context staleness
/// tracking). `None` when no index files exist yet.
pub fn index_content_hash(indexes: &Indexes) -> Option<String> {
    if indexes.is_empty() {
        return None;
    }
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for name in INDEX_FILES {
        if let Some(body) = indexes.get(name) {
            hasher.update(name.as_bytes());
            hasher.update(body.as_bytes());
        }
    }
    Some(format!("{:x}", hasher.finalize())[..16].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_files_are_skipped_not_errored() {
        let dir = tempfile::tempdir().unwrap();
        let indexes = load_indexes_from_project(dir.path());
        assert!(indexes.is_empty());
    }

    #[test]
    fn present_index_files_are_loaded_by_canonical_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CANON.md"), "the lantern was broken").unwrap();
        let indexes = load_indexes_from_project(dir.path());
        assert_eq!(indexes.get("CANON").unwrap(), "the lantern was broken");
        assert!(!indexes.contains_key("CAST"));
    }

    #[test]
    fn index_hash_is_stable_across_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CANON.md"), "a").unwrap();
        std::fs::write(dir.path().join("CAST.md"), "b").unwrap();
        let indexes = load_indexes_from_project(dir.path());
        let h1 = index_content_hash(&indexes);
        let mut reordered = Indexes::new();
        reordered.insert("CAST".to_string(), "b".to_string());
        reordered.insert("CANON".to_string(), "a".to_string());
        let h2 = index_content_hash(&reordered);
        assert_eq!(h1, h2);
    }
}
