//! Single aggregate hash over all locked sources.

use crate::CoreError;
use dreamlock_runtime::HashOracle;
use dreamlock_schema::DreamLock;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Strip every per-source hash, ask `oracle` for the combined hash of what
/// remains, and record it in `_generic.sourcesCombinedHash`.
///
/// The stripped lock is persisted to a temp file inside `work_dir` for the
/// oracle to read; the file is gone once this returns. On failure the lock
/// is left stripped and must not be written.
pub fn apply_combined_hash<O: HashOracle + ?Sized>(
    lock: &mut DreamLock,
    work_dir: &Path,
    oracle: &O,
) -> Result<String, CoreError> {
    lock.strip_hashes();
    lock.generic.sources_combined_hash = Some(String::new());

    let text = lock.to_canonical_string()?;
    let mut stripped = tempfile::Builder::new()
        .prefix(".dream-lock-stripped-")
        .suffix(".json")
        .tempfile_in(work_dir)?;
    stripped.write_all(text.as_bytes())?;
    stripped.as_file().sync_all()?;
    debug!("stripped lock persisted at {}", stripped.path().display());

    let hash = oracle
        .combined_hash(stripped.path(), lock)
        .map_err(|e| CoreError::CombinedHashOracleFailed {
            diagnostics: e.to_string(),
        })?;
    if hash.is_empty() {
        return Err(CoreError::CombinedHashOracleFailed {
            diagnostics: "oracle returned an empty hash".to_owned(),
        });
    }
    info!("combined source hash: {hash}");
    lock.generic.sources_combined_hash = Some(hash.clone());
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamlock_runtime::RuntimeError;
    use dreamlock_schema::{GenericMetadata, NodeKey, SourceSpec};
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct FixedOracle {
        answer: Result<String, (String, String)>,
        seen: RefCell<Option<(PathBuf, String)>>,
    }

    impl FixedOracle {
        fn ok(hash: &str) -> Self {
            Self {
                answer: Ok(hash.to_owned()),
                seen: RefCell::new(None),
            }
        }

        fn failing(stdout: &str, stderr: &str) -> Self {
            Self {
                answer: Err((stdout.to_owned(), stderr.to_owned())),
                seen: RefCell::new(None),
            }
        }
    }

    impl HashOracle for FixedOracle {
        fn combined_hash(&self, lock_path: &Path, _stripped: &DreamLock) -> Result<String, RuntimeError> {
            let content = std::fs::read_to_string(lock_path)?;
            *self.seen.borrow_mut() = Some((lock_path.to_path_buf(), content));
            match &self.answer {
                Ok(h) => Ok(h.clone()),
                Err((stdout, stderr)) => Err(RuntimeError::HashMarkerMissing {
                    stdout: stdout.clone(),
                    stderr: stderr.clone(),
                }),
            }
        }
    }

    fn lock_with_hashes() -> DreamLock {
        let mut lock = DreamLock::new(GenericMetadata::new("app", "1"));
        lock.set_source(
            &NodeKey::new("app", "1"),
            SourceSpec::new("github").with_hash("sha256-main"),
        );
        lock.set_source(
            &NodeKey::new("dep", "2"),
            SourceSpec::new("http").with_hash("sha256-dep"),
        );
        lock
    }

    #[test]
    fn oracle_sees_stripped_lock() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = lock_with_hashes();
        let oracle = FixedOracle::ok("sha256-combined=");
        apply_combined_hash(&mut lock, dir.path(), &oracle).unwrap();

        let (path, content) = oracle.seen.borrow().clone().unwrap();
        assert!(path.starts_with(dir.path()));
        let persisted = DreamLock::from_json_str(&content).unwrap();
        assert_eq!(persisted.generic.sources_combined_hash.as_deref(), Some(""));
        for spec in persisted.sources.values().flat_map(|v| v.values()) {
            assert_eq!(spec.hash.as_deref(), Some(""));
        }
        assert!(!path.exists(), "stripped temp lock must be cleaned up");
    }

    #[test]
    fn success_sets_combined_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = lock_with_hashes();
        let hash = apply_combined_hash(&mut lock, dir.path(), &FixedOracle::ok("sha256-xyz=")).unwrap();
        assert_eq!(hash, "sha256-xyz=");
        assert_eq!(lock.generic.sources_combined_hash.as_deref(), Some("sha256-xyz="));
        assert_eq!(
            lock.source(&NodeKey::new("dep", "2")).unwrap().hash.as_deref(),
            Some("")
        );
    }

    #[test]
    fn missing_marker_surfaces_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = lock_with_hashes();
        let oracle = FixedOracle::failing("out-text", "error: builder failed");
        let err = apply_combined_hash(&mut lock, dir.path(), &oracle).unwrap_err();
        let CoreError::CombinedHashOracleFailed { diagnostics } = err else {
            panic!("expected CombinedHashOracleFailed");
        };
        assert!(diagnostics.contains("error: builder failed"));
        assert!(diagnostics.contains("out-text"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_hash_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = lock_with_hashes();
        let err = apply_combined_hash(&mut lock, dir.path(), &FixedOracle::ok("")).unwrap_err();
        assert!(matches!(err, CoreError::CombinedHashOracleFailed { .. }));
    }
}
