use crate::canonical::to_canonical_json;
use crate::source::SourceSpec;
use crate::types::{NodeKey, PackageName, PackageVersion};
use crate::validate::{validate_lock_value, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// File name of the lock document inside an output directory.
pub const LOCK_FILE_NAME: &str = "dream-lock.json";

pub type SourceMap = BTreeMap<PackageName, BTreeMap<PackageVersion, SourceSpec>>;
pub type DependencyMap = BTreeMap<PackageName, BTreeMap<PackageVersion, BTreeSet<NodeKey>>>;
pub type CyclicDependencyMap = BTreeMap<PackageName, BTreeMap<PackageVersion, Vec<NodeKey>>>;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("lock schema validation failed: {0}")]
    Schema(#[from] SchemaError),
}

/// Identity and provenance of a lock document (the `_generic` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenericMetadata {
    pub main_package_name: PackageName,
    pub main_package_version: PackageVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_combined_hash: Option<String>,
    /// Translator-specific keys (`subsystem`, `location`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GenericMetadata {
    pub fn new(name: impl Into<PackageName>, version: impl Into<PackageVersion>) -> Self {
        Self {
            main_package_name: name.into(),
            main_package_version: version.into(),
            translated_by: None,
            translator_params: None,
            sources_combined_hash: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn main_key(&self) -> NodeKey {
        NodeKey {
            name: self.main_package_name.clone(),
            version: self.main_package_version.clone(),
        }
    }
}

/// The canonical lock document.
///
/// Every table is a `BTreeMap`, so iterating the document in memory already
/// follows the sorted order the serialized form uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DreamLock {
    #[serde(rename = "_generic")]
    pub generic: GenericMetadata,
    #[serde(default)]
    pub sources: SourceMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: DependencyMap,
    #[serde(default, rename = "cyclicDependencies")]
    pub cyclic_dependencies: CyclicDependencyMap,
    /// Other top-level translator keys (`_subsystem`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DreamLock {
    pub fn new(generic: GenericMetadata) -> Self {
        Self {
            generic,
            sources: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            cyclic_dependencies: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn main_key(&self) -> NodeKey {
        self.generic.main_key()
    }

    pub fn source(&self, key: &NodeKey) -> Option<&SourceSpec> {
        self.sources.get(&key.name)?.get(&key.version)
    }

    /// Set the source for `key`, replacing whatever was recorded before.
    pub fn set_source(&mut self, key: &NodeKey, spec: SourceSpec) {
        self.sources
            .entry(key.name.clone())
            .or_default()
            .insert(key.version.clone(), spec);
    }

    /// Replace every per-source hash with the empty placeholder.
    pub fn strip_hashes(&mut self) {
        for spec in self.sources.values_mut().flat_map(BTreeMap::values_mut) {
            spec.strip_hash();
        }
    }

    /// Append `to` to the cyclic ledger of `from`.
    pub fn record_cyclic(&mut self, from: &NodeKey, to: NodeKey) {
        self.cyclic_dependencies
            .entry(from.name.clone())
            .or_default()
            .entry(from.version.clone())
            .or_default()
            .push(to);
    }

    /// Serialize, validate, and render the canonical text form.
    pub fn to_canonical_string(&self) -> Result<String, LockError> {
        let value = serde_json::to_value(self)?;
        validate_lock_value(&value)?;
        Ok(to_canonical_json(&value))
    }

    pub fn from_json_str(input: &str) -> Result<Self, LockError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Atomically write the canonical form to `path`.
    ///
    /// Content goes to a temp file in the same directory which is renamed over
    /// `path` only after it is fully written and synced. On failure the temp
    /// file is removed when dropped, so no partial lock is ever left behind.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.to_canonical_string()?;
        write_atomic(path, content.as_bytes())?;
        debug!("wrote lock file {}", path.display());
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Write `content` to `path` through a synced temp file and a rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    // Fsync parent directory to ensure rename durability on power loss.
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lock() -> DreamLock {
        let mut generic = GenericMetadata::new("app", "1.0.0");
        generic.extra.insert("subsystem".to_owned(), "nodejs".into());
        let mut lock = DreamLock::new(generic);
        lock.set_source(
            &NodeKey::new("left-pad", "1.3.0"),
            SourceSpec::new("fetchurl")
                .with_hash("sha256-abc")
                .with_field("url", "https://registry.example/left-pad-1.3.0.tgz"),
        );
        lock.set_source(&NodeKey::new("app", "1.0.0"), SourceSpec::unknown());
        lock.dependencies
            .entry(PackageName::new("app"))
            .or_default()
            .insert(
                PackageVersion::new("1.0.0"),
                BTreeSet::from([NodeKey::new("left-pad", "1.3.0")]),
            );
        lock
    }

    #[test]
    fn lock_roundtrip() {
        let lock = sample_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);

        lock.write_to_file(&path).unwrap();
        let loaded = DreamLock::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);
    }

    #[test]
    fn roundtrip_ignores_key_order_and_whitespace() {
        let input = r#"{"sources":{"app":{"1":{"type":"unknown"}}},
            "_generic":{"mainPackageVersion":"1","mainPackageName":"app"},
            "cyclicDependencies":{}}"#;
        let lock = DreamLock::from_json_str(input).unwrap();
        let text = lock.to_canonical_string().unwrap();
        assert_eq!(DreamLock::from_json_str(&text).unwrap(), lock);
    }

    #[test]
    fn canonical_text_is_deterministic() {
        let a = sample_lock().to_canonical_string().unwrap();
        let b = sample_lock().to_canonical_string().unwrap();
        assert_eq!(a, b);
        assert!(a.contains(r#"["left-pad", "1.3.0"]"#));
        assert!(a.ends_with('\n'));
    }

    #[test]
    fn unknown_generic_keys_preserved() {
        let lock = sample_lock();
        let text = lock.to_canonical_string().unwrap();
        assert!(text.contains("\"subsystem\": \"nodejs\""));
    }

    #[test]
    fn set_source_overwrites() {
        let mut lock = sample_lock();
        let key = NodeKey::new("app", "1.0.0");
        lock.set_source(&key, SourceSpec::new("path").with_field("path", "./."));
        assert_eq!(lock.source(&key).unwrap().fetch_type, "path");
        assert_eq!(lock.sources["app"].len(), 1);
    }

    #[test]
    fn strip_hashes_empties_every_hash() {
        let mut lock = sample_lock();
        lock.strip_hashes();
        for spec in lock.sources.values().flat_map(BTreeMap::values) {
            assert!(spec.hash.as_deref().map_or(true, str::is_empty));
        }
    }

    #[test]
    fn record_cyclic_appends_in_order() {
        let mut lock = sample_lock();
        let from = NodeKey::new("a", "1");
        lock.record_cyclic(&from, NodeKey::new("c", "1"));
        lock.record_cyclic(&from, NodeKey::new("b", "1"));
        assert_eq!(
            lock.cyclic_dependencies["a"]["1"],
            vec![NodeKey::new("c", "1"), NodeKey::new("b", "1")]
        );
    }

    #[test]
    fn empty_dependencies_not_serialized() {
        let mut lock = sample_lock();
        lock.dependencies.clear();
        let text = lock.to_canonical_string().unwrap();
        assert!(!text.contains("\"dependencies\""));
        assert!(text.contains("\"cyclicDependencies\": {}"));
    }

    #[test]
    fn write_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        let mut lock = sample_lock();
        lock.generic.main_package_name = PackageName::new("");
        assert!(matches!(
            lock.write_to_file(&path),
            Err(LockError::Schema(_))
        ));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
