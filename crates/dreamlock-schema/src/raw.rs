//! Ingestion of translator output.
//!
//! Translators write a lock-shaped JSON document whose dependency lists may
//! be empty, may contain duplicates, and may live under `_generic` instead of
//! at the top level. `RawLock` accepts all of those shapes and hands the
//! dependency lists over untouched; pruning happens in the graph builder.

use crate::lock::{DreamLock, GenericMetadata, SourceMap};
use crate::types::{NodeKey, PackageName, PackageVersion};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Dependency lists exactly as the translator declared them.
pub type RawDependencyMap = BTreeMap<PackageName, BTreeMap<PackageVersion, Vec<NodeKey>>>;

#[derive(Debug, Error)]
pub enum RawLockError {
    #[error("failed to read translator output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse translator output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("translator output must be a JSON object")]
    NotAnObject,
    #[error("translator output is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid dependency entry for '{package}': {reason}")]
    InvalidDependency { package: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLock {
    pub generic: GenericMetadata,
    pub sources: SourceMap,
    pub dependencies: RawDependencyMap,
    pub extra: BTreeMap<String, Value>,
}

impl RawLock {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RawLockError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(input: &str) -> Result<Self, RawLockError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RawLockError> {
        let Value::Object(mut root) = value else {
            return Err(RawLockError::NotAnObject);
        };

        let Some(Value::Object(mut generic)) = root.remove("_generic") else {
            return Err(RawLockError::MissingField("_generic"));
        };
        if !generic.get("mainPackageName").is_some_and(Value::is_string) {
            return Err(RawLockError::MissingField("_generic.mainPackageName"));
        }
        if !generic.get("mainPackageVersion").is_some_and(Value::is_string) {
            return Err(RawLockError::MissingField("_generic.mainPackageVersion"));
        }

        let legacy_deps = generic.remove("dependencies");
        let generic: GenericMetadata = serde_json::from_value(Value::Object(generic))?;

        let sources: SourceMap = match root.remove("sources") {
            Some(v) => serde_json::from_value(v)?,
            None => {
                debug!("translator output has no 'sources'; starting empty");
                SourceMap::new()
            }
        };

        let mut dependencies = match root.remove("dependencies") {
            Some(v) => parse_dependency_map(v)?,
            None => RawDependencyMap::new(),
        };
        if let Some(legacy) = legacy_deps {
            debug!("merging dependencies found under '_generic'");
            for (name, versions) in parse_dependency_map(legacy)? {
                let slot = dependencies.entry(name).or_default();
                for (version, deps) in versions {
                    slot.entry(version).or_insert(deps);
                }
            }
        }

        if root.remove("cyclicDependencies").is_some() {
            warn!("discarding cyclicDependencies supplied by translator; ledger is rebuilt");
        }

        Ok(Self {
            generic,
            sources,
            dependencies,
            extra: root.into_iter().collect(),
        })
    }

    pub fn main_key(&self) -> NodeKey {
        self.generic.main_key()
    }

    /// Split into the lock skeleton (no dependency tables yet) and the raw
    /// dependency lists.
    pub fn into_parts(self) -> (DreamLock, RawDependencyMap) {
        let mut lock = DreamLock::new(self.generic);
        lock.sources = self.sources;
        lock.extra = self.extra;
        (lock, self.dependencies)
    }
}

fn parse_dependency_map(value: Value) -> Result<RawDependencyMap, RawLockError> {
    let Value::Object(names) = value else {
        return Err(RawLockError::InvalidDependency {
            package: "<root>".to_owned(),
            reason: "dependency table must be an object".to_owned(),
        });
    };
    let mut out = RawDependencyMap::new();
    for (name, versions) in names {
        out.insert(PackageName::new(name.clone()), parse_versions(&name, versions)?);
    }
    Ok(out)
}

fn parse_versions(
    name: &str,
    value: Value,
) -> Result<BTreeMap<PackageVersion, Vec<NodeKey>>, RawLockError> {
    let Value::Object(versions) = value else {
        return Err(invalid(name, "expected a version map"));
    };
    let mut out = BTreeMap::new();
    for (version, deps) in versions {
        out.insert(
            PackageVersion::new(version.clone()),
            parse_dep_list(&format!("{name}#{version}"), deps)?,
        );
    }
    Ok(out)
}

fn parse_dep_list(package: &str, value: Value) -> Result<Vec<NodeKey>, RawLockError> {
    let Value::Array(items) = value else {
        return Err(invalid(package, "expected a list of [name, version] pairs"));
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<NodeKey>(item.clone()).map_err(|_| {
                invalid(package, &format!("malformed dependency {item}"))
            })
        })
        .collect()
}

fn invalid(package: &str, reason: &str) -> RawLockError {
    RawLockError::InvalidDependency {
        package: package.to_owned(),
        reason: reason.to_owned(),
    }
}
