use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fetch type recorded for a main package whose source could not be resolved.
pub const UNKNOWN_SOURCE_TYPE: &str = "unknown";

/// How to obtain the source of one package version.
///
/// Only `type` and `hash` are interpreted; every other field the fetcher or
/// translator emitted (`url`, `rev`, `path`, ...) is carried verbatim.
/// A `"hash": null` reads as no hash and is written without the key, since
/// the lock schema only admits a string hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub fetch_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl SourceSpec {
    pub fn new(fetch_type: impl Into<String>) -> Self {
        Self {
            fetch_type: fetch_type.into(),
            hash: None,
            fields: BTreeMap::new(),
        }
    }

    /// The sentinel spec for a main package without fetch information.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_SOURCE_TYPE)
    }

    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.fetch_type == UNKNOWN_SOURCE_TYPE
    }

    /// Replace a present hash with the empty placeholder.
    ///
    /// Sources that never carried a hash (local paths, the unknown sentinel)
    /// are left without one.
    pub fn strip_hash(&mut self) {
        if self.hash.is_some() {
            self.hash = Some(String::new());
        }
    }
}
