//! Lock document model, translator output ingestion, and canonical form for dreamlock.
//!
//! This crate defines the schema layer: package identifiers (`PackageName`,
//! `PackageVersion`, `NodeKey`), source descriptors (`SourceSpec`), the
//! `DreamLock` aggregate, ingestion of raw translator output (`RawLock`),
//! deterministic JSON rendering (`to_canonical_json`), structural validation
//! (`validate_lock_value`), and atomic lock file writes.

pub mod canonical;
pub mod lock;
pub mod raw;
pub mod source;
pub mod types;
pub mod validate;

pub use canonical::to_canonical_json;
pub use lock::{
    write_atomic, CyclicDependencyMap, DependencyMap, DreamLock, GenericMetadata, LockError,
    SourceMap, LOCK_FILE_NAME,
};
pub use raw::{RawDependencyMap, RawLock, RawLockError};
pub use source::{SourceSpec, UNKNOWN_SOURCE_TYPE};
pub use types::{DependencyEdge, NodeKey, PackageName, PackageVersion};
pub use validate::{validate_lock_value, SchemaError};
