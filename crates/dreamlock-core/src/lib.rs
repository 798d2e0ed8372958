//! Lock reconciliation engine for dreamlock.
//!
//! This crate turns raw translator output into a canonical `DreamLock`: it
//! builds the dependency graph, deterministically breaks cycles while keeping
//! a ledger of every removed edge, merges the main package source and
//! provenance, optionally obtains a combined source hash from an oracle, and
//! validates the result. The `Packager` drives a whole invocation on top of
//! that: output planning, source resolution, translator selection, extra
//! argument resolution, translator execution, and atomic writes.

pub mod args;
pub mod combined;
pub mod cycles;
pub mod graph;
pub mod merge;
pub mod output;
pub mod packager;
pub mod prompt;
pub mod reconcile;
pub mod selection;
pub mod source;

pub use args::{parse_arg_assignments, resolve_extra_args};
pub use combined::apply_combined_hash;
pub use cycles::{find_cycle, resolve_cycles, CycleReport};
pub use graph::DependencyGraph;
pub use merge::{merge_main_source, stamp_provenance, translator_params};
pub use output::{plan_output, OutputPlan, BUILD_TEMPLATE_FILE_NAME};
pub use packager::{PackageReport, PackageRequest, Packager};
pub use prompt::ArgumentPrompter;
pub use reconcile::{ReconcileInput, Reconciler, Reconciliation};
pub use selection::{select_translator, sort_candidates};
pub use source::{classify_source, resolve_source, ResolvedSource, SourceReference};

use dreamlock_schema::{LockError, RawLockError, SchemaError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("output directory {} already contains {}. Delete first, or use '--force'.", .dir.display(), .files.join(", "))]
    OutputConflict { dir: PathBuf, files: Vec<String> },
    #[error("source not found: {0}")]
    SourceNotFound(String),
    #[error("could not find translator '{requested}'; available: {}", .candidates.join(", "))]
    TranslatorNotFound {
        requested: String,
        candidates: Vec<String>,
    },
    #[error("translator selection is ambiguous; candidates: {}", .candidates.join(", "))]
    AmbiguousTranslatorSelection { candidates: Vec<String> },
    #[error("invalid extra argument '{key}': {reason}")]
    InvalidExtraArgument { key: String, reason: String },
    #[error("translator '{translator}' requires arguments: {}", .missing.join(", "))]
    MissingRequiredArgument {
        translator: String,
        missing: Vec<String>,
    },
    #[error("translator execution failed: {0}")]
    TranslatorExecutionFailed(String),
    #[error("combined hash oracle failed: {diagnostics}")]
    CombinedHashOracleFailed { diagnostics: String },
    #[error("lock schema validation failed: {0}")]
    SchemaValidationFailed(SchemaError),
    #[error("prompt failed: {0}")]
    Prompt(String),
    #[error("translator output error: {0}")]
    RawLock(#[from] RawLockError),
    #[error("lock error: {0}")]
    Lock(LockError),
    #[error("runtime error: {0}")]
    Runtime(#[from] dreamlock_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<LockError> for CoreError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Schema(schema) => CoreError::SchemaValidationFailed(schema),
            other => CoreError::Lock(other),
        }
    }
}

impl From<SchemaError> for CoreError {
    fn from(e: SchemaError) -> Self {
        CoreError::SchemaValidationFailed(e)
    }
}
