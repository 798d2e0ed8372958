//! The reconciliation pipeline: raw translator output in, canonical lock out.

use crate::combined::apply_combined_hash;
use crate::cycles::resolve_cycles;
use crate::graph::DependencyGraph;
use crate::merge::{merge_main_source, stamp_provenance};
use crate::CoreError;
use dreamlock_runtime::{ExtraArgValue, HashOracle};
use dreamlock_schema::{write_atomic, DependencyEdge, DreamLock, RawLock, SourceSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything one reconciliation needs besides the oracle.
#[derive(Debug, Clone)]
pub struct ReconcileInput {
    pub raw: RawLock,
    /// Source of the main package; `None` records the `unknown` placeholder.
    pub main_source: Option<SourceSpec>,
    /// Fully-qualified translator identity.
    pub translator: String,
    pub extra_args: BTreeMap<String, ExtraArgValue>,
    pub combined: bool,
}

/// A validated lock and what it took to produce it.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub lock: DreamLock,
    /// Canonical text of `lock`, already validated.
    pub text: String,
    pub removed: Vec<DependencyEdge>,
    pub combined_hash: Option<String>,
}

impl Reconciliation {
    /// Atomically write the canonical text to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        write_atomic(path, self.text.as_bytes())?;
        info!("wrote {}", path.display());
        Ok(())
    }
}

/// Runs the stages in order, each completing before the next starts:
/// graph, cycles, merge, combined hash, canonical validation.
pub struct Reconciler<'a, O: HashOracle + ?Sized> {
    oracle: &'a O,
    work_dir: PathBuf,
}

impl<'a, O: HashOracle + ?Sized> Reconciler<'a, O> {
    /// `work_dir` holds the temporary stripped lock in combined mode; it
    /// should be the output directory.
    pub fn new(oracle: &'a O, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            oracle,
            work_dir: work_dir.into(),
        }
    }

    pub fn reconcile(&self, input: ReconcileInput) -> Result<Reconciliation, CoreError> {
        let (mut lock, raw_dependencies) = input.raw.into_parts();
        info!("reconciling {}", lock.main_key());

        let mut graph = DependencyGraph::from_raw(&raw_dependencies);
        let report = resolve_cycles(&mut graph);
        lock.dependencies = graph.to_dependency_map();
        lock.cyclic_dependencies.clear();
        report.record_into(&mut lock);
        if !report.is_empty() {
            info!("removed {} cyclic dependencies", report.removed.len());
        }

        merge_main_source(&mut lock, input.main_source);
        stamp_provenance(&mut lock, &input.translator, input.combined, &input.extra_args);

        let combined_hash = if input.combined {
            Some(apply_combined_hash(&mut lock, &self.work_dir, self.oracle)?)
        } else {
            None
        };

        let text = lock.to_canonical_string()?;
        debug!("canonical lock: {} bytes", text.len());
        Ok(Reconciliation {
            lock,
            text,
            removed: report.removed,
            combined_hash,
        })
    }
}
