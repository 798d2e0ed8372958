use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use dreamlock_core::DependencyGraph;
use dreamlock_schema::{validate_lock_value, DreamLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CheckReport {
    path: String,
    main_package: String,
    sources: usize,
    dependency_edges: usize,
    cyclic_entries: usize,
    canonical: bool,
    acyclic: bool,
    combined_hash: Option<String>,
}

pub fn run(path: &Path, json: bool) -> Result<u8, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("lock error: cannot read {}: {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("lock error: invalid JSON in {}: {e}", path.display()))?;
    validate_lock_value(&value).map_err(|e| format!("lock schema validation failed: {e}"))?;
    let lock: DreamLock =
        serde_json::from_value(value).map_err(|e| format!("lock error: {e}"))?;

    let canonical = lock
        .to_canonical_string()
        .map_err(|e| format!("lock error: {e}"))?
        == text;
    let graph = DependencyGraph::from_dependency_map(&lock.dependencies);

    let report = CheckReport {
        path: path.display().to_string(),
        main_package: lock.main_key().to_string(),
        sources: lock.sources.values().map(BTreeMap::len).sum(),
        dependency_edges: graph.edge_count(),
        cyclic_entries: lock
            .cyclic_dependencies
            .values()
            .flat_map(|v| v.values())
            .map(Vec::len)
            .sum(),
        canonical,
        acyclic: graph.is_acyclic(),
        combined_hash: lock.generic.sources_combined_hash.clone(),
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("{}: {}", report.path, report.main_package);
        println!("  sources:        {}", report.sources);
        println!("  dependencies:   {}", report.dependency_edges);
        println!("  cyclic entries: {}", report.cyclic_entries);
        if let Some(ref hash) = report.combined_hash {
            println!("  combined hash:  {hash}");
        }
        println!(
            "  canonical:      {}",
            if report.canonical { "yes" } else { "no" }
        );
        println!(
            "  acyclic:        {}",
            if report.acyclic { "yes" } else { "no" }
        );
    }

    Ok(if report.acyclic {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
