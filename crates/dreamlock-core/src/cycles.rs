//! Deterministic cycle breaking.
//!
//! Nodes with outgoing edges are visited in `(name, version)` order. From each
//! one a depth-first search follows successors in order; when it reaches a
//! node already on the current path, the edge that closed the cycle is
//! removed. The search restarts from the same node until nothing cyclic is
//! reachable from it. Removing edges never creates a cycle, so once every node
//! has been processed the graph is acyclic.

use crate::graph::DependencyGraph;
use dreamlock_schema::{DependencyEdge, DreamLock, NodeKey};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Edges removed by one resolution pass, in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub removed: Vec<DependencyEdge>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    /// Append every removed edge to the lock's cyclic ledger.
    pub fn record_into(&self, lock: &mut DreamLock) {
        for edge in &self.removed {
            lock.record_cyclic(&edge.from, edge.to.clone());
        }
    }
}

/// First cycle reachable from `start`, as its list of edges.
///
/// The last edge is the one whose traversal closed the cycle.
pub fn find_cycle(graph: &DependencyGraph, start: &NodeKey) -> Option<Vec<DependencyEdge>> {
    let mut finished: BTreeSet<&NodeKey> = BTreeSet::new();
    let mut path: Vec<&NodeKey> = vec![start];
    let mut frames = vec![graph.successors(start)];

    while let Some(frame) = frames.last_mut() {
        let Some(next) = frame.next() else {
            frames.pop();
            if let Some(done) = path.pop() {
                finished.insert(done);
            }
            continue;
        };
        if let Some(pos) = path.iter().position(|n| *n == next) {
            let tail = path[path.len() - 1];
            let mut cycle: Vec<DependencyEdge> = path[pos..]
                .windows(2)
                .map(|w| DependencyEdge::new(w[0].clone(), w[1].clone()))
                .collect();
            cycle.push(DependencyEdge::new(tail.clone(), next.clone()));
            return Some(cycle);
        }
        if finished.contains(next) {
            continue;
        }
        path.push(next);
        frames.push(graph.successors(next));
    }
    None
}

/// Remove edges until `graph` is acyclic and report what was removed.
///
/// Running it again on the result removes nothing.
pub fn resolve_cycles(graph: &mut DependencyGraph) -> CycleReport {
    let mut report = CycleReport::default();
    let order: Vec<NodeKey> = graph.origins().cloned().collect();

    for node in &order {
        while let Some(cycle) = find_cycle(graph, node) {
            let Some(closing) = cycle.last().cloned() else {
                break;
            };
            debug!(
                "cycle through {node}: {}",
                cycle
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            graph.remove_edge(&closing.from, &closing.to);
            info!("removed cyclic dependency {closing}");
            report.removed.push(closing);
        }
    }
    report
}
