//! In-memory dependency graph over `(name, version)` nodes.

use dreamlock_schema::{DependencyEdge, DependencyMap, NodeKey, RawDependencyMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

static NO_SUCCESSORS: BTreeSet<NodeKey> = BTreeSet::new();

/// Directed graph where an edge `a -> b` means `a` depends on `b`.
///
/// Both nodes and adjacency sets are ordered, so every traversal visits
/// nodes in `(name, version)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<NodeKey>,
    edges: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from translator dependency lists, dropping empty lists.
    ///
    /// Duplicate declarations of the same edge collapse into one.
    pub fn from_raw(raw: &RawDependencyMap) -> Self {
        let mut graph = Self::new();
        let mut dropped = 0usize;
        for (name, versions) in raw {
            for (version, deps) in versions {
                if deps.is_empty() {
                    dropped += 1;
                    continue;
                }
                let from = NodeKey {
                    name: name.clone(),
                    version: version.clone(),
                };
                for dep in deps {
                    graph.add_edge(from.clone(), dep.clone());
                }
            }
        }
        debug!(
            "dependency graph: {} nodes, {} edges ({dropped} empty entries dropped)",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Rebuild from the `dependencies` table of an existing lock.
    pub fn from_dependency_map(map: &DependencyMap) -> Self {
        let mut graph = Self::new();
        for (name, versions) in map {
            for (version, deps) in versions {
                let from = NodeKey {
                    name: name.clone(),
                    version: version.clone(),
                };
                for dep in deps {
                    graph.add_edge(from.clone(), dep.clone());
                }
            }
        }
        graph
    }

    /// Returns `false` if the edge was already present.
    pub fn add_edge(&mut self, from: NodeKey, to: NodeKey) -> bool {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.edges.entry(from).or_default().insert(to)
    }

    /// Returns `false` if there was no such edge. Nodes are kept.
    pub fn remove_edge(&mut self, from: &NodeKey, to: &NodeKey) -> bool {
        let Some(targets) = self.edges.get_mut(from) else {
            return false;
        };
        let removed = targets.remove(to);
        if targets.is_empty() {
            self.edges.remove(from);
        }
        removed
    }

    pub fn contains_edge(&self, from: &NodeKey, to: &NodeKey) -> bool {
        self.edges.get(from).is_some_and(|t| t.contains(to))
    }

    pub fn successors(&self, node: &NodeKey) -> std::collections::btree_set::Iter<'_, NodeKey> {
        self.edges.get(node).unwrap_or(&NO_SUCCESSORS).iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.iter()
    }

    /// Nodes with at least one outgoing edge, in order.
    pub fn origins(&self) -> impl Iterator<Item = &NodeKey> {
        self.edges.keys()
    }

    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.edges.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |to| DependencyEdge::new(from.clone(), to.clone()))
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// The `dependencies` table: nodes without outgoing edges are omitted.
    pub fn to_dependency_map(&self) -> DependencyMap {
        let mut map = DependencyMap::new();
        for (from, targets) in &self.edges {
            map.entry(from.name.clone())
                .or_default()
                .insert(from.version.clone(), targets.clone());
        }
        map
    }

    pub fn is_acyclic(&self) -> bool {
        self.origins()
            .all(|node| crate::cycles::find_cycle(self, node).is_none())
    }
}
