use std::collections::{HashMap, HashSet};

use crate::types::{Edge, Node};

/// Directed dependency graph over top-level declarations.
///
/// Edges are simple (present or absent) and never loop back to their own
/// source. Adjacency is kept in both directions so node removal and
/// disconnected-node queries never need a scan over every edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: HashSet<Node>,
    edges_out: HashMap<Node, HashSet<Node>>,
    edges_in: HashMap<Node, HashSet<Node>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no edges. No-op if the node is already present.
    pub fn add_node(&mut self, node: Node) {
        if self.nodes.contains(&node) {
            return;
        }
        self.edges_out.insert(node.clone(), HashSet::new());
        self.edges_in.insert(node.clone(), HashSet::new());
        self.nodes.insert(node);
    }

    /// Remove a node, its own adjacency records, and every edge other nodes
    /// hold towards it.
    pub fn remove_node(&mut self, node: &Node) {
        if !self.nodes.remove(node) {
            return;
        }
        if let Some(targets) = self.edges_out.remove(node) {
            for target in targets {
                if let Some(sources) = self.edges_in.get_mut(&target) {
                    sources.remove(node);
                }
            }
        }
        if let Some(sources) = self.edges_in.remove(node) {
            for source in sources {
                if let Some(targets) = self.edges_out.get_mut(&source) {
                    targets.remove(node);
                }
            }
        }
    }

    /// Add a directed edge, adding either endpoint as a node if missing.
    ///
    /// Self edges are not interesting for this application and are dropped.
    pub fn add_edge(&mut self, from: Node, to: Node) {
        if from == to {
            return;
        }
        self.add_node(from.clone());
        self.add_node(to.clone());
        if let Some(targets) = self.edges_out.get_mut(&from) {
            targets.insert(to.clone());
        }
        if let Some(sources) = self.edges_in.get_mut(&to) {
            sources.insert(from);
        }
    }

    /// Remove a directed edge if present. The endpoints stay in the graph.
    pub fn remove_edge(&mut self, from: &Node, to: &Node) {
        if let Some(targets) = self.edges_out.get_mut(from) {
            targets.remove(to);
        }
        if let Some(sources) = self.edges_in.get_mut(to) {
            sources.remove(from);
        }
    }

    /// Remove every node that has neither incoming nor outgoing edges.
    pub fn remove_disconnected_nodes(&mut self) {
        let disconnected: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| self.is_disconnected(n))
            .cloned()
            .collect();
        for node in &disconnected {
            self.remove_node(node);
        }
    }

    pub fn has_node(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    /// True if the node is present and has no edges in either direction.
    pub fn is_disconnected(&self, node: &Node) -> bool {
        self.has_node(node)
            && self.edges_out.get(node).map_or(true, HashSet::is_empty)
            && self.edges_in.get(node).map_or(true, HashSet::is_empty)
    }

    /// Snapshot of all nodes, in no particular order.
    pub fn nodes(&self) -> HashSet<Node> {
        self.nodes.clone()
    }

    /// Snapshot of all edges, in no particular order.
    pub fn edges(&self) -> HashSet<Edge> {
        self.edges_out
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .map(move |to| Edge::new(from.clone(), to.clone()))
            })
            .collect()
    }

    /// Declarations that `node`'s definition references.
    pub fn dependencies(&self, node: &Node) -> HashSet<Node> {
        self.edges_out.get(node).cloned().unwrap_or_default()
    }

    /// Declarations whose definitions reference `node`.
    pub fn dependents(&self, node: &Node) -> HashSet<Node> {
        self.edges_in.get(node).cloned().unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges_out.values().map(HashSet::len).sum()
    }
}
