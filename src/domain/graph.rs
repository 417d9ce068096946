//! Dependency graph between tasks
//!
//! A directed graph over opaque node keys whose edges carry the dependency id
//! that links a parent's `id:` tag to a child's `p:` tag. Uses petgraph's
//! stable graph for storage so node indices survive removals.
//!
//! The graph tolerates cycles: every traversal keeps a visited set and uses
//! an explicit stack, so deep chains do not grow the call stack.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

/// A labeled directed graph
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    /// The underlying directed graph, edge weights are dependency ids
    graph: StableDiGraph<N, String>,

    /// Map from node key to node index
    node_map: HashMap<N, NodeIndex>,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::default(),
            node_map: HashMap::new(),
        }
    }
}

impl<N> DependencyGraph<N>
where
    N: Copy + Eq + Hash + Ord + Debug,
{
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; adding an existing node does nothing
    pub fn add_node(&mut self, id: N) -> NodeIndex {
        if let Some(idx) = self.node_map.get(&id) {
            return *idx;
        }
        let idx = self.graph.add_node(id);
        self.node_map.insert(id, idx);
        idx
    }

    pub fn has_node(&self, id: N) -> bool {
        self.node_map.contains_key(&id)
    }

    /// Adds the edge `from -> to`, creating missing endpoints
    ///
    /// Self-loops and duplicate edges are ignored. Returns true if an edge was added.
    pub fn add_edge(&mut self, from: N, to: N, label: impl Into<String>) -> bool {
        if from == to || self.has_edge(from, to) {
            return false;
        }
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.graph.add_edge(from_idx, to_idx, label.into());
        log::trace!("graph: added edge {:?} -> {:?}", from, to);
        true
    }

    pub fn has_edge(&self, from: N, to: N) -> bool {
        match (self.node_map.get(&from), self.node_map.get(&to)) {
            (Some(f), Some(t)) => self.graph.contains_edge(*f, *t),
            _ => false,
        }
    }

    /// The dependency id carried by `from -> to`
    pub fn edge_label(&self, from: N, to: N) -> Option<&str> {
        let f = self.node_map.get(&from)?;
        let t = self.node_map.get(&to)?;
        let edge = self.graph.find_edge(*f, *t)?;
        self.graph.edge_weight(edge).map(String::as_str)
    }

    /// True if any edge carries the given dependency id
    pub fn has_edge_label(&self, label: &str) -> bool {
        self.graph.edge_indices().any(|e| self.graph[e] == label)
    }

    /// Nodes reachable from `id` along outgoing (or, reversed, incoming) edges
    ///
    /// With `recursive == false` only direct neighbors are returned. The start
    /// node appears in the result only if a cycle leads back to it.
    pub fn reachable_nodes(&self, id: N, recursive: bool, reverse: bool) -> BTreeSet<N> {
        let direction = if reverse {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        let mut result = BTreeSet::new();
        let Some(start) = self.node_map.get(&id) else {
            return result;
        };

        let mut stack = vec![*start];
        let mut visited = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for neighbor in self.graph.neighbors_directed(current, direction) {
                result.insert(self.graph[neighbor]);
                if recursive {
                    stack.push(neighbor);
                }
            }
        }

        result
    }

    /// Parents of a node (all ancestors when recursive)
    pub fn incoming_neighbors(&self, id: N, recursive: bool) -> BTreeSet<N> {
        self.reachable_nodes(id, recursive, true)
    }

    /// Children of a node (all descendants when recursive)
    pub fn outgoing_neighbors(&self, id: N, recursive: bool) -> BTreeSet<N> {
        self.reachable_nodes(id, recursive, false)
    }

    /// True if the node has neither incoming nor outgoing edges
    pub fn is_isolated(&self, id: N) -> bool {
        match self.node_map.get(&id) {
            Some(idx) => self.graph.neighbors_undirected(*idx).next().is_none(),
            None => true,
        }
    }

    /// Removes a node and its edges
    ///
    /// With `prune_isolated`, former neighbors left without edges are removed too.
    pub fn remove_node(&mut self, id: N, prune_isolated: bool) -> bool {
        let Some(idx) = self.node_map.remove(&id) else {
            return false;
        };
        let neighbors: BTreeSet<N> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n])
            .collect();
        self.graph.remove_node(idx);
        log::trace!("graph: removed node {:?}", id);

        if prune_isolated {
            for neighbor in neighbors {
                if self.is_isolated(neighbor) {
                    self.remove_node(neighbor, true);
                }
            }
        }
        true
    }

    /// Removes the edge `from -> to`
    ///
    /// With `prune_isolated`, either endpoint left without edges is removed.
    pub fn remove_edge(&mut self, from: N, to: N, prune_isolated: bool) -> bool {
        let edge = match (self.node_map.get(&from), self.node_map.get(&to)) {
            (Some(f), Some(t)) => self.graph.find_edge(*f, *t),
            _ => None,
        };
        let Some(edge) = edge else {
            return false;
        };
        self.graph.remove_edge(edge);
        log::trace!("graph: removed edge {:?} -> {:?}", from, to);

        if prune_isolated {
            for node in [from, to] {
                if self.is_isolated(node) {
                    self.remove_node(node, false);
                }
            }
        }
        true
    }

    /// Removes every edge `a -> c` that is implied by a longer path `a -> ... -> c`
    ///
    /// Edges are examined in sorted `(from, to)` order, so the result is
    /// deterministic and a second run removes nothing. Returns the number of
    /// edges removed. Nodes are kept even if they become isolated.
    pub fn transitive_reduction(&mut self) -> usize {
        let mut removed = 0;
        for (from, to, _) in self.edges() {
            if self.has_indirect_path(from, to) {
                self.remove_edge(from, to, false);
                removed += 1;
            }
        }
        removed
    }

    /// True if `to` is reachable from `from` without using the edge `from -> to`
    fn has_indirect_path(&self, from: N, to: N) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(&from), self.node_map.get(&to))
        else {
            return false;
        };

        let mut stack = vec![from_idx];
        let mut visited = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for neighbor in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if current == from_idx && neighbor == to_idx {
                    continue;
                }
                if neighbor == to_idx {
                    return true;
                }
                stack.push(neighbor);
            }
        }
        false
    }

    /// All edges as `(from, to, label)`, sorted by endpoints
    pub fn edges(&self) -> Vec<(N, N, String)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (source, target) = self.graph.edge_endpoints(e)?;
                Some((self.graph[source], self.graph[target], self.graph[e].clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// All node keys, sorted
    pub fn nodes(&self) -> BTreeSet<N> {
        self.node_map.keys().copied().collect()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Removes every node and edge
    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_pairs(graph: &DependencyGraph<u32>) -> Vec<(u32, u32)> {
        graph.edges().into_iter().map(|(f, t, _)| (f, t)).collect()
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::<u32>::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert!(graph.is_isolated(1));
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(1u32);
        let b = graph.add_node(1u32);
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn add_edge_creates_endpoints() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_edge(1u32, 2, "1"));
        assert!(graph.has_node(1));
        assert!(graph.has_node(2));
        assert!(graph.has_edge(1, 2));
        assert!(!graph.has_edge(2, 1));
        assert_eq!(graph.edge_label(1, 2), Some("1"));
        assert!(graph.has_edge_label("1"));
        assert!(!graph.has_edge_label("2"));
    }

    #[test]
    fn self_loops_and_duplicates_are_ignored() {
        let mut graph = DependencyGraph::new();
        assert!(!graph.add_edge(1u32, 1, "1"));
        assert!(graph.is_empty());

        assert!(graph.add_edge(1u32, 2, "1"));
        assert!(!graph.add_edge(1u32, 2, "1"));
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn reachability() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(2, 3, "2");
        graph.add_edge(2, 4, "2");

        assert_eq!(graph.outgoing_neighbors(1, false), BTreeSet::from([2]));
        assert_eq!(graph.outgoing_neighbors(1, true), BTreeSet::from([2, 3, 4]));
        assert_eq!(graph.incoming_neighbors(3, true), BTreeSet::from([1, 2]));
        assert_eq!(graph.incoming_neighbors(3, false), BTreeSet::from([2]));
        assert!(graph.reachable_nodes(9, true, false).is_empty());
    }

    #[test]
    fn reachability_survives_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(2, 3, "2");
        graph.add_edge(3, 1, "3");

        assert_eq!(graph.outgoing_neighbors(1, true), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut graph = DependencyGraph::new();
        for i in 0..10_000u32 {
            graph.add_edge(i, i + 1, i.to_string());
        }
        assert_eq!(graph.outgoing_neighbors(0, true).len(), 10_000);
    }

    #[test]
    fn remove_edge_prunes_isolated_endpoints() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(2, 3, "2");

        assert!(graph.remove_edge(1, 2, true));
        assert!(!graph.has_node(1));
        assert!(graph.has_node(2));
        assert!(graph.has_node(3));

        assert!(!graph.remove_edge(1, 2, true));
    }

    #[test]
    fn remove_edge_without_pruning() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        assert!(graph.remove_edge(1, 2, false));
        assert!(graph.has_node(1));
        assert!(graph.is_isolated(1));
        assert!(graph.is_isolated(2));
    }

    #[test]
    fn remove_node_cascades_to_isolated_neighbors() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(1, 3, "1");
        graph.add_edge(3, 4, "3");

        assert!(graph.remove_node(1, true));
        assert!(!graph.has_node(1));
        assert!(!graph.has_node(2));
        assert!(graph.has_node(3));
        assert!(graph.has_node(4));
        assert!(graph.has_edge(3, 4));
    }

    #[test]
    fn remove_node_keeps_neighbors_without_pruning() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        assert!(graph.remove_node(1, false));
        assert!(graph.has_node(2));
        assert!(!graph.remove_node(1, false));
    }

    #[test]
    fn transitive_reduction_removes_shortcuts() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(2, 3, "2");
        graph.add_edge(1, 3, "1");
        graph.add_edge(3, 4, "3");
        graph.add_edge(1, 4, "1");

        assert_eq!(graph.transitive_reduction(), 2);
        assert_eq!(edge_pairs(&graph), vec![(1, 2), (2, 3), (3, 4)]);
        assert_eq!(graph.outgoing_neighbors(1, true), BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn transitive_reduction_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(1, 3, "1");
        graph.add_edge(2, 4, "2");
        graph.add_edge(3, 4, "3");
        graph.add_edge(1, 4, "1");

        graph.transitive_reduction();
        let once = graph.edges();
        assert_eq!(graph.transitive_reduction(), 0);
        assert_eq!(graph.edges(), once);
    }

    #[test]
    fn transitive_reduction_with_cycle_keeps_reachability() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(1u32, 2, "1");
        graph.add_edge(2, 1, "2");
        graph.add_edge(1, 3, "1");
        graph.add_edge(2, 3, "2");

        let before: Vec<_> = (1..=3).map(|n| graph.outgoing_neighbors(n, true)).collect();
        graph.transitive_reduction();
        let after: Vec<_> = (1..=3).map(|n| graph.outgoing_neighbors(n, true)).collect();

        assert_eq!(before, after);
        assert_eq!(graph.edges().len(), 3);
    }
}
