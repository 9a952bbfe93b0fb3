//! Generic mutable directed graph.
//!
//! [`Graph`] is the substrate every compiler phase works on: the flow-graph IR
//! projects itself onto a `Graph<ElementId>` for dependency analysis, and the
//! planner-facing algorithms in [`algo`] are pure functions over it.
//!
//! The representation is a plain adjacency map: every vertex owns a successor
//! set, and a vertex with no outgoing edges still owns an (empty) set. Edge
//! presence is a set, not a multiset — adding the same edge twice is a no-op.
//! All read operations treat an absent vertex as "empty", never as an error.
//!
//! Single-writer discipline: the graph is mutated on one logical thread of
//! control, and mutation while an iterator is live is a caller bug.

pub mod algo;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A mutable directed graph over vertices of type `V`.
///
/// Invariants:
/// - an edge's endpoints are always present as vertices
///   (`add_edge` registers both);
/// - removing a vertex removes every edge touching it;
/// - there are no duplicate edges.
///
/// Equality is structural: same vertex set, same edge set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph<V>
where
    V: Eq + Hash,
{
    adjacency: HashMap<V, HashSet<V>>,
}

impl<V> Graph<V>
where
    V: Eq + Hash + Clone,
{
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adjacency: HashMap::new(),
        }
    }

    /// Register `node`, with no edges. No-op if already present.
    pub fn add_node(&mut self, node: V) {
        self.adjacency.entry(node).or_default();
    }

    /// Add the edge `from -> to`, registering both endpoints.
    pub fn add_edge(&mut self, from: V, to: V) {
        self.adjacency.entry(to.clone()).or_default();
        self.adjacency.entry(from).or_default().insert(to);
    }

    /// Add an edge from `from` to every vertex in `tos`.
    ///
    /// An empty `tos` still registers `from` as a vertex.
    pub fn add_edges<I>(&mut self, from: V, tos: I)
    where
        I: IntoIterator<Item = V>,
    {
        self.add_node(from.clone());
        for to in tos {
            self.add_edge(from.clone(), to);
        }
    }

    /// Remove `node` and every edge incident to it.
    ///
    /// Returns `true` if the vertex was present.
    pub fn remove_node(&mut self, node: &V) -> bool {
        let present = self.adjacency.remove(node).is_some();
        if present {
            for successors in self.adjacency.values_mut() {
                successors.remove(node);
            }
        }
        present
    }

    /// Remove every vertex in `nodes` and all incident edges, in one sweep
    /// over the adjacency map.
    pub fn remove_nodes<'a, I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = &'a V>,
        V: 'a,
    {
        let doomed: HashSet<&V> = nodes.into_iter().collect();
        if doomed.is_empty() {
            return;
        }
        self.adjacency.retain(|v, _| !doomed.contains(v));
        for successors in self.adjacency.values_mut() {
            successors.retain(|v| !doomed.contains(v));
        }
    }

    /// Remove the edge `from -> to` if present. Endpoints stay registered.
    ///
    /// Returns `true` if the edge existed.
    pub fn remove_edge(&mut self, from: &V, to: &V) -> bool {
        match self.adjacency.entry(from.clone()) {
            Entry::Occupied(mut e) => e.get_mut().remove(to),
            Entry::Vacant(_) => false,
        }
    }

    /// Whether `node` is a vertex of this graph.
    #[must_use]
    pub fn contains(&self, node: &V) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Whether the edge `from -> to` is present.
    ///
    /// `false` for absent vertices — reads never fail.
    #[must_use]
    pub fn is_connected(&self, from: &V, to: &V) -> bool {
        self.adjacency.get(from).is_some_and(|s| s.contains(to))
    }

    /// The direct successors of `node`; empty iteration if absent.
    pub fn connected_of<'a>(&'a self, node: &V) -> impl Iterator<Item = &'a V> {
        self.adjacency.get(node).into_iter().flatten()
    }

    /// The set of all vertices.
    #[must_use]
    pub fn node_set(&self) -> HashSet<V> {
        self.adjacency.keys().cloned().collect()
    }

    /// Iterate over `(vertex, successor-set)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&V, &HashSet<V>)> {
        self.adjacency.iter()
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Remove all vertices and edges.
    pub fn clear(&mut self) {
        self.adjacency.clear();
    }
}

impl<V> FromIterator<(V, V)> for Graph<V>
where
    V: Eq + Hash + Clone,
{
    /// Build a graph from an edge list.
    fn from_iter<I: IntoIterator<Item = (V, V)>>(edges: I) -> Self {
        let mut g = Self::new();
        for (from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }
}
