//! Pure algorithms over [`Graph`].
//!
//! Every traversal here uses an explicit work stack or queue — flow graphs
//! can be deep (long operator chains, nested flow components), so nothing in
//! this module recurses. The DFS-based algorithms keep an enter/exit frame
//! stack so postorder falls out without true recursion.

use super::Graph;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Vertices with no incoming edge: the node set minus the union of all
/// successor sets.
#[must_use]
pub fn collect_heads<V>(graph: &Graph<V>) -> HashSet<V>
where
    V: Eq + Hash + Clone,
{
    let mut heads = graph.node_set();
    for (_, successors) in graph.iter() {
        for to in successors {
            heads.remove(to);
        }
    }
    heads
}

/// Vertices with an empty successor set.
#[must_use]
pub fn collect_tails<V>(graph: &Graph<V>) -> HashSet<V>
where
    V: Eq + Hash + Clone,
{
    graph
        .iter()
        .filter(|(_, successors)| successors.is_empty())
        .map(|(v, _)| v.clone())
        .collect()
}

/// Every vertex transitively reachable from any vertex in `starts`.
///
/// A start vertex itself is only included when some start reaches it — i.e.
/// when it sits on a cycle back to itself or is downstream of another start.
#[must_use]
pub fn collect_all_connected<'a, V, I>(graph: &Graph<V>, starts: I) -> HashSet<V>
where
    V: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = &'a V>,
{
    let mut reached = HashSet::new();
    let mut work: Vec<V> = Vec::new();
    for start in starts {
        work.extend(graph.connected_of(start).cloned());
    }
    while let Some(v) = work.pop() {
        if !reached.insert(v.clone()) {
            continue;
        }
        work.extend(graph.connected_of(&v).cloned());
    }
    reached
}

/// Breadth-style search from each start's direct successors.
///
/// A vertex satisfying `predicate` is collected and not expanded further; a
/// vertex failing it is expanded (successors enqueued) but not collected.
/// Each vertex is visited at most once, which bounds the search on cyclic
/// graphs.
#[must_use]
pub fn find_nearest<'a, V, I, P>(graph: &Graph<V>, starts: I, predicate: P) -> HashSet<V>
where
    V: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = &'a V>,
    P: Fn(&V) -> bool,
{
    let mut found = HashSet::new();
    nearest_scan(graph, starts, |v| {
        let matched = predicate(v);
        if matched {
            found.insert(v.clone());
        }
        matched
    });
    found
}

/// Same traversal as [`find_nearest`], but *every* visited vertex is
/// collected, matched or not — the full frontier plus the route to it.
/// Matched vertices still stop the expansion.
#[must_use]
pub fn collect_nearest<'a, V, I, P>(graph: &Graph<V>, starts: I, predicate: P) -> HashSet<V>
where
    V: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = &'a V>,
    P: Fn(&V) -> bool,
{
    let mut visited = HashSet::new();
    nearest_scan(graph, starts, |v| {
        visited.insert(v.clone());
        predicate(v)
    });
    visited
}

/// Shared frontier walk: `stop(v)` is called once per visited vertex and
/// returns whether expansion stops there.
fn nearest_scan<'a, V, I, F>(graph: &Graph<V>, starts: I, mut stop: F)
where
    V: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = &'a V>,
    F: FnMut(&V) -> bool,
{
    let mut seen: HashSet<V> = HashSet::new();
    let mut queue: VecDeque<V> = VecDeque::new();
    for start in starts {
        queue.extend(graph.connected_of(start).cloned());
    }
    while let Some(v) = queue.pop_front() {
        if !seen.insert(v.clone()) {
            continue;
        }
        if !stop(&v) {
            queue.extend(graph.connected_of(&v).cloned());
        }
    }
}

/// Kosaraju's strongly-connected-component decomposition, O(V + E).
///
/// 1. compute a DFS postorder of the graph;
/// 2. transpose;
/// 3. walk the postorder in reverse, flooding the transpose from each
///    unassigned vertex — everything reached is one component.
///
/// The returned components partition the node set exactly.
#[must_use]
pub fn find_strongly_connected_components<V>(graph: &Graph<V>) -> Vec<HashSet<V>>
where
    V: Eq + Hash + Clone,
{
    let order = sort_post_order(graph);
    let transposed = transpose(graph);

    let mut assigned: HashSet<V> = HashSet::new();
    let mut components = Vec::new();
    for root in order.iter().rev() {
        if assigned.contains(root) {
            continue;
        }
        let mut component = HashSet::new();
        let mut work = vec![root.clone()];
        while let Some(v) = work.pop() {
            if !assigned.insert(v.clone()) {
                continue;
            }
            work.extend(
                transposed
                    .connected_of(&v)
                    .filter(|s| !assigned.contains(*s))
                    .cloned(),
            );
            component.insert(v);
        }
        components.push(component);
    }
    components
}

/// The cyclic strongly-connected components of `graph`.
///
/// An SCC of size ≥ 2 is always cyclic; a singleton is cyclic iff the vertex
/// carries a self-edge. A non-empty result is the authoritative "this graph
/// has a cycle" answer; turning that into a user-facing diagnostic is the
/// caller's job.
#[must_use]
pub fn find_circuit<V>(graph: &Graph<V>) -> Vec<HashSet<V>>
where
    V: Eq + Hash + Clone,
{
    find_strongly_connected_components(graph)
        .into_iter()
        .filter(|component| {
            component.len() >= 2
                || component
                    .iter()
                    .next()
                    .is_some_and(|v| graph.is_connected(v, v))
        })
        .collect()
}

/// DFS postorder over every vertex.
///
/// For an acyclic graph this is a topological order listing tails before
/// heads: for all `i < j`, `graph.is_connected(order[i], order[j])` is false.
/// Callers that want producers first reverse the result.
#[must_use]
pub fn sort_post_order<V>(graph: &Graph<V>) -> Vec<V>
where
    V: Eq + Hash + Clone,
{
    enum Visit<V> {
        Enter(V),
        Exit(V),
    }

    let mut seen: HashSet<V> = HashSet::new();
    let mut order: Vec<V> = Vec::with_capacity(graph.len());
    let mut stack: Vec<Visit<V>> = Vec::new();

    for (root, _) in graph.iter() {
        if seen.contains(root) {
            continue;
        }
        stack.push(Visit::Enter(root.clone()));
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(v) => {
                    if !seen.insert(v.clone()) {
                        continue;
                    }
                    // Children drain before the Exit frame resurfaces.
                    stack.push(Visit::Exit(v.clone()));
                    stack.extend(
                        graph
                            .connected_of(&v)
                            .filter(|s| !seen.contains(*s))
                            .cloned()
                            .map(Visit::Enter),
                    );
                }
                Visit::Exit(v) => order.push(v),
            }
        }
    }
    order
}

/// A new graph with every edge reversed. `contains` is preserved;
/// `is_connected(a, b)` on the input becomes `is_connected(b, a)` on the
/// result. Transposing twice yields a structurally equal graph.
#[must_use]
pub fn transpose<V>(graph: &Graph<V>) -> Graph<V>
where
    V: Eq + Hash + Clone,
{
    let mut reversed = Graph::new();
    for (from, successors) in graph.iter() {
        reversed.add_node(from.clone());
        for to in successors {
            reversed.add_edge(to.clone(), from.clone());
        }
    }
    reversed
}

/// Keep only vertices satisfying `predicate`; keep an edge only if both
/// endpoints are kept.
#[must_use]
pub fn subgraph<V, P>(graph: &Graph<V>, predicate: P) -> Graph<V>
where
    V: Eq + Hash + Clone,
    P: Fn(&V) -> bool,
{
    let mut out = Graph::new();
    for (from, successors) in graph.iter() {
        if !predicate(from) {
            continue;
        }
        out.add_node(from.clone());
        for to in successors {
            if predicate(to) {
                out.add_edge(from.clone(), to.clone());
            }
        }
    }
    out
}
