use flowforge::graph::{Graph, algo};
use std::collections::HashSet;

fn diamond() -> Graph<&'static str> {
    // a -> b -> d, a -> c -> d
    [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]
        .into_iter()
        .collect()
}

#[test]
fn heads_and_tails() {
    let mut g = diamond();
    g.add_node("island");

    let heads = algo::collect_heads(&g);
    assert_eq!(heads, HashSet::from(["a", "island"]));

    let tails = algo::collect_tails(&g);
    assert_eq!(tails, HashSet::from(["d", "island"]));
}

#[test]
fn collect_all_connected_excludes_unreached_starts() {
    let g: Graph<&str> = [("a", "b"), ("b", "c")].into_iter().collect();
    let reached = algo::collect_all_connected(&g, [&"a"]);
    assert_eq!(reached, HashSet::from(["b", "c"]));
}

#[test]
fn collect_all_connected_includes_start_on_cycle() {
    let g: Graph<&str> = [("a", "b"), ("b", "a")].into_iter().collect();
    let reached = algo::collect_all_connected(&g, [&"a"]);
    assert_eq!(reached, HashSet::from(["a", "b"]));
}

#[test]
fn find_nearest_collects_matches_without_expanding_them() {
    // a -> b -> c -> d; matching "c" must hide "d".
    let g: Graph<&str> = [("a", "b"), ("b", "c"), ("c", "d")].into_iter().collect();
    let found = algo::find_nearest(&g, [&"a"], |v| *v == "c");
    assert_eq!(found, HashSet::from(["c"]));
}

#[test]
fn find_nearest_is_bounded_on_cycles() {
    let g: Graph<&str> = [("a", "b"), ("b", "a")].into_iter().collect();
    let found = algo::find_nearest(&g, [&"a"], |_| false);
    assert!(found.is_empty());
}

#[test]
fn collect_nearest_includes_the_route() {
    let g: Graph<&str> = [("a", "b"), ("b", "c"), ("c", "d")].into_iter().collect();
    let visited = algo::collect_nearest(&g, [&"a"], |v| *v == "c");
    // Frontier plus route: "b" (expanded) and "c" (match); "d" stays hidden.
    assert_eq!(visited, HashSet::from(["b", "c"]));
}

#[test]
fn scc_components_partition_the_node_set() {
    let g: Graph<&str> = [
        ("a", "b"),
        ("b", "c"),
        ("c", "b"), // {b, c} cycle
        ("c", "d"),
        ("d", "e"),
        ("e", "d"), // {d, e} cycle
    ]
    .into_iter()
    .collect();

    let components = algo::find_strongly_connected_components(&g);
    let mut all: Vec<&str> = components.iter().flatten().copied().collect();
    all.sort_unstable();
    let mut expected: Vec<&str> = g.node_set().into_iter().collect();
    expected.sort_unstable();
    // Every vertex in exactly one component.
    assert_eq!(all, expected);

    let of = |v: &str| {
        components
            .iter()
            .find(|c| c.contains(v))
            .expect("vertex assigned")
    };
    assert_eq!(of("b"), of("c"));
    assert_eq!(of("d"), of("e"));
    assert_ne!(of("a"), of("b"));
    assert_ne!(of("c"), of("d"));
}

#[test]
fn circuit_detection() {
    let acyclic = diamond();
    assert!(algo::find_circuit(&acyclic).is_empty());

    let mut self_loop = Graph::new();
    self_loop.add_edge("a", "a");
    let circuits = algo::find_circuit(&self_loop);
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0], HashSet::from(["a"]));

    let two_cycle: Graph<&str> = [("x", "y"), ("y", "x"), ("y", "z")].into_iter().collect();
    let circuits = algo::find_circuit(&two_cycle);
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0], HashSet::from(["x", "y"]));
}

#[test]
fn post_order_is_topological_for_acyclic_graphs() {
    let g: Graph<u32> = [(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)].into_iter().collect();
    let order = algo::sort_post_order(&g);
    assert_eq!(order.len(), 5);

    // Tails before heads: no edge from an earlier to a later entry.
    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            assert!(
                !g.is_connected(&order[i], &order[j]),
                "edge {} -> {} violates postorder",
                order[i],
                order[j],
            );
        }
    }
}

#[test]
fn post_order_visits_every_vertex_once() {
    let g: Graph<&str> = [("a", "b"), ("b", "a"), ("c", "a")].into_iter().collect();
    let order = algo::sort_post_order(&g);
    let unique: HashSet<&&str> = order.iter().collect();
    assert_eq!(order.len(), 3);
    assert_eq!(unique.len(), 3);
}

#[test]
fn transpose_reverses_and_involutes() {
    let g = diamond();
    let t = algo::transpose(&g);
    assert!(t.is_connected(&"b", &"a"));
    assert!(!t.is_connected(&"a", &"b"));
    assert_eq!(t.node_set(), g.node_set());

    // Property: transpose of transpose is structurally equal.
    assert_eq!(algo::transpose(&t), g);
}

#[test]
fn subgraph_keeps_edges_with_both_endpoints() {
    let g = diamond();
    let sub = algo::subgraph(&g, |v| *v != "c");
    assert!(sub.contains(&"a"));
    assert!(!sub.contains(&"c"));
    assert!(sub.is_connected(&"a", &"b"));
    assert!(sub.is_connected(&"b", &"d"));
    assert!(!sub.is_connected(&"a", &"d"));
}

#[test]
fn clone_is_a_structural_copy() {
    let g = diamond();
    let copy = g.clone();
    assert_eq!(g, copy);
}
