use flowforge::graph::Graph;
use std::collections::HashSet;

#[test]
fn add_edge_registers_both_endpoints() {
    let mut g = Graph::new();
    g.add_edge("a", "b");
    assert!(g.contains(&"a"));
    assert!(g.contains(&"b"));
    assert!(g.is_connected(&"a", &"b"));
    assert!(!g.is_connected(&"b", &"a"));
}

#[test]
fn duplicate_edges_collapse() {
    let mut once = Graph::new();
    once.add_edge(1, 2);

    let mut twice = Graph::new();
    twice.add_edge(1, 2);
    twice.add_edge(1, 2);

    assert_eq!(once, twice);
    assert_eq!(twice.connected_of(&1).count(), 1);
}

#[test]
fn add_edges_with_empty_collection_registers_source() {
    let mut g: Graph<u32> = Graph::new();
    g.add_edges(7, []);
    assert!(g.contains(&7));
    assert_eq!(g.connected_of(&7).count(), 0);

    g.add_edges(7, [8, 9]);
    assert!(g.is_connected(&7, &8));
    assert!(g.is_connected(&7, &9));
}

#[test]
fn remove_node_cascades_to_incident_edges() {
    let mut g = Graph::new();
    g.add_edge("u", "v");
    g.add_edge("v", "w");
    g.add_edge("x", "v");

    assert!(g.remove_node(&"v"));
    assert!(!g.contains(&"v"));
    for other in ["u", "w", "x"] {
        assert!(!g.is_connected(&other, &"v"));
        assert!(!g.is_connected(&"v", &other));
    }
    // Untouched vertices survive.
    assert!(g.contains(&"u"));
    assert!(g.contains(&"w"));
    assert!(g.contains(&"x"));
}

#[test]
fn remove_nodes_bulk_single_pass() {
    let mut g = Graph::new();
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 1);
    g.add_edge(4, 2);

    g.remove_nodes([&2, &3]);
    assert_eq!(g.node_set(), HashSet::from([1, 4]));
    assert_eq!(g.connected_of(&4).count(), 0);
    assert_eq!(g.connected_of(&1).count(), 0);
}

#[test]
fn remove_edge_keeps_vertices() {
    let mut g = Graph::new();
    g.add_edge("a", "b");
    assert!(g.remove_edge(&"a", &"b"));
    assert!(!g.remove_edge(&"a", &"b"));
    assert!(g.contains(&"a"));
    assert!(g.contains(&"b"));
    assert!(!g.is_connected(&"a", &"b"));
}

#[test]
fn reads_on_absent_vertices_are_empty_not_errors() {
    let g: Graph<&str> = Graph::new();
    assert!(!g.contains(&"ghost"));
    assert!(!g.is_connected(&"ghost", &"spirit"));
    assert_eq!(g.connected_of(&"ghost").count(), 0);
}

#[test]
fn equality_is_structural() {
    let mut left = Graph::new();
    left.add_edge("a", "b");
    left.add_edge("a", "c");
    left.add_node("d");

    let mut right = Graph::new();
    right.add_node("d");
    right.add_edge("a", "c");
    right.add_edge("a", "b");

    assert_eq!(left, right);

    right.add_edge("b", "c");
    assert_ne!(left, right);
}

#[test]
fn clear_and_is_empty() {
    let mut g = Graph::new();
    assert!(g.is_empty());
    g.add_edge(1, 2);
    assert!(!g.is_empty());
    g.clear();
    assert!(g.is_empty());
    assert_eq!(g.node_set(), HashSet::new());
}

#[test]
fn iteration_yields_vertex_successor_pairs() {
    let mut g = Graph::new();
    g.add_edge("a", "b");
    g.add_edge("a", "c");
    g.add_node("d");

    let mut seen = HashSet::new();
    for (vertex, successors) in g.iter() {
        seen.insert(*vertex);
        match *vertex {
            "a" => assert_eq!(successors.len(), 2),
            "b" | "c" | "d" => assert!(successors.is_empty()),
            other => panic!("unexpected vertex {other}"),
        }
    }
    assert_eq!(seen.len(), 4);
}

#[test]
fn from_edge_list() {
    let g: Graph<u8> = [(1, 2), (2, 3)].into_iter().collect();
    assert!(g.is_connected(&1, &2));
    assert!(g.is_connected(&2, &3));
    assert_eq!(g.len(), 3);
}
