//! Property Tests for Graph Traversals
//!
//! Random graphs with chains, back edges and self loops. Every traversal must
//! terminate and touch each unique node exactly once.

use proptest::prelude::*;
use relink_core::codec::encode;
use relink_core::graph::{apply_defaults, walk, Node, Relationship};
use relink_core::{build_generic, ResourceKey};
use serde_json::json;

/// `size` nodes linked in a chain, plus arbitrary extra edges.
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..30).prop_flat_map(|size| {
        let edges = prop::collection::vec((0..size, 0..size), 0..60);
        (Just(size), edges)
    })
}

fn build_graph(size: usize, edges: &[(usize, usize)]) -> Vec<Node> {
    let nodes: Vec<Node> = (0..size)
        .map(|i| {
            Node::generic("item")
                .id(format!("i{i}"))
                .attribute("position", json!(i))
                .build()
                .unwrap()
        })
        .collect();
    for pair in nodes.windows(2) {
        pair[0].set_relationship("next", pair[1].clone());
    }
    for (k, (from, to)) in edges.iter().enumerate() {
        nodes[*from].set_relationship(format!("edge{k}"), nodes[*to].clone());
    }
    nodes
}

fn release(nodes: &[Node]) {
    for node in nodes {
        node.clear_relationships();
    }
}

proptest! {
    #[test]
    fn prop_traversals_visit_each_node_once((size, edges) in graph_strategy()) {
        let nodes = build_graph(size, &edges);
        let root = &nodes[0];

        prop_assert_eq!(walk(root).count(), size);
        prop_assert_eq!(apply_defaults(root), size);

        let document = encode(root).unwrap();
        prop_assert_eq!(document.included.len(), size - 1);

        release(&nodes);
    }

    #[test]
    fn prop_encode_then_build_is_equal((size, edges) in graph_strategy()) {
        let nodes = build_graph(size, &edges);
        let root = &nodes[0];

        let rebuilt = build_generic(&encode(root).unwrap()).unwrap().into_one().unwrap();
        prop_assert!(rebuilt == *root);
        prop_assert!(*root == rebuilt);

        // Distinct handles came back for distinct keys only.
        let keys: Vec<ResourceKey> = walk(&rebuilt).map(|node| node.key()).collect();
        prop_assert_eq!(keys.len(), size);

        release(&nodes);
        rebuilt.clear_relationships();
    }

    #[test]
    fn prop_to_many_relationships_keep_order(size in 1usize..20) {
        let children: Vec<Node> = (0..size)
            .map(|i| Node::generic("child").id(i.to_string()).attribute("n", json!(i)).build().unwrap())
            .collect();
        let parent = Node::generic("parent").id("p").build().unwrap();
        parent.set_relationship("children", Relationship::Many(children));

        let rebuilt = build_generic(&encode(&parent).unwrap()).unwrap().into_one().unwrap();
        let rebuilt_children = rebuilt.relationship("children").unwrap();
        let ids: Vec<String> = rebuilt_children.nodes().filter_map(Node::id).collect();
        let expected: Vec<String> = (0..size).map(|i| i.to_string()).collect();
        prop_assert_eq!(ids, expected);
    }
}
