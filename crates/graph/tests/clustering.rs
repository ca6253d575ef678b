//! Clustering equals connected components of the active subgraph.

use std::collections::BTreeSet;
use std::sync::Arc;
use storyline_graph::{ChangeGraph, Cluster, Clusterer, Edge, EdgeType, Node, NodeKind};
use storyline_syntax::memory::{MemorySource, TreeSpec};
use storyline_syntax::SyntaxSpan;

struct Fixture {
    graph: ChangeGraph,
    source: MemorySource,
}

impl Fixture {
    fn new() -> Self {
        Self {
            graph: ChangeGraph::new(),
            source: MemorySource::new(),
        }
    }

    fn node(&mut self, name: &str) -> petgraph::graph::NodeIndex {
        let path = format!("{name}.java");
        let span: Arc<dyn SyntaxSpan> =
            self.source
                .add_file(&path, "s", TreeSpec::new("expression_statement", 0..1));
        self.graph.add_node(Node::new(span, NodeKind::Base))
    }
}

fn membership(cluster: &Cluster) -> BTreeSet<String> {
    cluster
        .graph()
        .nodes()
        .map(|(_, node)| node.path().to_string())
        .collect()
}

#[test]
fn clusters_are_connected_components() {
    let mut fx = Fixture::new();
    let a = fx.node("A");
    let b = fx.node("B");
    let c = fx.node("C");
    let d = fx.node("D");
    let e = fx.node("E");
    let _f = fx.node("F");

    fx.graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
    fx.graph.add_edge(b, c, Edge::unit(EdgeType::Succession));
    fx.graph.add_edge(d, e, Edge::unit(EdgeType::Similarity));

    let clusterer = Clusterer::new(&fx.graph);
    let clusters = clusterer.clusters();

    let mut partitions: Vec<BTreeSet<String>> = clusters.iter().map(membership).collect();
    partitions.sort();

    let expected: Vec<BTreeSet<String>> = vec![
        ["A.java", "B.java", "C.java"]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        ["D.java", "E.java"].iter().map(|s| (*s).to_string()).collect(),
        ["F.java"].iter().map(|s| (*s).to_string()).collect(),
    ];
    assert_eq!(partitions, expected);
}

#[test]
fn edge_direction_does_not_matter() {
    let mut fx = Fixture::new();
    let a = fx.node("A");
    let b = fx.node("B");
    let c = fx.node("C");

    // only incoming edges connect B to the others
    fx.graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
    fx.graph.add_edge(c, b, Edge::unit(EdgeType::DefUse));

    let clusterer = Clusterer::new(&fx.graph);
    assert_eq!(clusterer.clusters().len(), 1);
    assert_eq!(clusterer.clusters()[0].len(), 3);
}

#[test]
fn inactive_nodes_are_excluded_from_every_cluster() {
    let mut fx = Fixture::new();
    let a = fx.node("A");
    let b = fx.node("B");
    let dead = fx.node("Dead");

    fx.graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
    fx.graph.add_edge(dead, a, Edge::unit(EdgeType::DefUse));
    fx.graph.node_mut(dead).set_active(false);

    let clusterer = Clusterer::new(&fx.graph);
    let clusters = clusterer.clusters();
    assert_eq!(clusters.len(), 1);
    assert_eq!(
        membership(&clusters[0]),
        ["A.java", "B.java"]
            .iter()
            .map(|s| (*s).to_string())
            .collect::<BTreeSet<String>>()
    );
}

#[test]
fn clusters_own_copies_of_all_member_edges() {
    let mut fx = Fixture::new();
    let a = fx.node("A");
    let b = fx.node("B");

    fx.graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
    fx.graph.add_edge(a, b, Edge::unit(EdgeType::Similarity));
    fx.graph.add_edge(b, a, Edge::unit(EdgeType::Similarity));

    let clusterer = Clusterer::new(&fx.graph);
    let cluster = &clusterer.clusters()[0];
    assert_eq!(cluster.graph().edge_count(), 3);
}
