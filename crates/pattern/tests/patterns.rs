//! Engine behavior over hand-built cluster graphs.

use std::collections::BTreeSet;
use std::sync::Arc;
use storyline_graph::{
    ChangeGraph, Cluster, Clusterer, Edge, EdgeType, Node, NodeKind,
};
use storyline_pattern::{
    export_patterns, Pattern, ReasonType, TraversalEngine,
};
use storyline_syntax::memory::{MemorySource, TreeSpec};
use storyline_syntax::{LanguageConfig, SyntaxSpan};

struct Fixture {
    source: MemorySource,
    graph: ChangeGraph,
}

impl Fixture {
    fn new() -> Self {
        Self {
            source: MemorySource::new(),
            graph: ChangeGraph::new(),
        }
    }

    fn node(&mut self, name: &str, kind: &str, node_kind: NodeKind) -> petgraph::graph::NodeIndex {
        let span: Arc<dyn SyntaxSpan> =
            self.source
                .add_file(&format!("{name}.java"), "s", TreeSpec::new(kind, 0..1));
        self.graph.add_node(Node::new(span, node_kind))
    }

    fn statement(&mut self, name: &str) -> petgraph::graph::NodeIndex {
        self.node(name, "expression_statement", NodeKind::Base)
    }

    /// `user` reads what `declaration` declares.
    fn uses(&mut self, declaration: petgraph::graph::NodeIndex, user: petgraph::graph::NodeIndex) {
        self.graph
            .add_edge(declaration, user, Edge::unit(EdgeType::DefUse));
    }

    fn single_cluster(&self) -> Cluster {
        let mut clusters = Clusterer::new(&self.graph).into_clusters();
        assert_eq!(clusters.len(), 1);
        clusters.remove(0)
    }
}

fn paths_of(pattern: &Pattern, cluster: &Cluster) -> BTreeSet<String> {
    pattern
        .vertex_set()
        .iter()
        .map(|&idx| cluster.graph().node(idx).path().to_string())
        .collect()
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| format!("{s}.java")).collect()
}

#[test]
fn usage_chain_covers_declaration_and_use() {
    let mut fx = Fixture::new();
    let declaration = fx.statement("Decl");
    let user = fx.statement("Use");
    fx.uses(declaration, user);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);
    assert!(matches!(analysis.patterns[0], Pattern::Usage(_)));
    assert_eq!(
        paths_of(&analysis.patterns[0], &analysis.cluster),
        names(&["Decl", "Use"])
    );
}

#[test]
fn acyclic_chains_close_into_a_requirement_composite() {
    let mut fx = Fixture::new();
    let a = fx.statement("A");
    let b = fx.statement("B");
    let c = fx.statement("C");
    // A uses B, B uses C
    fx.uses(b, a);
    fx.uses(c, b);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);

    let composite = &analysis.patterns[0];
    assert_eq!(composite.reason_type(), Some(ReasonType::Requirement));
    assert_eq!(composite.children().len(), 2);
    assert_eq!(paths_of(composite, &analysis.cluster), names(&["A", "B", "C"]));

    // the reason set is the requirement anchor
    let reason_paths: BTreeSet<String> = match composite {
        Pattern::Composite(c) => c
            .reason()
            .iter()
            .map(|&idx| analysis.cluster.graph().node(idx).path().to_string())
            .collect(),
        _ => unreachable!(),
    };
    assert_eq!(reason_paths, names(&["B"]));
}

#[test]
fn cyclic_usage_terminates_and_collapses() {
    let mut fx = Fixture::new();
    let a = fx.statement("A");
    let b = fx.statement("B");
    let c = fx.statement("C");
    // A uses B, B uses C, C uses A
    fx.uses(b, a);
    fx.uses(c, b);
    fx.uses(a, c);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);
    assert!(matches!(analysis.patterns[0], Pattern::Usage(_)));
    assert_eq!(
        paths_of(&analysis.patterns[0], &analysis.cluster),
        names(&["A", "B", "C"])
    );
}

#[test]
fn succession_chains_merge_transitively() {
    let mut fx = Fixture::new();
    let s1 = fx.statement("S1");
    let s2 = fx.statement("S2");
    let s3 = fx.statement("S3");
    fx.graph.add_edge(s1, s2, Edge::unit(EdgeType::Succession));
    fx.graph.add_edge(s2, s3, Edge::unit(EdgeType::Succession));

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);

    let Pattern::Successive(successive) = &analysis.patterns[0] else {
        panic!("expected a successive pattern");
    };
    let chain_paths: Vec<String> = successive
        .chain()
        .iter()
        .map(|&idx| analysis.cluster.graph().node(idx).path().to_string())
        .collect();
    assert_eq!(chain_paths, vec!["S1.java", "S2.java", "S3.java"]);
}

#[test]
fn method_declarations_never_join_succession_chains() {
    let mut fx = Fixture::new();
    let method = fx.node("M", "method_declaration", NodeKind::Base);
    let statement = fx.statement("S");
    fx.graph
        .add_edge(method, statement, Edge::unit(EdgeType::Succession));

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    // the method falls back to a singular pattern, the statement to its own
    assert_eq!(analysis.patterns.len(), 2);
    assert!(analysis
        .patterns
        .iter()
        .all(|p| matches!(p, Pattern::Singular(_))));
}

#[test]
fn extension_nodes_get_declaration_patterns() {
    let mut fx = Fixture::new();
    let changed = fx.statement("Changed");
    let extension = fx.node("Ext", "expression_statement", NodeKind::Extension);
    fx.uses(changed, extension);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);

    let Pattern::Declaration(declaration) = &analysis.patterns[0] else {
        panic!("expected a declaration pattern");
    };
    assert_eq!(
        analysis
            .cluster
            .graph()
            .node(declaration.anchor())
            .path(),
        "Ext.java"
    );
    assert_eq!(
        paths_of(&analysis.patterns[0], &analysis.cluster),
        names(&["Changed", "Ext"])
    );
}

#[test]
fn similar_nodes_merge_their_components() {
    let mut fx = Fixture::new();
    let m1 = fx.node("M1", "method_declaration", NodeKind::Base);
    let m2 = fx.node("M2", "method_declaration", NodeKind::Base);
    let edge = Edge::new(EdgeType::Similarity, 1.0);
    fx.graph.add_edge(m1, m2, edge);
    fx.graph.add_edge(m2, m1, edge);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    assert_eq!(analysis.patterns.len(), 1);
    assert_eq!(analysis.patterns[0].reason_type(), Some(ReasonType::Similar));
    assert_eq!(
        paths_of(&analysis.patterns[0], &analysis.cluster),
        names(&["M1", "M2"])
    );
}

#[test]
fn every_active_base_node_lands_in_a_pattern() {
    let mut fx = Fixture::new();
    let a = fx.statement("A");
    let b = fx.statement("B");
    let plain = fx.statement("Plain");
    fx.uses(a, b);
    fx.graph
        .add_edge(plain, a, Edge::unit(EdgeType::Context));

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    for (idx, node) in analysis.cluster.graph().nodes() {
        if node.is_base() && node.is_active() {
            assert!(
                analysis.patterns.iter().any(|p| p.contains(idx)),
                "node {} is uncovered",
                node.path()
            );
        }
    }
}

#[test]
fn leads_are_stable_across_runs() {
    let build = || {
        let mut fx = Fixture::new();
        let declaration = fx.statement("Decl");
        let user = fx.statement("Use");
        fx.uses(declaration, user);
        TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default())
    };

    let first = build();
    let second = build();
    let lead_path = |analysis: &storyline_pattern::ClusterAnalysis| {
        let lead = analysis.patterns[0].lead().expect("lead");
        analysis.cluster.graph().node(lead).path().to_string()
    };
    assert_eq!(lead_path(&first), lead_path(&second));
}

#[test]
fn pattern_export_round_trips() {
    let mut fx = Fixture::new();
    let a = fx.statement("A");
    let b = fx.statement("B");
    let c = fx.statement("C");
    fx.uses(b, a);
    fx.uses(c, b);

    let analysis = TraversalEngine::run(fx.single_cluster(), &LanguageConfig::default());
    let config = LanguageConfig::default();
    let export = export_patterns(
        &analysis.patterns,
        &analysis.cluster,
        "cluster-0",
        &config,
        None,
    );

    // one aggregator per pattern: the composite and its two children
    let aggregators = export
        .nodes
        .iter()
        .filter(|node| node.node_kind == NodeKind::Aggregator)
        .count();
    assert_eq!(aggregators, 3);

    let json = export.to_json().expect("json");
    let round_tripped = storyline_graph::GraphExport::from_json(&json).expect("parse");
    assert_eq!(round_tripped.nodes.len(), export.nodes.len());
    assert_eq!(round_tripped.edges.len(), export.edges.len());
    assert_eq!(round_tripped, export);
}
