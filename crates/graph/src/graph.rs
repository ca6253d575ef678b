use crate::{Edge, EdgeType, Node};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use storyline_syntax::SpanFingerprint;

/// Directed, weighted multigraph over change and context nodes.
///
/// The container permits parallel edges between a pair of nodes; self-loops
/// are rejected at insertion, and node insertion deduplicates by span
/// fingerprint, so the same span registered twice yields one vertex.
#[derive(Default)]
pub struct ChangeGraph {
    graph: DiGraph<Node, Edge>,
    fingerprints: HashMap<SpanFingerprint, NodeIndex>,
}

impl ChangeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning the existing index when the fingerprint is
    /// already present.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.fingerprints.get(node.fingerprint()) {
            return idx;
        }
        let fingerprint = node.fingerprint().clone();
        let idx = self.graph.add_node(node);
        self.fingerprints.insert(fingerprint, idx);
        idx
    }

    #[must_use]
    pub fn find(&self, fingerprint: &SpanFingerprint) -> Option<NodeIndex> {
        self.fingerprints.get(fingerprint).copied()
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.graph[idx]
    }

    /// Insert an edge. Inserting a self-loop is a silent no-op.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: Edge) {
        if source == target {
            return;
        }
        self.graph.add_edge(source, target, edge);
    }

    /// Insert an edge only when `accept` approves it given the edges already
    /// present between the ordered pair.
    pub fn add_edge_if(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        edge: Edge,
        accept: impl FnOnce(&[Edge]) -> bool,
    ) {
        if source == target {
            return;
        }
        let existing: Vec<Edge> = self.edges_between(source, target).copied().collect();
        if accept(&existing) {
            self.graph.add_edge(source, target, edge);
        }
    }

    /// Insert an edge unless an identical one already exists between the pair.
    pub fn add_edge_dedup(&mut self, source: NodeIndex, target: NodeIndex, edge: Edge) {
        self.add_edge_if(source, target, edge, |existing| {
            !existing.contains(&edge)
        });
    }

    /// True when any edge runs from `source` to `target`.
    #[must_use]
    pub fn has_edge_between(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.graph.find_edge(source, target).is_some()
    }

    pub fn edges_between(
        &self,
        source: NodeIndex,
        target: NodeIndex,
    ) -> impl Iterator<Item = &Edge> + '_ {
        self.graph
            .edges(source)
            .filter(move |e| e.target() == target)
            .map(|e| e.weight())
    }

    /// Outgoing neighbors over edges of one type, in insertion order.
    #[must_use]
    pub fn outgoing_by_type(&self, idx: NodeIndex, edge_type: EdgeType) -> Vec<NodeIndex> {
        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().edge_type == edge_type)
            .map(|e| e.target())
            .collect();
        // petgraph iterates outgoing edges newest-first
        targets.reverse();
        targets
    }

    /// Incoming neighbors over edges of one type, in insertion order.
    #[must_use]
    pub fn incoming_by_type(&self, idx: NodeIndex, edge_type: EdgeType) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().edge_type == edge_type)
            .map(|e| e.source())
            .collect();
        sources.reverse();
        sources
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Active node indices, ascending.
    #[must_use]
    pub fn active_nodes(&self) -> Vec<NodeIndex> {
        self.nodes()
            .filter(|(_, node)| node.is_active())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn edge_triples(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Edge)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Absorb another graph: nodes deduplicate by fingerprint, edges by
    /// exact (endpoints, type, weight) equality, so merging is idempotent.
    pub fn merge(&mut self, other: &ChangeGraph) {
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for (idx, node) in other.nodes() {
            mapping.insert(idx, self.add_node(node.clone()));
        }
        for (source, target, edge) in other.edge_triples() {
            if let (Some(&s), Some(&t)) = (mapping.get(&source), mapping.get(&target)) {
                self.add_edge_dedup(s, t, *edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;
    use storyline_syntax::memory::{MemorySource, TreeSpec};

    fn span_node(source: &mut MemorySource, path: &str, kind: NodeKind) -> Node {
        let root = source.add_file(path, "x", TreeSpec::new("statement", 0..1));
        Node::new(root, kind)
    }

    #[test]
    fn identical_fingerprints_yield_one_vertex() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();

        let a = span_node(&mut source, "a.rs", NodeKind::Base);
        let again = a.clone();

        let first = graph.add_node(a);
        let second = graph.add_node(again);
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn self_loops_are_rejected() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let idx = graph.add_node(span_node(&mut source, "a.rs", NodeKind::Base));

        graph.add_edge(idx, idx, Edge::unit(EdgeType::DefUse));
        graph.add_edge_dedup(idx, idx, Edge::unit(EdgeType::Succession));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn context_attachment_is_idempotent() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(span_node(&mut source, "a.rs", NodeKind::Base));
        let b = graph.add_node(span_node(&mut source, "b.rs", NodeKind::Context));

        for _ in 0..2 {
            graph.add_edge_if(a, b, Edge::unit(EdgeType::Context), |existing| {
                !existing.iter().any(|e| e.edge_type == EdgeType::Context)
            });
        }
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn parallel_edges_of_different_types_coexist() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(span_node(&mut source, "a.rs", NodeKind::Base));
        let b = graph.add_node(span_node(&mut source, "b.rs", NodeKind::Base));

        graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
        graph.add_edge(a, b, Edge::unit(EdgeType::Succession));
        assert_eq!(graph.edges_between(a, b).count(), 2);
        assert_eq!(graph.outgoing_by_type(a, EdgeType::DefUse), vec![b]);
        assert_eq!(graph.incoming_by_type(b, EdgeType::Succession), vec![a]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(span_node(&mut source, "a.rs", NodeKind::Base));
        let b = graph.add_node(span_node(&mut source, "b.rs", NodeKind::Base));
        graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));

        let mut other = ChangeGraph::new();
        other.merge(&graph);
        other.merge(&graph);
        assert_eq!(other.node_count(), 2);
        assert_eq!(other.edge_count(), 1);
    }
}
