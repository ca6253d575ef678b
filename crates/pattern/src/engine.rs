use crate::pattern::{
    Composite, DeclarationPattern, Pattern, ReasonType, SingularPattern, SubGraph,
    SuccessivePattern, UsagePattern,
};
use crate::util;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use storyline_graph::{ChangeGraph, Cluster, Edge, EdgeType, NodeKind};
use storyline_syntax::LanguageConfig;

/// One cluster's pattern forest, bundled with the cluster its node indices
/// refer into.
pub struct ClusterAnalysis {
    pub cluster: Cluster,
    pub patterns: Vec<Pattern>,
}

/// Discovers base patterns in one cluster and iteratively merges them into
/// a hierarchy of composite components.
///
/// Discovery adds usage chains, declaration extensions, successive chains
/// and singleton fallbacks; the merge phase then runs requirement closure,
/// common-node merging and similarity merging, in that order. Every merge
/// replaces at least two top-level components with one, so both merge loops
/// terminate.
pub struct TraversalEngine;

impl TraversalEngine {
    /// Consume a cluster and produce its pattern forest.
    #[must_use]
    pub fn run(cluster: Cluster, config: &LanguageConfig) -> ClusterAnalysis {
        let patterns = {
            let mut state = EngineState::new(cluster.graph(), config);
            state.discover_usages();
            state.discover_declarations();
            state.discover_successions();
            state.discover_singulars();
            state.merge_requirements();
            state.merge_common_nodes();
            state.merge_similarities();
            state.finish()
        };
        log::debug!(
            "cluster of {} nodes produced {} top-level patterns",
            cluster.len(),
            patterns.len()
        );
        ClusterAnalysis { cluster, patterns }
    }
}

struct EngineState<'a> {
    graph: &'a ChangeGraph,
    config: &'a LanguageConfig,
    /// Pattern arena; a slot goes `None` when its pattern is merged away.
    slots: Vec<Option<Pattern>>,
    /// Slot ids of the current top-level patterns, in creation order.
    top: Vec<usize>,
    /// Where merged-away slots ended up, followed transitively.
    redirect: HashMap<usize, usize>,
    /// Nodes at which cyclic usage chains were cut.
    rings: BTreeSet<NodeIndex>,
}

impl<'a> EngineState<'a> {
    fn new(graph: &'a ChangeGraph, config: &'a LanguageConfig) -> Self {
        Self {
            graph,
            config,
            slots: Vec::new(),
            top: Vec::new(),
            redirect: HashMap::new(),
            rings: BTreeSet::new(),
        }
    }

    fn insert(&mut self, pattern: Pattern) -> usize {
        let id = self.slots.len();
        self.slots.push(Some(pattern));
        self.top.push(id);
        id
    }

    fn pattern(&self, id: usize) -> Option<&Pattern> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    fn take(&mut self, id: usize) -> Option<Pattern> {
        self.slots.get_mut(id).and_then(Option::take)
    }

    fn remove_top(&mut self, id: usize) {
        self.top.retain(|&t| t != id);
    }

    fn resolve(&self, mut id: usize) -> usize {
        let mut hops = 0;
        while let Some(&next) = self.redirect.get(&id) {
            id = next;
            hops += 1;
            if hops > self.slots.len() {
                break;
            }
        }
        id
    }

    fn top_vertex_sets(&self) -> Vec<(usize, BTreeSet<NodeIndex>)> {
        self.top
            .iter()
            .copied()
            .filter_map(|id| self.pattern(id).map(|p| (id, p.vertex_set())))
            .collect()
    }

    /// Attach a node's cluster context chain to a pattern subgraph.
    fn attach_context(&self, sub: &mut SubGraph, node: NodeIndex) {
        let mut current = node;
        for context in util::context_chain(self.graph, node) {
            sub.add_context_edge(current, context);
            current = context;
        }
    }

    // ------------------------------------------------------------------
    // Phase A: pattern discovery
    // ------------------------------------------------------------------

    /// Usage chains, seeded from the most-used base declarations.
    fn discover_usages(&mut self) {
        let seeds = util::used_declarations(self.graph, NodeKind::Base);
        let mut memo: HashMap<NodeIndex, usize> = HashMap::new();
        let mut path: Vec<NodeIndex> = Vec::new();
        for seed in seeds {
            self.build_usage(seed, &mut path, &mut memo);
        }
    }

    /// Build one usage pattern rooted at `node`, following def-use edges
    /// backward. A node already on the current path marks the pattern's
    /// ring node and stops the descent; a finished sub-pattern is merged in
    /// when its own ring propagates here, and recorded as a requirement
    /// otherwise, deferring the merge to the closure pass.
    fn build_usage(
        &mut self,
        node: NodeIndex,
        path: &mut Vec<NodeIndex>,
        memo: &mut HashMap<NodeIndex, usize>,
    ) {
        if memo.contains_key(&node) {
            return;
        }

        // reserve the slot so merges can redirect to it right away
        let id = self.slots.len();
        self.slots.push(Some(Pattern::Usage(UsagePattern::default())));

        let mut pattern = UsagePattern::default();
        pattern.sub.add_node(node);
        pattern.use_nodes.insert(node);
        self.attach_context(&mut pattern.sub, node);

        for used in util::used_nodes(self.graph, node) {
            pattern.sub.add_edge(used, node, Edge::unit(EdgeType::DefUse));
            self.attach_context(&mut pattern.sub, used);

            if path.contains(&used) {
                pattern.ring = Some(used);
                self.rings.insert(used);
                continue;
            }
            if !util::does_use(self.graph, used) {
                continue;
            }

            path.push(node);
            self.build_usage(used, path, memo);
            path.pop();

            let Some(&raw) = memo.get(&used) else { continue };
            let used_id = self.resolve(raw);
            if used_id == id {
                continue;
            }
            let used_ring = match self.pattern(used_id) {
                Some(Pattern::Usage(p)) => p.ring,
                _ => continue,
            };

            if let Some(ring) = used_ring {
                if ring != node {
                    pattern.ring = Some(ring);
                }
                if let Some(Pattern::Usage(child)) = self.take(used_id) {
                    pattern.merge(child);
                }
                self.remove_top(used_id);
                self.redirect.insert(used_id, id);
            } else {
                pattern.requirements.push((used, used_id));
            }
        }

        self.slots[id] = Some(Pattern::Usage(pattern));
        self.top.push(id);
        memo.insert(node, id);
    }

    /// One declaration pattern per used extension node.
    fn discover_declarations(&mut self) {
        for anchor in util::used_declarations(self.graph, NodeKind::Extension) {
            let mut pattern = DeclarationPattern {
                sub: SubGraph::default(),
                anchor,
            };
            pattern.sub.add_node(anchor);
            self.attach_context(&mut pattern.sub, anchor);

            for used in util::used_nodes(self.graph, anchor) {
                pattern
                    .sub
                    .add_edge(used, anchor, Edge::unit(EdgeType::DefUse));
                self.attach_context(&mut pattern.sub, used);
            }
            self.insert(Pattern::Declaration(pattern));
        }
    }

    /// Succession chains between changed spans; chains sharing an endpoint
    /// are transitively merged as they are discovered. Type and method
    /// declarations never join a chain.
    fn discover_successions(&mut self) {
        let mut chains: HashMap<NodeIndex, usize> = HashMap::new();
        let accepted: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                !self
                    .config
                    .succession_excluded
                    .contains(self.graph.node(idx).syntax_kind())
            })
            .collect();

        for &node in &accepted {
            let mut incident: Vec<(NodeIndex, NodeIndex)> = Vec::new();
            for target in self.graph.outgoing_by_type(node, EdgeType::Succession) {
                incident.push((node, target));
            }
            for source in self.graph.incoming_by_type(node, EdgeType::Succession) {
                incident.push((source, node));
            }

            for (source, target) in incident {
                if !self.graph.node(source).is_base() || !self.graph.node(target).is_base() {
                    continue;
                }
                let chained_kinds_excluded = [source, target].iter().any(|&endpoint| {
                    self.config
                        .succession_excluded
                        .contains(self.graph.node(endpoint).syntax_kind())
                });
                if chained_kinds_excluded {
                    continue;
                }

                let id = self.slots.len();
                self.slots
                    .push(Some(Pattern::Successive(SuccessivePattern::default())));
                let mut pattern = SuccessivePattern::default();

                for endpoint in [source, target] {
                    let Some(&old_raw) = chains.get(&endpoint) else {
                        continue;
                    };
                    let old = self.resolve(old_raw);
                    if old == id {
                        continue;
                    }
                    if let Some(Pattern::Successive(other)) = self.take(old) {
                        pattern.sub.merge(&other.sub);
                    }
                    self.remove_top(old);
                    self.redirect.insert(old, id);
                }

                pattern
                    .sub
                    .add_edge(source, target, Edge::unit(EdgeType::Succession));
                self.attach_context(&mut pattern.sub, source);
                self.attach_context(&mut pattern.sub, target);

                self.slots[id] = Some(Pattern::Successive(pattern));
                self.top.push(id);
                chains.insert(node, id);
            }
        }
    }

    /// Singleton fallback: configured singular kinds plus any active base
    /// node still covered by no pattern, so every active change ends up in
    /// at least one pattern.
    fn discover_singulars(&mut self) {
        let mut candidates: Vec<NodeIndex> = self
            .graph
            .nodes()
            .filter(|(_, node)| {
                !node.is_context() && self.config.singular_kinds.contains(node.syntax_kind())
            })
            .map(|(idx, _)| idx)
            .collect();
        for (idx, node) in self.graph.nodes() {
            if node.is_base() && node.is_active() && !candidates.contains(&idx) {
                candidates.push(idx);
            }
        }

        for idx in candidates {
            let covered = self
                .top
                .iter()
                .any(|&id| self.pattern(id).is_some_and(|p| p.contains(idx)));
            if covered {
                continue;
            }
            let mut pattern = SingularPattern {
                sub: SubGraph::default(),
                node: idx,
            };
            pattern.sub.add_node(idx);
            self.attach_context(&mut pattern.sub, idx);
            self.insert(Pattern::Singular(pattern));
        }
    }

    // ------------------------------------------------------------------
    // Phase B: iterative merges
    // ------------------------------------------------------------------

    /// Wrap every usage pattern with outstanding requirements, together
    /// with its (already-closed) requirement patterns, into a composite.
    /// Requirements are resolved depth-first, so no composite depends on a
    /// requirement that has not itself been flattened.
    fn merge_requirements(&mut self) {
        let usage_ids: Vec<usize> = self
            .top
            .iter()
            .copied()
            .filter(|&id| matches!(self.pattern(id), Some(Pattern::Usage(_))))
            .collect();
        let mut closed: HashMap<usize, usize> = HashMap::new();
        for id in usage_ids {
            self.close_requirements(id, &mut closed);
        }
    }

    fn close_requirements(&mut self, id: usize, closed: &mut HashMap<usize, usize>) {
        if closed.contains_key(&id) {
            return;
        }

        let requirements: Vec<(NodeIndex, usize)> = match self.pattern(id) {
            Some(Pattern::Usage(p)) => p.requirements.clone(),
            _ => return,
        };
        if requirements.is_empty() {
            closed.insert(id, id);
            return;
        }

        for &(_, raw) in &requirements {
            let requirement = self.resolve(raw);
            if requirement == id || closed.contains_key(&requirement) {
                continue;
            }
            let open = matches!(
                self.pattern(requirement),
                Some(Pattern::Usage(p)) if !p.requirements.is_empty()
            );
            if open {
                self.close_requirements(requirement, closed);
            }
        }

        // current owners of every requirement, then the pattern itself
        let mut member_ids: Vec<usize> = Vec::new();
        for &(_, raw) in &requirements {
            let owner = self.resolve(raw);
            if owner != id && !member_ids.contains(&owner) && self.pattern(owner).is_some() {
                member_ids.push(owner);
            }
        }
        member_ids.push(id);

        let reason: BTreeSet<NodeIndex> = requirements.iter().map(|&(node, _)| node).collect();
        let mut children = Vec::new();
        for &member in &member_ids {
            if let Some(child) = self.take(member) {
                children.push(child);
            }
            self.remove_top(member);
        }

        let composite_id = self.insert(Pattern::Composite(Composite {
            children,
            reason,
            reason_type: ReasonType::Requirement,
        }));
        for member in member_ids {
            self.redirect.insert(member, composite_id);
            closed.insert(member, composite_id);
        }
    }

    /// Repeatedly wrap the components sharing the largest set of common
    /// non-context nodes until no two components overlap. The first pair
    /// reaching the maximum in scan order wins ties.
    fn merge_common_nodes(&mut self) {
        loop {
            let snapshot = self.top_vertex_sets();

            let mut best: Option<BTreeSet<NodeIndex>> = None;
            for i in 0..snapshot.len() {
                for j in (i + 1)..snapshot.len() {
                    let common: BTreeSet<NodeIndex> = snapshot[i]
                        .1
                        .intersection(&snapshot[j].1)
                        .copied()
                        .filter(|&node| !self.graph.node(node).is_context())
                        .collect();
                    if common.is_empty() {
                        continue;
                    }
                    if best.as_ref().is_some_and(|b| b.len() >= common.len()) {
                        continue;
                    }
                    best = Some(common);
                }
            }
            let Some(reason) = best else { break };

            // every component containing the whole shared set joins the merge
            let member_ids: Vec<usize> = snapshot
                .iter()
                .filter(|(_, set)| reason.iter().all(|node| set.contains(node)))
                .map(|&(id, _)| id)
                .collect();
            if member_ids.len() < 2 {
                break;
            }

            let mut children = Vec::new();
            for &member in &member_ids {
                if let Some(child) = self.take(member) {
                    children.push(child);
                }
                self.remove_top(member);
            }
            let composite_id = self.insert(Pattern::Composite(Composite {
                children,
                reason,
                reason_type: ReasonType::Common,
            }));
            for member in member_ids {
                self.redirect.insert(member, composite_id);
            }
        }
    }

    /// Repeatedly pick the similarity-source node set whose targets land in
    /// the same components, largest contributing set first, and wrap the
    /// source component with every common target component.
    fn merge_similarities(&mut self) {
        let pairs: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_triples()
            .filter(|(_, _, edge)| edge.edge_type == EdgeType::Similarity)
            .map(|(source, target, _)| (source, target))
            .collect();
        if pairs.is_empty() {
            return;
        }

        loop {
            let snapshot = self.top_vertex_sets();
            let containing = |node: NodeIndex| -> Vec<usize> {
                snapshot
                    .iter()
                    .filter(|(_, set)| set.contains(&node))
                    .map(|&(id, _)| id)
                    .collect()
            };

            // (source component, target component) -> contributing sources
            let mut votes: BTreeMap<(usize, usize), Vec<NodeIndex>> = BTreeMap::new();
            for &(left, right) in &pairs {
                for &lc in &containing(left) {
                    for &rc in &containing(right) {
                        if lc != rc {
                            votes.entry((lc, rc)).or_default().push(left);
                        }
                    }
                }
            }

            let mut best: Option<((usize, usize), Vec<NodeIndex>)> = None;
            for (&key, sources) in &votes {
                if best
                    .as_ref()
                    .is_some_and(|(_, b)| sources.len() <= b.len())
                {
                    continue;
                }
                best = Some((key, sources.clone()));
            }
            let Some(((source_component, _), sources)) = best else {
                break;
            };

            // components receiving similarity from every contributing source
            let reason: BTreeSet<NodeIndex> = sources.into_iter().collect();
            let mut commons: Option<BTreeSet<usize>> = None;
            for &source in &reason {
                let mut target_components: BTreeSet<usize> = BTreeSet::new();
                for target in self.graph.outgoing_by_type(source, EdgeType::Similarity) {
                    target_components.extend(containing(target));
                }
                commons = Some(match commons {
                    None => target_components,
                    Some(previous) => previous
                        .intersection(&target_components)
                        .copied()
                        .collect(),
                });
            }

            let mut member_ids: Vec<usize> = commons.unwrap_or_default().into_iter().collect();
            if !member_ids.contains(&source_component) {
                member_ids.push(source_component);
            }
            if member_ids.len() < 2 {
                break;
            }

            let mut children = Vec::new();
            for &member in &member_ids {
                if let Some(child) = self.take(member) {
                    children.push(child);
                }
                self.remove_top(member);
            }
            let composite_id = self.insert(Pattern::Composite(Composite {
                children,
                reason,
                reason_type: ReasonType::Similar,
            }));
            for member in member_ids {
                self.redirect.insert(member, composite_id);
            }
        }
    }

    fn finish(mut self) -> Vec<Pattern> {
        let ids = self.top.clone();
        ids.into_iter()
            .filter_map(|id| self.slots.get_mut(id).and_then(Option::take))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storyline_graph::{ChangeGraph, Clusterer, Node};
    use storyline_syntax::memory::{MemorySource, TreeSpec};
    use storyline_syntax::SyntaxSpan;

    fn statement_node(source: &mut MemorySource, name: &str) -> Node {
        let span: Arc<dyn SyntaxSpan> = source.add_file(
            &format!("{name}.java"),
            "s",
            TreeSpec::new("expression_statement", 0..1),
        );
        Node::new(span, NodeKind::Base)
    }

    fn single_cluster(graph: &ChangeGraph) -> Cluster {
        let mut clusters = Clusterer::new(graph).into_clusters();
        assert_eq!(clusters.len(), 1);
        clusters.remove(0)
    }

    #[test]
    fn cyclic_usage_chains_terminate_with_one_ring_node() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(statement_node(&mut source, "A"));
        let b = graph.add_node(statement_node(&mut source, "B"));
        let c = graph.add_node(statement_node(&mut source, "C"));

        // "X uses Y" is an edge Y -> X
        graph.add_edge(b, a, Edge::unit(EdgeType::DefUse));
        graph.add_edge(c, b, Edge::unit(EdgeType::DefUse));
        graph.add_edge(a, c, Edge::unit(EdgeType::DefUse));

        let cluster = single_cluster(&graph);
        let config = LanguageConfig::default();
        let mut state = EngineState::new(cluster.graph(), &config);
        state.discover_usages();

        // exactly one node on the cycle carries the cut
        assert_eq!(state.rings.len(), 1);

        // and the cycle collapses into one pattern covering all three nodes
        let patterns = state.finish();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].vertex_set().len(), 3);
    }

    #[test]
    fn common_node_merging_converges() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(statement_node(&mut source, "A"));
        let b = graph.add_node(statement_node(&mut source, "B"));
        let c = graph.add_node(statement_node(&mut source, "C"));
        graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));
        graph.add_edge(b, c, Edge::unit(EdgeType::DefUse));

        let cluster = single_cluster(&graph);
        let config = LanguageConfig::default();
        let mut state = EngineState::new(cluster.graph(), &config);
        let cluster_nodes: Vec<NodeIndex> = cluster.graph().node_indices().collect();
        let (ca, cb, cc) = (cluster_nodes[0], cluster_nodes[1], cluster_nodes[2]);

        for members in [vec![ca], vec![ca, cb], vec![cb, cc]] {
            let mut sub = SubGraph::default();
            for member in members {
                sub.add_node(member);
            }
            let node = *sub.members().iter().next().expect("member");
            state.insert(Pattern::Singular(SingularPattern { sub, node }));
        }

        state.merge_common_nodes();
        let patterns = state.finish();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].reason_type(), Some(ReasonType::Common));
        assert_eq!(patterns[0].vertex_set().len(), 3);
    }

    #[test]
    fn common_node_merging_is_a_no_op_without_overlap() {
        let mut source = MemorySource::new();
        let mut graph = ChangeGraph::new();
        let a = graph.add_node(statement_node(&mut source, "A"));
        let b = graph.add_node(statement_node(&mut source, "B"));
        graph.add_edge(a, b, Edge::unit(EdgeType::DefUse));

        let cluster = single_cluster(&graph);
        let config = LanguageConfig::default();
        let mut state = EngineState::new(cluster.graph(), &config);
        let cluster_nodes: Vec<NodeIndex> = cluster.graph().node_indices().collect();

        for &member in &cluster_nodes {
            let mut sub = SubGraph::default();
            sub.add_node(member);
            state.insert(Pattern::Singular(SingularPattern { sub, node: member }));
        }

        state.merge_common_nodes();
        assert_eq!(state.finish().len(), 2);
    }
}
