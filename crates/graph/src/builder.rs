use crate::error::Result;
use crate::{ChangeGraph, Edge, EdgeType, Node, NodeKind};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use std::sync::Arc;
use storyline_syntax::{
    self_or_ancestor_of_kind, CollaboratorError, EditDistance, LanguageConfig, SemanticModel,
    SourceLocation, SpanResolver, SyntaxSpan,
};

/// Drop spans nested inside another span of the set; only maximal added
/// spans seed the graph. Duplicate spans keep their first occurrence.
#[must_use]
pub fn maximal_spans(spans: Vec<Arc<dyn SyntaxSpan>>) -> Vec<Arc<dyn SyntaxSpan>> {
    let mut result: Vec<Arc<dyn SyntaxSpan>> = Vec::new();
    for (i, subject) in spans.iter().enumerate() {
        let nested = spans.iter().enumerate().any(|(j, object)| {
            if i == j || subject.file() != object.file() {
                return false;
            }
            let contains = object.start() <= subject.start() && subject.end() <= object.end();
            let same = object.start() == subject.start() && object.end() == subject.end();
            contains && (!same || j < i)
        });
        if !nested {
            result.push(subject.clone());
        }
    }
    result
}

/// Builds the typed change multigraph from the maximal added spans of one
/// commit plus facts supplied by the semantic-model collaborator.
///
/// Passes run in a fixed order because later passes depend on nodes created
/// by earlier ones. A lookup that resolves to nothing skips that single
/// edge and never aborts the pass.
pub struct GraphBuilder<'a> {
    graph: ChangeGraph,
    config: Arc<LanguageConfig>,
    resolver: &'a dyn SpanResolver,
    model: &'a dyn SemanticModel,
    metric: &'a dyn EditDistance,
}

impl<'a> GraphBuilder<'a> {
    #[must_use]
    pub fn new(
        config: Arc<LanguageConfig>,
        resolver: &'a dyn SpanResolver,
        model: &'a dyn SemanticModel,
        metric: &'a dyn EditDistance,
    ) -> Self {
        Self {
            graph: ChangeGraph::new(),
            config,
            resolver,
            model,
            metric,
        }
    }

    /// Register one maximal added span as a base node, attaching its
    /// context ancestor chain.
    pub fn add_change(&mut self, span: Arc<dyn SyntaxSpan>) -> NodeIndex {
        self.add_span_node(span, NodeKind::Base)
    }

    /// Run all linking passes and hand over the finished graph.
    pub fn build(mut self) -> Result<ChangeGraph> {
        self.link_def_use()?;
        self.link_instantiations()?;
        self.flag_dead_code();
        self.link_similarity()?;
        self.link_succession();
        self.rescan_context_methods()?;

        log::info!(
            "built change graph: {} nodes, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        Ok(self.graph)
    }

    /// Insert a node and walk its ancestor chain, chaining a context node
    /// for every whitelisted ancestor kind. Re-registering a span is
    /// idempotent, including its context edges.
    fn add_span_node(&mut self, span: Arc<dyn SyntaxSpan>, kind: NodeKind) -> NodeIndex {
        let idx = self.graph.add_node(Node::new(span.clone(), kind));

        let mut last = idx;
        for ancestor in span.ancestors() {
            if !self.config.context_ancestors.contains(ancestor.kind()) {
                continue;
            }
            let ctx = self.graph.add_node(Node::new(ancestor, NodeKind::Context));
            if last != ctx && !self.graph.has_edge_between(last, ctx) {
                self.graph.add_edge(last, ctx, Edge::unit(EdgeType::Context));
            }
            last = ctx;
        }

        idx
    }

    /// Pass 1: def-use edges from declarations inside each changed span to
    /// the nodes using them, plus invocation edges for declared methods.
    fn link_def_use(&mut self) -> Result<()> {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in nodes {
            if self.graph.node(idx).is_context() {
                continue;
            }
            let span = self.graph.node(idx).span().clone();

            if self.config.inactive_kinds.contains(span.kind()) {
                self.graph.node_mut(idx).set_active(false);
                continue;
            }

            let mut sub: Vec<Arc<dyn SyntaxSpan>> = vec![span.clone()];
            sub.extend(span.descendants());

            let mut methods = Vec::new();
            let mut fields = Vec::new();
            let mut parameters = Vec::new();
            let mut variables = Vec::new();
            for candidate in &sub {
                let kind = candidate.kind();
                if kind == self.config.method_declaration {
                    methods.push(candidate.clone());
                } else if kind == self.config.field_declaration {
                    fields.push(candidate.clone());
                } else if kind == self.config.parameter_declaration {
                    parameters.push(candidate.clone());
                } else if kind == self.config.variable_statement {
                    variables.push(candidate.clone());
                }
            }
            if methods.is_empty()
                && fields.is_empty()
                && parameters.is_empty()
                && variables.is_empty()
            {
                continue;
            }

            // a parameter nested in a collected method is reported with the
            // method, not on its own
            for method in &methods {
                for descendant in method.descendants() {
                    if descendant.kind() == self.config.parameter_declaration {
                        parameters.retain(|p| p.location() != descendant.location());
                    }
                }
            }

            if self_or_ancestor_of_kind(&span, &self.config.type_declaration).is_none() {
                // out-of-type span, no declaration facts to resolve
                continue;
            }

            for method in &methods {
                self.link_invocations(idx, &method.location())?;
            }
            for field in &fields {
                self.link_uses(idx, &field.location())?;
            }
            for parameter in &parameters {
                self.link_variable_declaration(idx, parameter)?;
            }
            for variable in &variables {
                let Some(fragment) = variable.descendant_of_kind(&self.config.variable_fragment)
                else {
                    continue;
                };
                self.link_variable_declaration(idx, &fragment)?;
            }
        }

        log::debug!("def-use pass complete: {} edges", self.graph.edge_count());
        Ok(())
    }

    /// Pass 2: link instantiation expressions to the declaration node of
    /// the instantiated type, resolved by name suffix.
    fn link_instantiations(&mut self) -> Result<()> {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in nodes {
            if self.graph.node(idx).is_context() {
                continue;
            }
            let span = self.graph.node(idx).span().clone();

            let mut sub: Vec<Arc<dyn SyntaxSpan>> = vec![span.clone()];
            sub.extend(span.descendants());

            for creation in sub.into_iter().filter(|s| s.kind() == self.config.instantiation) {
                let Some(class_type) = creation.descendant_of_kind(&self.config.simple_type)
                else {
                    continue;
                };
                let Some(class_name) = class_type.descendant_of_kind(&self.config.name) else {
                    continue;
                };

                let classes = self.model.classes_by_name_suffix(&class_name.text())?;
                let Some(class) = classes.first() else {
                    continue;
                };

                for target in self.overlapping_nodes(&class.declaration) {
                    if self.graph.node(target).syntax_kind() != self.config.type_declaration {
                        continue;
                    }
                    self.graph.add_edge(idx, target, Edge::unit(EdgeType::DefUse));
                }
            }
        }
        Ok(())
    }

    /// Pass 3: deactivate nodes whose kind carries no explanatory value.
    fn flag_dead_code(&mut self) {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in nodes {
            if self
                .config
                .inactive_kinds
                .contains(self.graph.node(idx).syntax_kind())
            {
                self.graph.node_mut(idx).set_active(false);
            }
        }
    }

    /// Pass 4: similarity edges between structurally near non-context
    /// nodes. Distances for all pairs are computed in parallel; edge
    /// insertion is one sequential pass over the results.
    fn link_similarity(&mut self) -> Result<()> {
        let spans: Vec<(NodeIndex, Arc<dyn SyntaxSpan>)> = self
            .graph
            .nodes()
            .filter(|(_, node)| !node.is_context())
            .map(|(idx, node)| (idx, node.span().clone()))
            .collect();

        let pairs: Vec<(usize, usize)> = (0..spans.len())
            .flat_map(|i| ((i + 1)..spans.len()).map(move |j| (i, j)))
            .collect();

        let metric = self.metric;
        let measured: Vec<std::result::Result<(NodeIndex, NodeIndex, f32), CollaboratorError>> =
            pairs
                .par_iter()
                .map(|&(i, j)| {
                    let distance = metric.distance(spans[i].1.as_ref(), spans[j].1.as_ref())?;
                    Ok((spans[i].0, spans[j].0, distance))
                })
                .collect();

        let threshold = self.config.similarity_threshold;
        for item in measured {
            let (a, b, distance) = item?;
            if distance <= threshold {
                let edge = Edge::new(EdgeType::Similarity, 1.0 / (distance + 1.0));
                self.graph.add_edge(a, b, edge);
                self.graph.add_edge(b, a, edge);
            }
        }
        Ok(())
    }

    /// Pass 5: succession edges to the node wrapping each span's immediate
    /// right sibling.
    fn link_succession(&mut self) {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for &idx in &nodes {
            let Some(sibling) = self.graph.node(idx).span().right_sibling() else {
                continue;
            };
            let sibling_fingerprint = sibling.fingerprint();
            for &candidate in &nodes {
                if *self.graph.node(candidate).fingerprint() == sibling_fingerprint {
                    self.graph
                        .add_edge(idx, candidate, Edge::unit(EdgeType::Succession));
                }
            }
        }
    }

    /// Pass 6: a changed method body can use members of a method whose
    /// signature is only present as a context node; re-run invocation
    /// linking against method-declaration context nodes.
    fn rescan_context_methods(&mut self) -> Result<()> {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in nodes {
            let node = self.graph.node(idx);
            if !node.is_context() || node.syntax_kind() != self.config.method_declaration {
                continue;
            }
            let span = node.span().clone();
            if self_or_ancestor_of_kind(&span, &self.config.type_declaration).is_none() {
                continue;
            }
            self.link_invocations(idx, &span.location())?;
        }
        Ok(())
    }

    /// Def-use edges from a declaring node to every node overlapping a use
    /// of the declaration. When the declaration changed but no use did, one
    /// extension node is synthesized at the closest use site resolvable in
    /// the change set.
    fn link_uses(&mut self, idx: NodeIndex, declaration: &SourceLocation) -> Result<()> {
        let uses = self.model.find_uses(declaration)?;

        let mut found = false;
        for site in &uses {
            for target in self.overlapping_nodes(site) {
                if self.graph.node(target).is_context() {
                    continue;
                }
                found = true;
                self.graph.add_edge(idx, target, Edge::unit(EdgeType::DefUse));
            }
        }
        if found {
            return Ok(());
        }

        // declaration change without any visible usage change
        let mut candidates: Vec<(SourceLocation, Arc<dyn SyntaxSpan>)> = Vec::new();
        for site in uses {
            if let Some(span) = self.resolver.resolve(&site)? {
                candidates.push((site, span));
            }
        }
        if candidates.is_empty() {
            return Ok(());
        }

        let chosen = closest_candidate(declaration, &candidates);
        let span = candidates[chosen].1.clone();
        let ext = self.add_span_node(span, NodeKind::Extension);
        self.graph.add_edge(idx, ext, Edge::unit(EdgeType::DefUse));
        Ok(())
    }

    /// Def-use edges from a declaring node to every node overlapping an
    /// invocation of the given method.
    fn link_invocations(&mut self, idx: NodeIndex, method: &SourceLocation) -> Result<()> {
        for site in self.model.find_invocations(method)? {
            for target in self.overlapping_nodes(&site) {
                if self.graph.node(target).is_context() {
                    continue;
                }
                self.graph.add_edge(idx, target, Edge::unit(EdgeType::DefUse));
            }
        }
        Ok(())
    }

    /// Use linking for one variable or parameter declaration, plus
    /// extension nodes for declarations of calls made by its initializer.
    fn link_variable_declaration(
        &mut self,
        idx: NodeIndex,
        declaration: &Arc<dyn SyntaxSpan>,
    ) -> Result<()> {
        let Some(method) = self_or_ancestor_of_kind(declaration, &self.config.method_declaration)
        else {
            // a declaration outside any method body has no scope to query
            return Ok(());
        };

        let declaration_location = declaration.location();
        self.link_uses(idx, &declaration_location)?;

        for call in self.model.calls_in_initializer(&declaration_location)? {
            let Some(target) = self.model.find_declaration(&method.location(), &call)? else {
                continue;
            };
            let Some(span) = self.resolver.resolve(&target)? else {
                continue;
            };
            let ext = self.add_span_node(span, NodeKind::Extension);
            self.graph.add_edge(ext, idx, Edge::unit(EdgeType::DefUse));
        }
        Ok(())
    }

    fn overlapping_nodes(&self, location: &SourceLocation) -> Vec<NodeIndex> {
        self.graph
            .nodes()
            .filter(|(_, node)| node.location().overlaps(location))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Index of the candidate closest to `subject`: same-file candidates first
/// (an overlapping one wins immediately, then smallest gap, first wins on
/// ties); with no same-file candidate, the first candidate is acceptable.
fn closest_candidate(
    subject: &SourceLocation,
    candidates: &[(SourceLocation, Arc<dyn SyntaxSpan>)],
) -> usize {
    let same_file: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, (location, _))| location.file == subject.file)
        .map(|(i, _)| i)
        .collect();
    if same_file.is_empty() {
        return 0;
    }

    let mut best = same_file[0];
    let mut best_distance = usize::MAX;
    for i in same_file {
        let location = &candidates[i].0;
        if subject.overlaps(location) {
            return i;
        }
        let distance = subject.distance_to(location);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}
