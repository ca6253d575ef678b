use petgraph::graph::NodeIndex;
use std::collections::BTreeSet;
use storyline_graph::{Cluster, Edge, EdgeType};

/// Arena-indexed subgraph over one cluster: member node indices plus the
/// pattern's own copy of the edges among them.
///
/// Indices refer into the owning cluster's graph; patterns never allocate
/// nodes of their own. Self-loops and exact duplicate edges are rejected.
#[derive(Debug, Clone, Default)]
pub struct SubGraph {
    members: BTreeSet<NodeIndex>,
    edges: Vec<(NodeIndex, NodeIndex, Edge)>,
}

impl SubGraph {
    pub fn add_node(&mut self, node: NodeIndex) {
        self.members.insert(node);
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: Edge) {
        if source == target {
            return;
        }
        self.members.insert(source);
        self.members.insert(target);
        let duplicate = self
            .edges
            .iter()
            .any(|(s, t, e)| *s == source && *t == target && *e == edge);
        if !duplicate {
            self.edges.push((source, target, edge));
        }
    }

    /// Insert a context edge only when the ordered pair has none yet.
    pub fn add_context_edge(&mut self, source: NodeIndex, target: NodeIndex) {
        if source == target {
            return;
        }
        self.members.insert(source);
        self.members.insert(target);
        let present = self.edges.iter().any(|(s, t, e)| {
            *s == source && *t == target && e.edge_type == EdgeType::Context
        });
        if !present {
            self.edges.push((source, target, Edge::unit(EdgeType::Context)));
        }
    }

    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.members.contains(&node)
    }

    #[must_use]
    pub fn members(&self) -> &BTreeSet<NodeIndex> {
        &self.members
    }

    #[must_use]
    pub fn edges(&self) -> &[(NodeIndex, NodeIndex, Edge)] {
        &self.edges
    }

    pub fn merge(&mut self, other: &SubGraph) {
        for &node in &other.members {
            self.members.insert(node);
        }
        for &(source, target, edge) in &other.edges {
            self.add_edge(source, target, edge);
        }
    }

    #[must_use]
    pub fn outgoing_by_type(&self, node: NodeIndex, edge_type: EdgeType) -> Vec<NodeIndex> {
        self.edges
            .iter()
            .filter(|(s, _, e)| *s == node && e.edge_type == edge_type)
            .map(|(_, t, _)| *t)
            .collect()
    }

    #[must_use]
    pub fn incoming_by_type(&self, node: NodeIndex, edge_type: EdgeType) -> Vec<NodeIndex> {
        self.edges
            .iter()
            .filter(|(_, t, e)| *t == node && e.edge_type == edge_type)
            .map(|(s, _, _)| *s)
            .collect()
    }
}

/// Why a composite's children were merged into one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonType {
    /// The children share a set of non-context nodes.
    Common,
    /// Nodes of one child are structurally similar to nodes of the others.
    Similar,
    /// One child is a usage chain the others depend on.
    Requirement,
}

impl ReasonType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Similar => "similar",
            Self::Requirement => "requirement",
        }
    }
}

/// A chain of declarations and their uses rooted at one declaration node.
#[derive(Debug, Clone, Default)]
pub struct UsagePattern {
    pub(crate) sub: SubGraph,
    pub(crate) use_nodes: BTreeSet<NodeIndex>,
    /// Usage chains this pattern depends on but has not merged:
    /// `(anchor node, pattern slot)`. Drained by the requirement closure.
    pub(crate) requirements: Vec<(NodeIndex, usize)>,
    /// Node at which a cyclic usage chain was cut.
    pub(crate) ring: Option<NodeIndex>,
}

impl UsagePattern {
    pub(crate) fn merge(&mut self, other: UsagePattern) {
        self.sub.merge(&other.sub);
        self.use_nodes.extend(other.use_nodes);
        for requirement in other.requirements {
            if !self.requirements.iter().any(|(node, _)| *node == requirement.0) {
                self.requirements.push(requirement);
            }
        }
    }

    #[must_use]
    pub fn ring_node(&self) -> Option<NodeIndex> {
        self.ring
    }

    #[must_use]
    pub fn use_nodes(&self) -> &BTreeSet<NodeIndex> {
        &self.use_nodes
    }
}

/// An out-of-diff declaration (extension node) linked to the changed nodes
/// that use it.
#[derive(Debug, Clone)]
pub struct DeclarationPattern {
    pub(crate) sub: SubGraph,
    pub(crate) anchor: NodeIndex,
}

impl DeclarationPattern {
    #[must_use]
    pub fn anchor(&self) -> NodeIndex {
        self.anchor
    }
}

/// A chain of adjacent changed spans linked by succession edges.
#[derive(Debug, Clone, Default)]
pub struct SuccessivePattern {
    pub(crate) sub: SubGraph,
}

impl SuccessivePattern {
    /// First node of the chain: the member without incoming edges.
    #[must_use]
    pub fn head(&self) -> Option<NodeIndex> {
        self.sub
            .members()
            .iter()
            .copied()
            .find(|&node| !self.sub.edges().iter().any(|(_, target, _)| *target == node))
    }

    /// Chain members in succession order, starting at the head.
    #[must_use]
    pub fn chain(&self) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let Some(head) = self.head() else {
            return out;
        };
        out.push(head);
        let mut current = head;
        loop {
            let next = self
                .sub
                .outgoing_by_type(current, EdgeType::Succession)
                .first()
                .copied();
            let Some(next) = next else { break };
            if out.contains(&next) {
                break;
            }
            out.push(next);
            current = next;
        }
        out
    }
}

/// Fallback for a changed node covered by no other pattern.
#[derive(Debug, Clone)]
pub struct SingularPattern {
    pub(crate) sub: SubGraph,
    pub(crate) node: NodeIndex,
}

impl SingularPattern {
    #[must_use]
    pub fn node(&self) -> NodeIndex {
        self.node
    }
}

/// Merge of two or more patterns, with the node set justifying the merge.
#[derive(Debug)]
pub struct Composite {
    pub(crate) children: Vec<Pattern>,
    pub(crate) reason: BTreeSet<NodeIndex>,
    pub(crate) reason_type: ReasonType,
}

impl Composite {
    #[must_use]
    pub fn children(&self) -> &[Pattern] {
        &self.children
    }

    #[must_use]
    pub fn reason(&self) -> &BTreeSet<NodeIndex> {
        &self.reason
    }

    #[must_use]
    pub fn reason_type(&self) -> ReasonType {
        self.reason_type
    }
}

/// A named subgraph-with-identity produced by the traversal engine.
///
/// Leaf patterns hold their own subgraph; a composite owns its children and
/// exposes the union of their vertex sets plus its reason set.
#[derive(Debug)]
pub enum Pattern {
    Usage(UsagePattern),
    Declaration(DeclarationPattern),
    Successive(SuccessivePattern),
    Singular(SingularPattern),
    Composite(Composite),
}

impl Pattern {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::Declaration(_) => "declaration",
            Self::Successive(_) => "successive",
            Self::Singular(_) => "singular",
            Self::Composite(_) => "composite",
        }
    }

    /// Leaf subgraph, when this is not a composite.
    #[must_use]
    pub fn subgraph(&self) -> Option<&SubGraph> {
        match self {
            Self::Usage(p) => Some(&p.sub),
            Self::Declaration(p) => Some(&p.sub),
            Self::Successive(p) => Some(&p.sub),
            Self::Singular(p) => Some(&p.sub),
            Self::Composite(_) => None,
        }
    }

    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        match self {
            Self::Composite(c) => {
                c.reason.contains(&node) || c.children.iter().any(|child| child.contains(node))
            }
            _ => self.subgraph().is_some_and(|sub| sub.contains(node)),
        }
    }

    #[must_use]
    pub fn vertex_set(&self) -> BTreeSet<NodeIndex> {
        match self {
            Self::Composite(c) => {
                let mut set = c.reason.clone();
                for child in &c.children {
                    set.extend(child.vertex_set());
                }
                set
            }
            _ => self
                .subgraph()
                .map(|sub| sub.members().clone())
                .unwrap_or_default(),
        }
    }

    /// Representative vertex, stable for a given pattern: usage patterns
    /// pick their smallest use node, composites the smallest reason node
    /// (falling back to the first child's lead).
    #[must_use]
    pub fn lead(&self) -> Option<NodeIndex> {
        match self {
            Self::Usage(p) => p
                .use_nodes
                .iter()
                .next()
                .copied()
                .or_else(|| p.sub.members().iter().next().copied()),
            Self::Declaration(p) => Some(p.anchor),
            Self::Successive(p) => p.head(),
            Self::Singular(p) => Some(p.node),
            Self::Composite(c) => c
                .reason
                .iter()
                .next()
                .copied()
                .or_else(|| c.children.first().and_then(Pattern::lead)),
        }
    }

    /// Stable identifier: kind name plus the lead node's fingerprint.
    #[must_use]
    pub fn id(&self, cluster: &Cluster) -> String {
        match self.lead() {
            Some(lead) => format!(
                "{}-{}",
                self.kind_name(),
                cluster.graph().node(lead).fingerprint()
            ),
            None => self.kind_name().to_string(),
        }
    }

    #[must_use]
    pub fn reason_type(&self) -> Option<ReasonType> {
        match self {
            Self::Composite(c) => Some(c.reason_type),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Pattern] {
        match self {
            Self::Composite(c) => &c.children,
            _ => &[],
        }
    }
}
