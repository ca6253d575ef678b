use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};
use storyline_graph::{ChangeGraph, EdgeType, NodeKind};

/// Nodes of the given kind ranked by how many base nodes use them,
/// most-used first; ties break on ascending node index.
pub(crate) fn used_declarations(graph: &ChangeGraph, kind: NodeKind) -> Vec<NodeIndex> {
    let mut ranked: Vec<(NodeIndex, usize)> = graph
        .nodes()
        .filter(|(_, node)| !node.is_context() && node.kind() == kind)
        .filter_map(|(idx, _)| {
            let count = graph
                .incoming_by_type(idx, EdgeType::DefUse)
                .into_iter()
                .filter(|&source| graph.node(source).is_base())
                .count();
            (count > 0).then_some((idx, count))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(idx, _)| idx).collect()
}

/// Declarations this node uses: sources of its incoming def-use edges.
pub(crate) fn used_nodes(graph: &ChangeGraph, node: NodeIndex) -> BTreeSet<NodeIndex> {
    graph
        .incoming_by_type(node, EdgeType::DefUse)
        .into_iter()
        .collect()
}

pub(crate) fn does_use(graph: &ChangeGraph, node: NodeIndex) -> bool {
    !graph.incoming_by_type(node, EdgeType::DefUse).is_empty()
}

/// Context chain of a node: follow the outgoing context edge upward until
/// the chain ends.
pub(crate) fn context_chain(graph: &ChangeGraph, node: NodeIndex) -> Vec<NodeIndex> {
    let mut chain = Vec::new();
    let mut current = node;
    loop {
        let next = graph
            .outgoing_by_type(current, EdgeType::Context)
            .first()
            .copied();
        let Some(next) = next else { break };
        if next == node || chain.contains(&next) {
            break;
        }
        chain.push(next);
        current = next;
    }
    chain
}

/// Group nodes under every context on their chains: context -> the nodes
/// (or nearer contexts) sitting directly beneath it.
pub(crate) fn context_groups(
    graph: &ChangeGraph,
    nodes: &[NodeIndex],
) -> BTreeMap<NodeIndex, Vec<NodeIndex>> {
    let mut groups: BTreeMap<NodeIndex, Vec<NodeIndex>> = BTreeMap::new();
    for &node in nodes {
        let mut current = node;
        for context in context_chain(graph, node) {
            let entry = groups.entry(context).or_default();
            if !entry.contains(&current) {
                entry.push(current);
            }
            current = context;
        }
    }
    groups
}
