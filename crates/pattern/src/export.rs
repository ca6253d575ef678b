use crate::pattern::{Pattern, SubGraph};
use crate::render;
use std::collections::HashMap;
use storyline_graph::{
    scoped_id, Cluster, EdgeType, ExportEdge, ExportNode, GraphExport, NodeKind,
};
use storyline_syntax::LanguageConfig;

/// Export a pattern forest as a node/edge view.
///
/// Leaf subgraphs export under their pattern's aggregator id; every pattern
/// contributes one aggregator node, an expansion edge to its lead, and an
/// expansion edge from its parent aggregator. Pass cached descriptions to
/// include them in aggregator contents; without them the view stays fully
/// deterministic.
#[must_use]
pub fn export_patterns(
    patterns: &[Pattern],
    cluster: &Cluster,
    parent: &str,
    config: &LanguageConfig,
    descriptions: Option<&HashMap<String, String>>,
) -> GraphExport {
    let mut out = GraphExport::default();
    for pattern in patterns {
        export_pattern_into(pattern, cluster, parent, config, descriptions, &mut out);
    }
    out
}

fn export_pattern_into(
    pattern: &Pattern,
    cluster: &Cluster,
    parent: &str,
    config: &LanguageConfig,
    descriptions: Option<&HashMap<String, String>>,
    out: &mut GraphExport,
) {
    let id = pattern.id(cluster);

    match pattern {
        Pattern::Composite(composite) => {
            for child in composite.children() {
                export_pattern_into(child, cluster, &id, config, descriptions, out);
            }
        }
        _ => {
            if let Some(sub) = pattern.subgraph() {
                export_subgraph(sub, cluster, &id, config, out);
            }
        }
    }

    let mut contents = Vec::new();
    let rendered = render::render(pattern, cluster, config);
    if !rendered.is_empty() {
        contents.push(rendered);
    }
    if let Some(map) = descriptions {
        if let Some(description) = map.get(&id) {
            contents.push(description.clone());
        }
    }

    out.nodes.push(ExportNode {
        id: id.clone(),
        content: contents.join("\n\n-----\n\n"),
        node_kind: NodeKind::Aggregator,
        aggregator_id: (!parent.is_empty()).then(|| parent.to_string()),
    });

    if let Some(lead) = pattern.lead() {
        let lead_id = scoped_id(&cluster.graph().node(lead).fingerprint().to_string(), &id);
        out.edges.push(ExportEdge {
            source_id: id.clone(),
            target_id: lead_id,
            edge_type: EdgeType::Expansion,
            weight: 1.0,
        });
    }
    if !parent.is_empty() {
        out.edges.push(ExportEdge {
            source_id: parent.to_string(),
            target_id: id,
            edge_type: EdgeType::Expansion,
            weight: 1.0,
        });
    }
}

/// Active members and edges of one leaf subgraph, scoped by aggregator id.
fn export_subgraph(
    sub: &SubGraph,
    cluster: &Cluster,
    aggregator: &str,
    config: &LanguageConfig,
    out: &mut GraphExport,
) {
    let graph = cluster.graph();

    for &idx in sub.members() {
        let node = graph.node(idx);
        if !node.is_active() {
            continue;
        }
        out.nodes.push(ExportNode {
            id: scoped_id(&node.fingerprint().to_string(), aggregator),
            content: node.content(config),
            node_kind: node.kind(),
            aggregator_id: (!aggregator.is_empty()).then(|| aggregator.to_string()),
        });
    }

    for &(source, target, edge) in sub.edges() {
        let source_node = graph.node(source);
        let target_node = graph.node(target);
        if !source_node.is_active() || !target_node.is_active() {
            continue;
        }
        out.edges.push(ExportEdge {
            source_id: scoped_id(&source_node.fingerprint().to_string(), aggregator),
            target_id: scoped_id(&target_node.fingerprint().to_string(), aggregator),
            edge_type: edge.edge_type,
            weight: edge.weight,
        });
    }
}
