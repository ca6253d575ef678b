use crate::error::Result;
use crate::{ChangeGraph, EdgeType, NodeKind};
use serde::{Deserialize, Serialize};
use storyline_syntax::LanguageConfig;

/// One node of the export view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: String,
    pub content: String,
    pub node_kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator_id: Option<String>,
}

/// One edge of the export view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub weight: f32,
}

/// Serializable view over a graph or a composite hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl GraphExport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn extend(&mut self, other: GraphExport) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

/// Node id within an aggregator scope: the fingerprint display form,
/// suffixed by the aggregator id when one applies. The same node may appear
/// inside different composites under distinct scoped ids.
#[must_use]
pub fn scoped_id(id: &str, aggregator: &str) -> String {
    if aggregator.is_empty() {
        id.to_string()
    } else {
        format!("{id}-{aggregator}")
    }
}

/// Export the active portion of a graph; inactive nodes and their edges are
/// dropped, consistently on every export.
#[must_use]
pub fn export_graph(graph: &ChangeGraph, aggregator: &str, config: &LanguageConfig) -> GraphExport {
    let mut out = GraphExport::default();

    for (_, node) in graph.nodes() {
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

    for (source, target, edge) in graph.edge_triples() {
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

    out
}
