use serde::{Deserialize, Serialize};

/// Typed relations between change-graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Declaration to use, or declaration to invocation site.
    DefUse,
    /// Node to its nearest qualifying structural ancestor.
    Context,
    /// Node to its immediate right sibling.
    Succession,
    /// Structurally near node, weighted by edit distance.
    Similarity,
    /// Aggregator linkage; produced only by exports, never by the builder.
    Expansion,
}

impl EdgeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DefUse => "def_use",
            Self::Context => "context",
            Self::Succession => "succession",
            Self::Similarity => "similarity",
            Self::Expansion => "expansion",
        }
    }
}

/// A directed, weighted, typed relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub weight: f32,
}

impl Edge {
    #[must_use]
    pub const fn new(edge_type: EdgeType, weight: f32) -> Self {
        Self { edge_type, weight }
    }

    #[must_use]
    pub const fn unit(edge_type: EdgeType) -> Self {
        Self::new(edge_type, 1.0)
    }
}
