//! # Storyline Graph
//!
//! The change multigraph of one commit: construction, clustering, export.
//!
//! ## Architecture
//!
//! ```text
//! maximal added spans
//!     │
//!     ├──> Graph Builder (semantic-model facts)
//!     │      ├─ Context ancestor chains
//!     │      ├─ Def-use / invocation linking
//!     │      ├─ Class-instantiation linking
//!     │      ├─ Dead-code flags
//!     │      ├─ Similarity (all-pairs edit distance)
//!     │      └─ Succession + context re-scan
//!     │
//!     ├──> Change Graph (petgraph)
//!     │      ├─ Nodes: base / context / extension spans
//!     │      └─ Edges: def_use, context, succession, similarity
//!     │
//!     └──> Clusterer
//!            └─ Connected components of the active nodes
//! ```
//!
//! The builder never aborts on a resolution miss: a lookup that finds no
//! declaration, use, or overlapping node skips that single edge. Collaborator
//! failures propagate as [`GraphError`].

mod builder;
mod cluster;
mod edge;
mod error;
mod export;
mod graph;
mod node;

pub use builder::{maximal_spans, GraphBuilder};
pub use cluster::{Cluster, Clusterer};
pub use edge::{Edge, EdgeType};
pub use error::{GraphError, Result};
pub use export::{export_graph, scoped_id, ExportEdge, ExportNode, GraphExport};
pub use graph::ChangeGraph;
pub use node::{Node, NodeKind};
