//! # Storyline Pattern
//!
//! Per-cluster pattern discovery and the composite merge hierarchy.
//!
//! ## Architecture
//!
//! ```text
//! Cluster
//!     │
//!     ├──> Discovery
//!     │      ├─ Usage chains (ring-node cycle cuts, deferred requirements)
//!     │      ├─ Declaration extensions
//!     │      ├─ Successive chains
//!     │      └─ Singleton fallbacks
//!     │
//!     ├──> Merges, in order
//!     │      ├─ Requirement closure   (reason: requirement)
//!     │      ├─ Common-node overlap   (reason: common)
//!     │      └─ Similarity overlap    (reason: similar)
//!     │
//!     └──> Pattern forest
//!            ├─ render()    deterministic text
//!            ├─ describe()  external generator, cached, bounded retry
//!            └─ export      aggregator node/edge view
//! ```

mod describe;
mod engine;
mod export;
mod pattern;
mod pipeline;
mod prompts;
mod render;
mod util;

pub use describe::{DescribeError, Describer, DescriptionGenerator, RetryPolicy};
pub use engine::{ClusterAnalysis, TraversalEngine};
pub use export::export_patterns;
pub use pattern::{
    Composite, DeclarationPattern, Pattern, ReasonType, SingularPattern, SubGraph,
    SuccessivePattern, UsagePattern,
};
pub use pipeline::analyze;
pub use render::render;
