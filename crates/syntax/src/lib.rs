//! # Storyline Syntax
//!
//! Span addressing and the collaborator boundary for commit analysis.
//!
//! ## Features
//!
//! - **Span addressing** - byte-offset locations and structural fingerprints
//! - **Syntax handles** - opaque access to tree positions, ancestors, siblings
//! - **Semantic facts** - declaration/use/invocation lookups behind a trait
//! - **Configuration tables** - per-analysis syntactic-kind rules, never global
//! - **In-memory fixtures** - reference implementations for tests and adapters
//!
//! The crate defines *what the analysis asks of* a parser and a semantic
//! model; it deliberately contains no parsing of its own. Adapters implement
//! [`SyntaxSpan`], [`SpanResolver`], [`SemanticModel`] and [`EditDistance`]
//! over whatever AST-diff machinery produced the change set.

mod config;
mod error;
pub mod memory;
mod model;
mod span;

pub use config::{kinds, LanguageConfig};
pub use error::{CollaboratorError, Result};
pub use model::{ClassDescriptor, EditDistance, SemanticModel, SpanResolver};
pub use span::{self_or_ancestor_of_kind, SourceLocation, SpanFingerprint, SyntaxSpan};
