use crate::error::Result;
use crate::span::{SourceLocation, SyntaxSpan};
use std::sync::Arc;

/// A type declaration known to the semantic model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    pub declaration: SourceLocation,
}

/// Maps locations back to syntax-tree positions of the analyzed change set.
pub trait SpanResolver: Send + Sync {
    /// Resolve a location to its tree position. `Ok(None)` marks a location
    /// in a file outside the change set; it is a resolution miss, not a
    /// failure.
    fn resolve(&self, location: &SourceLocation) -> Result<Option<Arc<dyn SyntaxSpan>>>;
}

/// Opaque boundary to the source's semantic model.
///
/// Every method distinguishes a resolution miss (empty set / `None`, the
/// common and expected outcome) from a collaborator failure (`Err`, fatal
/// for the commit).
pub trait SemanticModel: Send + Sync {
    /// Statements and expressions in scope that read the declared name.
    fn find_uses(&self, declaration: &SourceLocation) -> Result<Vec<SourceLocation>>;

    /// Invocation sites of a method declaration anywhere in the change set.
    fn find_invocations(&self, method: &SourceLocation) -> Result<Vec<SourceLocation>>;

    /// Call sites inside a declaration's initializer expression.
    fn calls_in_initializer(&self, declaration: &SourceLocation) -> Result<Vec<SourceLocation>> {
        let _ = declaration;
        Ok(Vec::new())
    }

    /// Declaration of a call made from within `context_method`, if the model
    /// can resolve one.
    fn find_declaration(
        &self,
        context_method: &SourceLocation,
        call_site: &SourceLocation,
    ) -> Result<Option<SourceLocation>>;

    /// Known classes whose name ends with `suffix`.
    fn classes_by_name_suffix(&self, suffix: &str) -> Result<Vec<ClassDescriptor>>;
}

/// Tree edit distance between two spans, computed externally.
pub trait EditDistance: Send + Sync {
    fn distance(&self, a: &dyn SyntaxSpan, b: &dyn SyntaxSpan) -> Result<f32>;
}
