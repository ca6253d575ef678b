use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Byte-offset address of a region of source code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start: usize,
    pub end: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// Inclusive overlap test used to map semantic facts back onto graph
    /// nodes: `self.start <= other.end && other.start <= self.end`.
    #[must_use]
    pub fn overlaps(&self, other: &SourceLocation) -> bool {
        self.file == other.file && self.start <= other.end && other.start <= self.end
    }

    /// Gap between two same-file locations; zero when they overlap.
    #[must_use]
    pub fn distance_to(&self, other: &SourceLocation) -> usize {
        if self.overlaps(other) {
            return 0;
        }
        if self.end < other.start {
            other.start - self.end
        } else {
            self.start.saturating_sub(other.end)
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start, self.end)
    }
}

/// Structural identity of a span: `(file, start, end, syntactic kind)`.
///
/// Two spans with equal fingerprints denote the same graph node regardless
/// of how or when their handles were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanFingerprint {
    pub file: String,
    pub start: usize,
    pub end: usize,
    pub kind: String,
}

impl SpanFingerprint {
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.start, self.end)
    }
}

impl fmt::Display for SpanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.file, self.start, self.end, self.kind)
    }
}

/// Handle to one position of a parsed syntax tree.
///
/// Implementations wrap whatever tree representation the parsing collaborator
/// uses; the analysis only ever navigates through this interface.
pub trait SyntaxSpan: Send + Sync {
    /// Path of the file this span belongs to.
    fn file(&self) -> &str;

    /// Start byte offset.
    fn start(&self) -> usize;

    /// End byte offset.
    fn end(&self) -> usize;

    /// Syntactic type name, e.g. `method_declaration`.
    fn kind(&self) -> &str;

    /// Raw byte content of the span.
    fn text(&self) -> String;

    fn parent(&self) -> Option<Arc<dyn SyntaxSpan>>;

    fn children(&self) -> Vec<Arc<dyn SyntaxSpan>>;

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file(), self.start(), self.end())
    }

    fn fingerprint(&self) -> SpanFingerprint {
        SpanFingerprint {
            file: self.file().to_string(),
            start: self.start(),
            end: self.end(),
            kind: self.kind().to_string(),
        }
    }

    /// All spans below this one, in pre-order, excluding the span itself.
    fn descendants(&self) -> Vec<Arc<dyn SyntaxSpan>> {
        let mut out = Vec::new();
        let mut stack: Vec<Arc<dyn SyntaxSpan>> = self.children();
        stack.reverse();
        while let Some(span) = stack.pop() {
            for child in span.children().into_iter().rev() {
                stack.push(child);
            }
            out.push(span);
        }
        out
    }

    /// Parent chain from the nearest ancestor to the tree root.
    fn ancestors(&self) -> Vec<Arc<dyn SyntaxSpan>> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(span) = current {
            current = span.parent();
            out.push(span);
        }
        out
    }

    /// Immediate right sibling in the same parent, if any.
    fn right_sibling(&self) -> Option<Arc<dyn SyntaxSpan>> {
        let parent = self.parent()?;
        let children = parent.children();
        let position = children.iter().position(|child| {
            child.start() == self.start() && child.end() == self.end() && child.kind() == self.kind()
        })?;
        children.get(position + 1).cloned()
    }

    /// First descendant (pre-order) of the given kind.
    fn descendant_of_kind(&self, kind: &str) -> Option<Arc<dyn SyntaxSpan>> {
        self.descendants()
            .into_iter()
            .find(|span| span.kind() == kind)
    }
}

/// The span itself when it has the given kind, otherwise its nearest
/// ancestor of that kind.
#[must_use]
pub fn self_or_ancestor_of_kind(
    span: &Arc<dyn SyntaxSpan>,
    kind: &str,
) -> Option<Arc<dyn SyntaxSpan>> {
    if span.kind() == kind {
        return Some(span.clone());
    }
    let mut current = span.parent();
    while let Some(candidate) = current {
        if candidate.kind() == kind {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let a = SourceLocation::new("a.rs", 10, 20);
        assert!(a.overlaps(&SourceLocation::new("a.rs", 20, 30)));
        assert!(a.overlaps(&SourceLocation::new("a.rs", 0, 10)));
        assert!(a.overlaps(&SourceLocation::new("a.rs", 12, 18)));
        assert!(!a.overlaps(&SourceLocation::new("a.rs", 21, 30)));
        assert!(!a.overlaps(&SourceLocation::new("b.rs", 10, 20)));
    }

    #[test]
    fn distance_is_zero_for_overlap_and_gap_otherwise() {
        let a = SourceLocation::new("a.rs", 10, 20);
        assert_eq!(a.distance_to(&SourceLocation::new("a.rs", 15, 25)), 0);
        assert_eq!(a.distance_to(&SourceLocation::new("a.rs", 30, 40)), 10);
        assert_eq!(a.distance_to(&SourceLocation::new("a.rs", 0, 4)), 6);
    }

    #[test]
    fn fingerprint_display_is_stable() {
        let fp = SpanFingerprint {
            file: "src/App.java".into(),
            start: 4,
            end: 42,
            kind: "method_declaration".into(),
        };
        assert_eq!(fp.to_string(), "src/App.java:4:42:method_declaration");
    }
}
