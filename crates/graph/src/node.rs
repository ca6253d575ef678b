use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use storyline_syntax::{LanguageConfig, SourceLocation, SpanFingerprint, SyntaxSpan};

/// Role a node plays in the change graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An actually-changed span.
    Base,
    /// A structural ancestor attached for disambiguation.
    Context,
    /// An out-of-diff declaration pulled in for explanatory linkage.
    Extension,
    /// A synthetic grouping node, only produced by exports.
    Aggregator,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Context => "context",
            Self::Extension => "extension",
            Self::Aggregator => "aggregator",
        }
    }
}

/// A span participating in the change graph.
///
/// Identity is the structural fingerprint `(file, start, end, kind)`: two
/// nodes with equal fingerprints are the same node no matter how their
/// handles were obtained. Equality and hashing delegate to the fingerprint.
#[derive(Clone)]
pub struct Node {
    fingerprint: SpanFingerprint,
    span: Arc<dyn SyntaxSpan>,
    kind: NodeKind,
    active: bool,
}

impl Node {
    #[must_use]
    pub fn new(span: Arc<dyn SyntaxSpan>, kind: NodeKind) -> Self {
        Self {
            fingerprint: span.fingerprint(),
            span,
            kind,
            active: true,
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> &SpanFingerprint {
        &self.fingerprint
    }

    #[must_use]
    pub fn span(&self) -> &Arc<dyn SyntaxSpan> {
        &self.span
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.fingerprint.file
    }

    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.fingerprint.location()
    }

    /// Syntactic type name of the underlying span.
    #[must_use]
    pub fn syntax_kind(&self) -> &str {
        &self.fingerprint.kind
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn is_base(&self) -> bool {
        matches!(self.kind, NodeKind::Base)
    }

    #[must_use]
    pub const fn is_context(&self) -> bool {
        matches!(self.kind, NodeKind::Context)
    }

    #[must_use]
    pub const fn is_extension(&self) -> bool {
        matches!(self.kind, NodeKind::Extension)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Text shown for this node in exports and rendered patterns.
    ///
    /// Context nodes compress to their declared name (type and method
    /// declarations) or the file path (compilation units); everything else
    /// is the raw span text.
    #[must_use]
    pub fn content(&self, config: &LanguageConfig) -> String {
        if self.is_context() {
            let kind = self.syntax_kind();
            if kind == config.type_declaration || kind == config.method_declaration {
                if let Some(name) = self.span.descendant_of_kind(&config.name) {
                    return name.text();
                }
            }
            if kind == config.compilation_unit {
                return self.path().to_string();
            }
        }
        self.span.text()
    }

    /// `content` with the configured kind label, e.g. `METHOD "parse"`.
    #[must_use]
    pub fn display_label(&self, config: &LanguageConfig) -> String {
        if self.is_context() {
            return match config.kind_labels.get(self.syntax_kind()) {
                Some(label) => format!("{} \"{}\"", label, self.content(config)),
                None => format!("\"{}\"", self.content(config)),
            };
        }
        self.content(config)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("fingerprint", &self.fingerprint.to_string())
            .field("kind", &self.kind)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyline_syntax::memory::{MemorySource, TreeSpec};

    #[test]
    fn identity_is_the_fingerprint() {
        let mut source = MemorySource::new();
        let root = source.add_file("a.rs", "fn a() {}", TreeSpec::new("method_declaration", 0..9));
        let other = source.root("a.rs").expect("root");

        let base = Node::new(root, NodeKind::Base);
        let context = Node::new(other, NodeKind::Context);
        assert_eq!(base, context);
    }

    #[test]
    fn context_nodes_render_their_name() {
        let mut source = MemorySource::new();
        let root = source.add_file(
            "a.rs",
            "class Widget {}",
            TreeSpec::new("type_declaration", 0..15)
                .child(TreeSpec::new("simple_name", 6..12)),
        );

        let config = LanguageConfig::default();
        let node = Node::new(root, NodeKind::Context);
        assert_eq!(node.content(&config), "Widget");
        assert_eq!(node.display_label(&config), "TYPE \"Widget\"");
    }
}
