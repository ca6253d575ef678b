//! In-memory implementations of the collaborator traits.
//!
//! Used by tests across the workspace and as reference behavior for adapter
//! authors: [`MemorySource`] resolves spans over hand-built trees,
//! [`MemoryModel`] serves recorded semantic facts, and
//! [`ExactMatchDistance`] treats structural equality as distance zero.

use crate::error::Result;
use crate::model::{ClassDescriptor, EditDistance, SemanticModel, SpanResolver};
use crate::span::{SourceLocation, SyntaxSpan};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct FileData {
    path: String,
    content: String,
}

/// One position of a hand-built syntax tree.
pub struct MemoryNode {
    kind: String,
    start: usize,
    end: usize,
    file: Arc<FileData>,
    parent: Weak<MemoryNode>,
    children: Vec<Arc<MemoryNode>>,
}

impl SyntaxSpan for MemoryNode {
    fn file(&self) -> &str {
        &self.file.path
    }

    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn text(&self) -> String {
        self.file
            .content
            .get(self.start..self.end)
            .unwrap_or_default()
            .to_string()
    }

    fn parent(&self) -> Option<Arc<dyn SyntaxSpan>> {
        self.parent.upgrade().map(|node| node as Arc<dyn SyntaxSpan>)
    }

    fn children(&self) -> Vec<Arc<dyn SyntaxSpan>> {
        self.children
            .iter()
            .map(|child| child.clone() as Arc<dyn SyntaxSpan>)
            .collect()
    }
}

/// Declarative description of a tree, turned into parent-linked
/// [`MemoryNode`]s by [`MemorySource::add_file`].
#[derive(Debug, Clone)]
pub struct TreeSpec {
    kind: String,
    start: usize,
    end: usize,
    children: Vec<TreeSpec>,
}

impl TreeSpec {
    pub fn new(kind: &str, range: Range<usize>) -> Self {
        Self {
            kind: kind.to_string(),
            start: range.start,
            end: range.end,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn child(mut self, child: TreeSpec) -> Self {
        self.children.push(child);
        self
    }
}

fn build_node(spec: &TreeSpec, file: &Arc<FileData>, parent: Weak<MemoryNode>) -> Arc<MemoryNode> {
    Arc::new_cyclic(|me| MemoryNode {
        kind: spec.kind.clone(),
        start: spec.start,
        end: spec.end,
        file: file.clone(),
        parent,
        children: spec
            .children
            .iter()
            .map(|child| build_node(child, file, me.clone()))
            .collect(),
    })
}

/// Span resolver over a set of in-memory files.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Arc<MemoryNode>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and its tree; returns the root span.
    pub fn add_file(&mut self, path: &str, content: &str, spec: TreeSpec) -> Arc<MemoryNode> {
        let file = Arc::new(FileData {
            path: path.to_string(),
            content: content.to_string(),
        });
        let root = build_node(&spec, &file, Weak::new());
        self.files.insert(path.to_string(), root.clone());
        root
    }

    #[must_use]
    pub fn root(&self, path: &str) -> Option<Arc<MemoryNode>> {
        self.files.get(path).cloned()
    }

    /// Shallowest span with exactly the given offsets.
    #[must_use]
    pub fn find(&self, location: &SourceLocation) -> Option<Arc<MemoryNode>> {
        let root = self.files.get(&location.file)?;
        find_in(root, location)
    }
}

fn find_in(node: &Arc<MemoryNode>, location: &SourceLocation) -> Option<Arc<MemoryNode>> {
    if node.start == location.start && node.end == location.end {
        return Some(node.clone());
    }
    for child in &node.children {
        if child.start <= location.start && location.end <= child.end {
            if let Some(found) = find_in(child, location) {
                return Some(found);
            }
        }
    }
    None
}

impl SpanResolver for MemorySource {
    fn resolve(&self, location: &SourceLocation) -> Result<Option<Arc<dyn SyntaxSpan>>> {
        Ok(self.find(location).map(|node| node as Arc<dyn SyntaxSpan>))
    }
}

/// Semantic model answering from recorded facts.
#[derive(Default)]
pub struct MemoryModel {
    uses: HashMap<SourceLocation, Vec<SourceLocation>>,
    invocations: HashMap<SourceLocation, Vec<SourceLocation>>,
    initializer_calls: HashMap<SourceLocation, Vec<SourceLocation>>,
    declarations: HashMap<SourceLocation, SourceLocation>,
    classes: Vec<ClassDescriptor>,
}

impl MemoryModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_use(&mut self, declaration: SourceLocation, use_site: SourceLocation) {
        self.uses.entry(declaration).or_default().push(use_site);
    }

    pub fn record_invocation(&mut self, method: SourceLocation, call_site: SourceLocation) {
        self.invocations.entry(method).or_default().push(call_site);
    }

    pub fn record_initializer_call(
        &mut self,
        declaration: SourceLocation,
        call_site: SourceLocation,
    ) {
        self.initializer_calls
            .entry(declaration)
            .or_default()
            .push(call_site);
    }

    pub fn record_declaration(&mut self, call_site: SourceLocation, declaration: SourceLocation) {
        self.declarations.insert(call_site, declaration);
    }

    pub fn record_class(&mut self, name: &str, declaration: SourceLocation) {
        self.classes.push(ClassDescriptor {
            name: name.to_string(),
            declaration,
        });
    }
}

impl SemanticModel for MemoryModel {
    fn find_uses(&self, declaration: &SourceLocation) -> Result<Vec<SourceLocation>> {
        Ok(self.uses.get(declaration).cloned().unwrap_or_default())
    }

    fn find_invocations(&self, method: &SourceLocation) -> Result<Vec<SourceLocation>> {
        Ok(self.invocations.get(method).cloned().unwrap_or_default())
    }

    fn calls_in_initializer(&self, declaration: &SourceLocation) -> Result<Vec<SourceLocation>> {
        Ok(self
            .initializer_calls
            .get(declaration)
            .cloned()
            .unwrap_or_default())
    }

    fn find_declaration(
        &self,
        _context_method: &SourceLocation,
        call_site: &SourceLocation,
    ) -> Result<Option<SourceLocation>> {
        Ok(self.declarations.get(call_site).cloned())
    }

    fn classes_by_name_suffix(&self, suffix: &str) -> Result<Vec<ClassDescriptor>> {
        Ok(self
            .classes
            .iter()
            .filter(|class| class.name.ends_with(suffix))
            .cloned()
            .collect())
    }
}

/// Distance zero for spans with identical kind and text, effectively
/// infinite otherwise; pairs with the default zero similarity threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatchDistance;

impl EditDistance for ExactMatchDistance {
    fn distance(&self, a: &dyn SyntaxSpan, b: &dyn SyntaxSpan) -> Result<f32> {
        Ok(if a.kind() == b.kind() && a.text() == b.text() {
            0.0
        } else {
            f32::MAX
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.add_file(
            "A.java",
            "class A { void f() {} void g() {} }",
            TreeSpec::new("compilation_unit", 0..35).child(
                TreeSpec::new("type_declaration", 0..35)
                    .child(TreeSpec::new("method_declaration", 10..21))
                    .child(TreeSpec::new("method_declaration", 22..33)),
            ),
        );
        source
    }

    #[test]
    fn trees_link_parents_and_siblings() {
        let source = sample_source();
        let f = source
            .find(&SourceLocation::new("A.java", 10, 21))
            .expect("method span");

        let parent = f.parent().expect("parent");
        assert_eq!(parent.kind(), "type_declaration");

        let sibling = f.right_sibling().expect("right sibling");
        assert_eq!(sibling.location(), SourceLocation::new("A.java", 22, 33));
        assert!(sibling.right_sibling().is_none());
    }

    #[test]
    fn descendants_are_pre_order() {
        let source = sample_source();
        let root = source.root("A.java").expect("root");
        let kinds: Vec<String> = root
            .descendants()
            .iter()
            .map(|span| span.kind().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "type_declaration".to_string(),
                "method_declaration".to_string(),
                "method_declaration".to_string(),
            ]
        );
    }

    #[test]
    fn resolve_misses_files_outside_the_change_set() {
        let source = sample_source();
        assert!(source
            .resolve(&SourceLocation::new("B.java", 0, 10))
            .expect("resolver")
            .is_none());
    }

    #[test]
    fn exact_match_distance_requires_kind_and_text() {
        let mut source = MemorySource::new();
        let a = source.add_file("a.txt", "foo", TreeSpec::new("stmt", 0..3));
        let b = source.add_file("b.txt", "foo", TreeSpec::new("stmt", 0..3));
        let c = source.add_file("c.txt", "bar", TreeSpec::new("stmt", 0..3));

        let metric = ExactMatchDistance;
        assert_eq!(metric.distance(a.as_ref(), b.as_ref()).unwrap(), 0.0);
        assert_eq!(metric.distance(a.as_ref(), c.as_ref()).unwrap(), f32::MAX);
    }
}
