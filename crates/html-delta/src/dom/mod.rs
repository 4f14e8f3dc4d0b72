//! Arena-backed document tree over the html5ever parser.
//!
//! The tree is the shared substrate of the diff, patch, and merge engines.
//! Nodes live in an `indextree::Arena`; paths address nodes by successive
//! child indices counted over the full child list (elements, text,
//! comments, doctype alike), so both sides of a diff and the patch target
//! enumerate children identically.

mod serialize;
mod sink;

use indextree::{Arena, NodeId};
use thiserror::Error;

pub(crate) use sink::fragment_roots;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("failed to parse html: {0}")]
    Parse(String),
    #[error("html serialization failed: {0}")]
    Render(String),
    #[error("path {path:?} does not resolve: index {index} out of range at step {depth}")]
    Path {
        path: Vec<usize>,
        depth: usize,
        index: usize,
    },
    #[error("node is not attached to the document tree")]
    Detached,
}

/// What a single arena slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root, parent of the doctype and `<html>`.
    Document,
    /// `<!DOCTYPE ...>` with its name.
    Doctype(String),
    /// Element with a tag name and its ordered attribute list.
    Element(ElementData),
    /// Text payload.
    Text(String),
    /// HTML comment.
    Comment(String),
}

/// Tag name plus attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `name` to `value`, appending a new pair when absent.
    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Removing an absent attribute is a no-op.
    pub(crate) fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }
}

/// A parsed HTML document: the arena plus the id of its Document node.
///
/// The empty path resolves to the Document node, matching the parser's
/// normalized `<html><head><body>` shape underneath it.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) arena: Arena<NodeKind>,
    root: NodeId,
}

impl Document {
    pub(crate) fn from_parts(arena: Arena<NodeKind>, root: NodeId) -> Self {
        Document { arena, root }
    }

    /// Parses `html` into a full normalized document tree.
    ///
    /// html5ever recovers from malformed input, so this only fails on
    /// pathological serializer-level conditions; the `Result` is part of
    /// the tree-access contract.
    pub fn parse(html: &str) -> Result<Document, DomError> {
        Ok(sink::parse(html))
    }

    /// Parses `html` as a fragment in the context of an element named
    /// `context_tag` (for example `"ul"` when the payload is an `<li>`).
    pub(crate) fn parse_fragment(html: &str, context_tag: &str) -> Document {
        sink::parse_fragment(html, context_tag)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.arena[id].get()
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        self.arena[id].get_mut()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        id.children(&self.arena).count()
    }

    pub fn nth_child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        id.children(&self.arena).nth(index)
    }

    /// Walks `path` from the root, taking the n-th child at each step.
    pub fn resolve(&self, path: &[usize]) -> Result<NodeId, DomError> {
        let mut current = self.root;
        for (depth, &index) in path.iter().enumerate() {
            current = self
                .nth_child(current, index)
                .ok_or_else(|| DomError::Path {
                    path: path.to_vec(),
                    depth,
                    index,
                })?;
        }
        Ok(current)
    }

    /// Computes the path of `id` under the root by walking parent links.
    pub fn path_of(&self, id: NodeId) -> Result<Vec<usize>, DomError> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            let parent = self.parent(current).ok_or(DomError::Detached)?;
            let index = parent
                .children(&self.arena)
                .position(|c| c == current)
                .ok_or(DomError::Detached)?;
            path.push(index);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Serializes the whole document, doctype included.
    pub fn render(&self) -> Result<String, DomError> {
        serialize::render_children(self, self.root)
    }

    /// Serializes a single subtree. Rendering the Document node itself
    /// renders its children.
    pub fn render_node(&self, id: NodeId) -> Result<String, DomError> {
        match self.kind(id) {
            NodeKind::Document => serialize::render_children(self, id),
            _ => serialize::render_subtree(self, id),
        }
    }

    /// Detaches `id` (and its subtree) from its parent. The slot stays
    /// allocated in the arena but is no longer reachable from the root.
    pub(crate) fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Inserts `child` before the current `index`-th child of `parent`,
    /// appending when `index` is at or past the end of the child list.
    pub(crate) fn insert_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        match self.nth_child(parent, index) {
            Some(existing) => existing.insert_before(child, &mut self.arena),
            None => parent.append(child, &mut self.arena),
        }
    }

    /// Deep-copies a subtree out of another document into this arena and
    /// returns the id of the copy, not yet attached anywhere.
    pub(crate) fn adopt_subtree(&mut self, src: &Document, src_id: NodeId) -> NodeId {
        let copy = self.arena.new_node(src.kind(src_id).clone());
        for child in src.children(src_id) {
            let child_copy = self.adopt_subtree(src, child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        Document::parse(html).expect("parse")
    }

    #[test]
    fn parse_normalizes_to_full_document() {
        let doc = parse("<p>Hello</p>");
        let html = doc.nth_child(doc.root(), 0).expect("html element");
        match doc.kind(html) {
            NodeKind::Element(el) => assert_eq!(el.tag, "html"),
            other => panic!("expected html element, got {other:?}"),
        }
        // head then body underneath
        let tags: Vec<String> = doc
            .children(html)
            .filter_map(|id| match doc.kind(id) {
                NodeKind::Element(el) => Some(el.tag.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, ["head", "body"]);
    }

    #[test]
    fn resolve_and_path_of_are_inverse() {
        let doc = parse("<div><span>a</span><span>b</span></div>");
        // document -> html -> body -> div -> second span -> text
        let id = doc.resolve(&[0, 1, 0, 1, 0]).expect("resolve");
        assert_eq!(doc.kind(id), &NodeKind::Text("b".to_string()));
        assert_eq!(doc.path_of(id).expect("path_of"), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn resolve_reports_failing_step() {
        let doc = parse("<p>x</p>");
        let err = doc.resolve(&[0, 1, 5]).unwrap_err();
        match err {
            DomError::Path { depth, index, .. } => {
                assert_eq!(depth, 2);
                assert_eq!(index, 5);
            }
            other => panic!("expected path error, got {other:?}"),
        }
    }

    #[test]
    fn child_enumeration_counts_every_kind() {
        let doc = parse("<div><!-- note -->text<span>s</span></div>");
        let div = doc.resolve(&[0, 1, 0]).expect("div");
        let kinds: Vec<&NodeKind> = doc.children(div).map(|id| doc.kind(id)).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], NodeKind::Comment(_)));
        assert!(matches!(kinds[1], NodeKind::Text(_)));
        assert!(matches!(kinds[2], NodeKind::Element(_)));
    }

    #[test]
    fn doctype_is_a_document_child() {
        let doc = parse("<!DOCTYPE html><p>x</p>");
        let first = doc.nth_child(doc.root(), 0).expect("first child");
        assert_eq!(doc.kind(first), &NodeKind::Doctype("html".to_string()));
        assert!(doc.render().expect("render").starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn render_parse_is_stable() {
        let once = parse("<div class=\"a\"><p>Hi<br>there</p></div>")
            .render()
            .expect("render");
        let twice = parse(&once).render().expect("render");
        assert_eq!(once, twice);
    }

    #[test]
    fn render_node_serializes_one_subtree() {
        let doc = parse("<ul><li>A</li><li>B</li></ul>");
        let li = doc.resolve(&[0, 1, 0, 1]).expect("second li");
        assert_eq!(doc.render_node(li).expect("render"), "<li>B</li>");
    }

    #[test]
    fn fragment_parse_keeps_context_semantics() {
        let frag = Document::parse_fragment("<li>X</li>", "ul");
        let roots = fragment_roots(&frag);
        assert_eq!(roots.len(), 1);
        match frag.kind(roots[0]) {
            NodeKind::Element(el) => assert_eq!(el.tag, "li"),
            other => panic!("expected li, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_text_chunks_merge_into_one_node() {
        let doc = parse("<p>a&amp;b</p>");
        let p = doc.resolve(&[0, 1, 0]).expect("p");
        assert_eq!(doc.child_count(p), 1);
        let text = doc.nth_child(p, 0).expect("text");
        assert_eq!(doc.kind(text), &NodeKind::Text("a&b".to_string()));
    }

    #[test]
    fn detach_and_insert_child_at() {
        let mut doc = parse("<ul><li>A</li><li>B</li></ul>");
        let ul = doc.resolve(&[0, 1, 0]).expect("ul");
        let first = doc.nth_child(ul, 0).expect("li A");
        doc.detach(first);
        assert_eq!(doc.child_count(ul), 1);
        doc.insert_child_at(ul, 1, first);
        assert_eq!(
            doc.render_node(ul).expect("render"),
            "<ul><li>B</li><li>A</li></ul>"
        );
    }
}
