//! Rendering through the html5ever serializer.
//!
//! Implementing `html5ever::serialize::Serialize` over the arena keeps the
//! output on the HTML serialization algorithm: void elements get no end
//! tag, `<script>`/`<style>` payloads stay raw, and text and attribute
//! values are escaped.

use std::io;

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::{namespace_url, ns, LocalName, QualName};
use indextree::NodeId;

use super::{Document, DomError, NodeKind};

/// Serializes the children of `id` (used for the Document node).
pub(super) fn render_children(doc: &Document, id: NodeId) -> Result<String, DomError> {
    render_scope(doc, id, TraversalScope::ChildrenOnly(None))
}

/// Serializes `id` itself plus its subtree.
pub(super) fn render_subtree(doc: &Document, id: NodeId) -> Result<String, DomError> {
    render_scope(doc, id, TraversalScope::IncludeNode)
}

fn render_scope(doc: &Document, id: NodeId, scope: TraversalScope) -> Result<String, DomError> {
    let mut buf = Vec::new();
    let node = SerializableNode { doc, id };
    serialize(
        &mut buf,
        &node,
        SerializeOpts {
            traversal_scope: scope,
            ..Default::default()
        },
    )
    .map_err(|err| DomError::Render(err.to_string()))?;
    String::from_utf8(buf).map_err(|err| DomError::Render(err.to_string()))
}

struct SerializableNode<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match traversal_scope {
            TraversalScope::ChildrenOnly(_) => write_children(self.doc, self.id, serializer),
            TraversalScope::IncludeNode => write_node(self.doc, self.id, serializer),
        }
    }
}

fn write_children<S: Serializer>(doc: &Document, id: NodeId, ser: &mut S) -> io::Result<()> {
    for child in doc.children(id) {
        write_node(doc, child, ser)?;
    }
    Ok(())
}

fn write_node<S: Serializer>(doc: &Document, id: NodeId, ser: &mut S) -> io::Result<()> {
    match doc.kind(id) {
        NodeKind::Document => write_children(doc, id, ser),
        NodeKind::Doctype(name) => ser.write_doctype(name),
        NodeKind::Text(text) => ser.write_text(text),
        NodeKind::Comment(text) => ser.write_comment(text),
        NodeKind::Element(el) => {
            let name = element_name(&el.tag);
            let attrs: Vec<(QualName, &str)> = el
                .attrs
                .iter()
                .map(|(k, v)| (attr_name(k), v.as_str()))
                .collect();
            ser.start_elem(name.clone(), attrs.iter().map(|(q, v)| (q, *v)))?;
            write_children(doc, id, ser)?;
            ser.end_elem(name)
        }
    }
}

fn element_name(tag: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(tag))
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}
