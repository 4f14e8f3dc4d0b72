//! html5ever `TreeSink` that builds the arena directly.
//!
//! The parser hands out node ids as handles, so the tree it builds is the
//! same representation the diff and patch engines mutate. Adjacent text
//! chunks are merged on append, matching the parser's own model of a text
//! node.

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{local_name, namespace_url, ns, Attribute, LocalName, QualName};
use html5ever::{parse_document, ParseOpts};
use indextree::{Arena, NodeId};
use tendril::{StrTendril, TendrilSink};

use super::{Document, ElementData, NodeKind};

pub(crate) fn parse(html: &str) -> Document {
    let sink = ArenaSink::new();
    parse_document(sink, ParseOpts::default()).one(StrTendril::from(html))
}

pub(crate) fn parse_fragment(html: &str, context_tag: &str) -> Document {
    let sink = ArenaSink::new();
    let context = QualName::new(None, ns!(html), LocalName::from(context_tag));
    html5ever::parse_fragment(sink, ParseOpts::default(), context, Vec::new())
        .one(StrTendril::from(html))
}

/// Top-level nodes of a parsed fragment.
///
/// Fragment parsing nests the parsed content under a synthetic root
/// element appended to the document; its children are the fragment.
pub(crate) fn fragment_roots(frag: &Document) -> Vec<NodeId> {
    match frag.children(frag.root()).next() {
        Some(container) => frag.children(container).collect(),
        None => Vec::new(),
    }
}

/// Owned element name handed back to the tree builder.
#[derive(Debug, Clone)]
pub(crate) struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

struct ArenaSink {
    arena: RefCell<Arena<NodeKind>>,
    document: NodeId,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeKind::Document);
        ArenaSink {
            arena: RefCell::new(arena),
            document,
        }
    }

    fn new_node(&self, kind: NodeKind) -> NodeId {
        self.arena.borrow_mut().new_node(kind)
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        Document::from_parts(self.arena.into_inner(), self.document)
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // html5ever recovers on its own; recovered output is the contract.
    }

    fn get_document(&self) -> Self::Handle {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        let arena = self.arena.borrow();
        let local = match arena[*target].get() {
            NodeKind::Element(el) => LocalName::from(el.tag.as_str()),
            _ => local_name!(""),
        };
        OwnedElemName(QualName::new(None, ns!(html), local))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        self.new_node(NodeKind::Element(ElementData {
            tag: name.local.to_string(),
            attrs,
        }))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.new_node(NodeKind::Comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        // Processing instructions are carried along as opaque comments.
        self.new_node(NodeKind::Comment(data.to_string()))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                if let Some(last) = arena[*parent].last_child() {
                    if let NodeKind::Text(existing) = arena[last].get_mut() {
                        existing.push_str(&text);
                        return;
                    }
                }
                let node = arena.new_node(NodeKind::Text(text.to_string()));
                parent.append(node, &mut arena);
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        let node = match new_node {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => arena.new_node(NodeKind::Text(text.to_string())),
        };
        sibling.insert_before(node, &mut arena);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        _prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        self.append(element, child);
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut arena = self.arena.borrow_mut();
        let node = arena.new_node(NodeKind::Doctype(name.to_string()));
        self.document.append(node, &mut arena);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Element(el) = arena[*target].get_mut() {
            for attr in attrs {
                let key = attr.name.local.to_string();
                if el.attr(&key).is_none() {
                    el.attrs.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}
