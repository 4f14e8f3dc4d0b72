//! Structural diff engine.
//!
//! Walks the two parsed trees in lockstep, aligned by child index, and
//! emits the operations turning the first into the second. Alignment is
//! positional, not an edit-distance match: a node is compared with the
//! node at the same path on the other side, surplus children become
//! deletions or insertions at the tail. Deletions are emitted in
//! descending index order and insertions in ascending order so every path
//! stays valid while the patch engine replays the list.

mod text;

use log::debug;
use thiserror::Error;

use crate::delta::{base_hash, Delta, NodePath, Op};
use crate::dom::{Document, DomError, ElementData, NodeKind};

#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Computes the delta transforming `old_html` into `new_html`.
///
/// The delta's `base_hash` is the SHA-256 of `old_html` as given; every
/// emitted path is valid against the parsed base document.
pub fn diff(old_html: &str, new_html: &str, author: &str) -> Result<Delta, DiffError> {
    let old_doc = Document::parse(old_html)?;
    let new_doc = Document::parse(new_html)?;

    let mut ops = Vec::new();
    let mut path = NodePath::new();
    diff_nodes(
        &old_doc,
        old_doc.root(),
        &new_doc,
        new_doc.root(),
        &mut path,
        &mut ops,
    )?;
    debug!("diff produced {} operation(s)", ops.len());

    Ok(Delta::new(base_hash(old_html), ops, author))
}

fn diff_nodes(
    old: &Document,
    old_id: indextree::NodeId,
    new: &Document,
    new_id: indextree::NodeId,
    path: &mut NodePath,
    ops: &mut Vec<Op>,
) -> Result<(), DiffError> {
    match (old.kind(old_id), new.kind(new_id)) {
        (NodeKind::Element(old_el), NodeKind::Element(new_el)) => {
            diff_attributes(old_el, new_el, path, ops);
        }
        (NodeKind::Text(old_text), NodeKind::Text(new_text)) => {
            diff_text(old_text, new_text, path, ops);
        }
        // Aligned nodes of different kinds are walked as if they matched;
        // the child, attribute, and text operations underneath describe
        // the differences.
        _ => {}
    }
    diff_children(old, old_id, new, new_id, path, ops)
}

/// One UPDATE_ATTR per changed, added, or removed attribute. Removal is
/// an UPDATE_ATTR without a new value. Ops follow the attribute order of
/// the elements; callers must not rely on that order.
fn diff_attributes(old: &ElementData, new: &ElementData, path: &NodePath, ops: &mut Vec<Op>) {
    for (key, old_value) in &old.attrs {
        match new.attr(key) {
            None => ops.push(Op::UpdateAttr {
                path: path.clone(),
                key: key.clone(),
                old_value: Some(old_value.clone()),
                new_value: None,
            }),
            Some(new_value) if new_value != old_value => ops.push(Op::UpdateAttr {
                path: path.clone(),
                key: key.clone(),
                old_value: Some(old_value.clone()),
                new_value: Some(new_value.to_string()),
            }),
            Some(_) => {}
        }
    }
    for (key, new_value) in &new.attrs {
        if old.attr(key).is_none() {
            ops.push(Op::UpdateAttr {
                path: path.clone(),
                key: key.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
            });
        }
    }
}

/// Text changes become one DELETE_TEXT plus one INSERT_TEXT around the
/// common prefix/suffix. When nothing is shared the change collapses to a
/// single atomic UPDATE_TEXT, which is what the merge engine's conflict
/// table treats as whole-payload replacement.
fn diff_text(old: &str, new: &str, path: &NodePath, ops: &mut Vec<Op>) {
    let Some(splice) = text::splice(old, new) else {
        return;
    };
    if splice.is_total_replacement(old, new) {
        ops.push(Op::UpdateText {
            path: path.clone(),
            old_value: old.to_string(),
            new_value: new.to_string(),
        });
        return;
    }
    if !splice.deleted.is_empty() {
        ops.push(Op::DeleteText {
            path: path.clone(),
            position: splice.offset,
            old_value: splice.deleted,
        });
    }
    if !splice.inserted.is_empty() {
        ops.push(Op::InsertText {
            path: path.clone(),
            position: splice.offset,
            new_value: splice.inserted,
        });
    }
}

fn diff_children(
    old: &Document,
    old_id: indextree::NodeId,
    new: &Document,
    new_id: indextree::NodeId,
    path: &mut NodePath,
    ops: &mut Vec<Op>,
) -> Result<(), DiffError> {
    let old_children: Vec<_> = old.children(old_id).collect();
    let new_children: Vec<_> = new.children(new_id).collect();
    let common = old_children.len().min(new_children.len());

    for i in 0..common {
        path.push(i);
        diff_nodes(old, old_children[i], new, new_children[i], path, ops)?;
        path.pop();
    }

    // Surplus old children: delete highest index first so each path is
    // still valid at its moment of application.
    for i in (common..old_children.len()).rev() {
        let mut child_path = path.clone();
        child_path.push(i);
        ops.push(Op::DeleteNode { path: child_path });
    }

    // Surplus new children: insert in ascending order so each position is
    // the final intended index.
    for (i, &child) in new_children.iter().enumerate().skip(common) {
        ops.push(Op::InsertNode {
            path: path.clone(),
            position: i,
            node_data: new.render_node(child)?,
        });
    }

    Ok(())
}
