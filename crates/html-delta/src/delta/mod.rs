//! Delta data model: paths, the operation taxonomy, and the delta record.

pub mod codec;

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Traversal steps from the document root to a target node.
///
/// `[0, 1, 3]` means root -> child 0 -> child 1 -> child 3. The empty path
/// is the root itself. Indices count all children, whatever their kind.
pub type NodePath = Vec<usize>;

/// An atomic, path-addressed change to an HTML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Insert a subtree parsed from `node_data` as the `position`-th child
    /// of the node at `path`. A position equal to the current child count
    /// appends.
    InsertNode {
        path: NodePath,
        position: usize,
        node_data: String,
    },
    /// Remove the node at `path` together with its subtree.
    DeleteNode { path: NodePath },
    /// Reserved for reparenting. Never produced by the diff engine; the
    /// patch engine rejects it.
    MoveNode { path: NodePath },
    /// Set attribute `key` on the element at `path`. `new_value: None`
    /// removes the attribute; `old_value` is informational.
    UpdateAttr {
        path: NodePath,
        key: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },
    /// Atomic replacement of a text node's payload.
    UpdateText {
        path: NodePath,
        old_value: String,
        new_value: String,
    },
    /// Splice `new_value` into the payload at byte offset `position`.
    InsertText {
        path: NodePath,
        position: usize,
        new_value: String,
    },
    /// Remove `old_value.len()` bytes at `position`; the removed slice
    /// must equal `old_value`.
    DeleteText {
        path: NodePath,
        position: usize,
        old_value: String,
    },
}

impl Op {
    /// Wire name of the operation kind.
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::InsertNode { .. } => "INSERT_NODE",
            Op::DeleteNode { .. } => "DELETE_NODE",
            Op::MoveNode { .. } => "MOVE_NODE",
            Op::UpdateAttr { .. } => "UPDATE_ATTR",
            Op::UpdateText { .. } => "UPDATE_TEXT",
            Op::InsertText { .. } => "INSERT_TEXT",
            Op::DeleteText { .. } => "DELETE_TEXT",
        }
    }

    pub fn path(&self) -> &NodePath {
        match self {
            Op::InsertNode { path, .. }
            | Op::DeleteNode { path }
            | Op::MoveNode { path }
            | Op::UpdateAttr { path, .. }
            | Op::UpdateText { path, .. }
            | Op::InsertText { path, .. }
            | Op::DeleteText { path, .. } => path,
        }
    }

    pub(crate) fn path_mut(&mut self) -> &mut NodePath {
        match self {
            Op::InsertNode { path, .. }
            | Op::DeleteNode { path }
            | Op::MoveNode { path }
            | Op::UpdateAttr { path, .. }
            | Op::UpdateText { path, .. }
            | Op::InsertText { path, .. }
            | Op::DeleteText { path, .. } => path,
        }
    }
}

/// An ordered, hash-tagged list of operations against one base document.
///
/// Immutable once produced; a delta only applies to a document whose raw
/// text hashes to `base_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub base_hash: String,
    pub operations: Vec<Op>,
    pub timestamp: i64,
    pub author: String,
}

impl Delta {
    /// Wraps `operations` into a delta stamped with the current time.
    pub fn new(base_hash: String, operations: Vec<Op>, author: &str) -> Delta {
        Delta {
            base_hash,
            operations,
            timestamp: unix_now(),
            author: author.to_string(),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A detected incompatibility between one operation from each side of a
/// three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub description: String,
    pub path: NodePath,
    pub ops: (Op, Op),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Two operations address the same node with incompatible intent.
    Direct,
    /// One side edits inside a subtree the other side deletes.
    Structure,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Direct => "Direct",
            ConflictKind::Structure => "Structure",
        }
    }
}

/// SHA-256 of the raw document text, lowercase hex.
///
/// The hash domain is the input bytes, not the parse-render canonical
/// form: a semantically equal but textually different base must fail the
/// gate.
pub fn base_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex_lower(&hasher.finalize())
}

fn hex_lower(data: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
