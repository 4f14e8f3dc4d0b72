//! Patch applier.
//!
//! Replays a delta's operations against the base document. The base hash
//! gates the whole call; afterwards every operation resolves its path
//! against the current, possibly already mutated tree and checks its own
//! preconditions. The first failing operation aborts the call with its
//! index and kind; no partial result is returned.

use log::{debug, trace};
use thiserror::Error;

use crate::delta::{base_hash, Delta, Op};
use crate::dom::{fragment_roots, Document, DomError, NodeKind};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("base hash mismatch: delta expects {expected}, document hashes to {actual}")]
    BaseMismatch { expected: String, actual: String },
    #[error("operation {index} ({kind}) failed: {source}")]
    Op {
        index: usize,
        kind: &'static str,
        #[source]
        source: ApplyError,
    },
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Failure of a single operation's preconditions or addressing.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Path(#[from] DomError),
    #[error("target is not a text node")]
    NotText,
    #[error("target is not an element")]
    NotElement,
    #[error("text position {position} is invalid for a payload of {len} bytes")]
    InvalidPosition { position: usize, len: usize },
    #[error("text precondition failed: expected {expected:?}, found {found:?}")]
    ValueMismatch { expected: String, found: String },
    #[error("cannot delete a node without a parent")]
    Orphan,
    #[error("MOVE_NODE is reserved and cannot be applied")]
    Unsupported,
}

/// Applies `delta` to `base_html` and returns the patched document text.
pub fn patch(base_html: &str, delta: &Delta) -> Result<String, PatchError> {
    let actual = base_hash(base_html);
    if actual != delta.base_hash {
        return Err(PatchError::BaseMismatch {
            expected: delta.base_hash.clone(),
            actual,
        });
    }

    let mut doc = Document::parse(base_html)?;
    debug!("applying {} operation(s)", delta.operations.len());
    for (index, op) in delta.operations.iter().enumerate() {
        trace!("op {index}: {}", op.op_name());
        apply_op(&mut doc, op).map_err(|source| PatchError::Op {
            index,
            kind: op.op_name(),
            source,
        })?;
    }
    Ok(doc.render()?)
}

fn apply_op(doc: &mut Document, op: &Op) -> Result<(), ApplyError> {
    match op {
        Op::UpdateText {
            path,
            old_value,
            new_value,
        } => {
            let id = doc.resolve(path)?;
            let NodeKind::Text(payload) = doc.kind_mut(id) else {
                return Err(ApplyError::NotText);
            };
            if *payload != *old_value {
                return Err(ApplyError::ValueMismatch {
                    expected: old_value.clone(),
                    found: payload.clone(),
                });
            }
            *payload = new_value.clone();
            Ok(())
        }

        Op::InsertText {
            path,
            position,
            new_value,
        } => {
            let id = doc.resolve(path)?;
            let NodeKind::Text(payload) = doc.kind_mut(id) else {
                return Err(ApplyError::NotText);
            };
            if !payload.is_char_boundary(*position) {
                return Err(ApplyError::InvalidPosition {
                    position: *position,
                    len: payload.len(),
                });
            }
            payload.insert_str(*position, new_value);
            Ok(())
        }

        Op::DeleteText {
            path,
            position,
            old_value,
        } => {
            let id = doc.resolve(path)?;
            let NodeKind::Text(payload) = doc.kind_mut(id) else {
                return Err(ApplyError::NotText);
            };
            let end = position + old_value.len();
            if !payload.is_char_boundary(*position) || !payload.is_char_boundary(end) {
                return Err(ApplyError::InvalidPosition {
                    position: *position,
                    len: payload.len(),
                });
            }
            if &payload[*position..end] != old_value.as_str() {
                return Err(ApplyError::ValueMismatch {
                    expected: old_value.clone(),
                    found: payload[*position..end].to_string(),
                });
            }
            payload.replace_range(*position..end, "");
            Ok(())
        }

        Op::UpdateAttr {
            path, key, new_value, ..
        } => {
            let id = doc.resolve(path)?;
            let NodeKind::Element(el) = doc.kind_mut(id) else {
                return Err(ApplyError::NotElement);
            };
            // old_value is informational: the applier is lenient about
            // attribute preconditions, and the merge engine relies on the
            // same behavior.
            match new_value {
                Some(value) => el.set_attr(key, value),
                None => el.remove_attr(key),
            }
            Ok(())
        }

        Op::InsertNode {
            path,
            position,
            node_data,
        } => {
            let parent = doc.resolve(path)?;
            let context = match doc.kind(parent) {
                NodeKind::Element(el) => el.tag.clone(),
                _ => "body".to_string(),
            };
            let fragment = Document::parse_fragment(node_data, &context);
            let roots = fragment_roots(&fragment);
            // An empty payload inserts nothing.
            let Some(&first) = roots.first() else {
                return Ok(());
            };
            let adopted = doc.adopt_subtree(&fragment, first);
            doc.insert_child_at(parent, *position, adopted);
            Ok(())
        }

        Op::DeleteNode { path } => {
            let id = doc.resolve(path)?;
            if doc.parent(id).is_none() {
                return Err(ApplyError::Orphan);
            }
            doc.detach(id);
            Ok(())
        }

        Op::MoveNode { .. } => Err(ApplyError::Unsupported),
    }
}
