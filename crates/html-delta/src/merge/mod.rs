//! Three-way merge.
//!
//! Two deltas against the same base are reconciled in four steps: verify
//! both base hashes, look for conflicts pairwise, transform B's
//! operations over A's, then apply the concatenation A ++ B' atomically
//! through the patch engine. A's operations come first in the combined
//! delta, which is observable by callers.

mod transform;

use log::debug;
use thiserror::Error;

use crate::delta::{base_hash, Conflict, ConflictKind, Delta, NodePath, Op};
use crate::patch::{patch, PatchError};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("delta authored by {author:?} does not match the base document hash")]
    BaseMismatch { author: String },
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// What a merge produced: either a merged document plus the consolidated
/// delta, or the conflicts that prevented merging. A conflicted merge is
/// a successful report, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { html: String, delta: Delta },
    Conflicts(Vec<Conflict>),
}

/// Reconciles two concurrent deltas over `base_html`.
pub fn merge(
    base_html: &str,
    delta_a: &Delta,
    delta_b: &Delta,
) -> Result<MergeOutcome, MergeError> {
    let hash = base_hash(base_html);
    for delta in [delta_a, delta_b] {
        if delta.base_hash != hash {
            return Err(MergeError::BaseMismatch {
                author: delta.author.clone(),
            });
        }
    }

    let conflicts = detect_conflicts(&delta_a.operations, &delta_b.operations);
    if !conflicts.is_empty() {
        debug!("merge stopped on {} conflict(s)", conflicts.len());
        return Ok(MergeOutcome::Conflicts(conflicts));
    }

    let transformed = transform::transform(&delta_a.operations, &delta_b.operations);
    let mut operations = delta_a.operations.clone();
    operations.extend(transformed);

    let merged = Delta {
        base_hash: hash,
        operations,
        timestamp: delta_a.timestamp,
        author: "system-merge".to_string(),
    };
    let html = patch(base_html, &merged)?;
    Ok(MergeOutcome::Merged { html, delta: merged })
}

/// Folds a list of deltas into one merged result, aborting on the first
/// conflict or error. An empty list merges to the base document in its
/// parse-render form.
pub fn merge_all(base_html: &str, deltas: &[Delta]) -> Result<MergeOutcome, MergeError> {
    let Some((first, rest)) = deltas.split_first() else {
        let empty = Delta::new(base_hash(base_html), Vec::new(), "system-merge");
        let html = patch(base_html, &empty)?;
        return Ok(MergeOutcome::Merged { html, delta: empty });
    };

    let mut acc = first.clone();
    let mut html = None;
    for next in rest {
        match merge(base_html, &acc, next)? {
            MergeOutcome::Merged { html: merged, delta } => {
                acc = delta;
                html = Some(merged);
            }
            conflicted => return Ok(conflicted),
        }
    }
    let html = match html {
        Some(html) => html,
        None => patch(base_html, &acc)?,
    };
    Ok(MergeOutcome::Merged { html, delta: acc })
}

/// Pairwise classification of both operation lists.
///
/// Nodes collide on equal paths; INSERT_NODE addresses a (parent,
/// position) slot and never collides directly with node-addressed
/// operations. Granular text pairs are left to the transform rules.
pub(crate) fn detect_conflicts(ops_a: &[Op], ops_b: &[Op]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for a in ops_a {
        for b in ops_b {
            if let Some(description) = direct_conflict(a, b) {
                conflicts.push(Conflict {
                    kind: ConflictKind::Direct,
                    description,
                    path: b.path().clone(),
                    ops: (a.clone(), b.clone()),
                });
            }
            if let Op::DeleteNode { path } = a {
                if is_strict_descendant(path, b.path()) {
                    conflicts.push(structure_conflict(a, b, b.path().clone()));
                }
            }
            if let Op::DeleteNode { path } = b {
                if is_strict_descendant(path, a.path()) {
                    conflicts.push(structure_conflict(a, b, a.path().clone()));
                }
            }
        }
    }
    conflicts
}

fn structure_conflict(a: &Op, b: &Op, path: NodePath) -> Conflict {
    Conflict {
        kind: ConflictKind::Structure,
        description: "modification inside a subtree deleted by the other side".to_string(),
        path,
        ops: (a.clone(), b.clone()),
    }
}

fn direct_conflict(a: &Op, b: &Op) -> Option<String> {
    if a.path() != b.path() {
        return None;
    }
    match (a, b) {
        // Concurrent deletes of the same node are idempotent.
        (Op::DeleteNode { .. }, Op::DeleteNode { .. }) => None,
        // An insert's path names the parent slot, not the node a delete
        // names; order between concurrent inserts is resolved by
        // concatenation.
        (Op::DeleteNode { .. }, Op::InsertNode { .. })
        | (Op::InsertNode { .. }, Op::DeleteNode { .. }) => None,
        (Op::DeleteNode { .. }, other) | (other, Op::DeleteNode { .. }) => Some(format!(
            "node is deleted by one side and edited by the other ({})",
            other.op_name()
        )),
        (
            Op::UpdateText { new_value: va, .. },
            Op::UpdateText { new_value: vb, .. },
        ) => (va != vb).then(|| "concurrent text replacements disagree".to_string()),
        (Op::UpdateText { .. }, Op::InsertText { .. } | Op::DeleteText { .. })
        | (Op::InsertText { .. } | Op::DeleteText { .. }, Op::UpdateText { .. }) => {
            Some("atomic text replacement collides with a granular text edit".to_string())
        }
        (
            Op::UpdateAttr {
                key: ka,
                new_value: va,
                ..
            },
            Op::UpdateAttr {
                key: kb,
                new_value: vb,
                ..
            },
        ) => (ka == kb && va != vb)
            .then(|| format!("concurrent updates of attribute {ka:?} disagree")),
        _ => None,
    }
}

fn is_strict_descendant(ancestor: &NodePath, path: &NodePath) -> bool {
    path.len() > ancestor.len() && path[..ancestor.len()] == ancestor[..]
}
