//! Operational-transformation rules.
//!
//! `transform(accepted, proposed)` rewrites the proposed operations so
//! they can run after the accepted operations have already been applied:
//! sibling indices and positions shift under node insertions/deletions,
//! text positions shift under text splices. A rule may drop a proposed
//! operation entirely; deletions overlapping an accepted deletion are
//! treated as consumed rather than split.

use crate::delta::{NodePath, Op};

/// Folds every proposed operation through the accepted list, in order.
pub(crate) fn transform(accepted: &[Op], proposed: &[Op]) -> Vec<Op> {
    let mut proposed = proposed.to_vec();
    for acc in accepted {
        let mut next = Vec::with_capacity(proposed.len());
        for op in &proposed {
            next.extend(transform_one(acc, op));
        }
        proposed = next;
    }
    proposed
}

fn transform_one(accepted: &Op, proposed: &Op) -> Vec<Op> {
    match accepted {
        Op::InsertNode { path, position, .. } => x_insert_node(path, *position, proposed),
        Op::DeleteNode { path } => x_delete_node(path, proposed),
        Op::InsertText {
            path,
            position,
            new_value,
        } => x_insert_text(path, *position, new_value.len(), proposed),
        Op::DeleteText {
            path,
            position,
            old_value,
        } => x_delete_text(path, *position, old_value.len(), proposed),
        // UPDATE_ATTR and UPDATE_TEXT shift nothing.
        _ => vec![proposed.clone()],
    }
}

/// The index `path` carries at the child level directly below `parent`,
/// when `path` runs through that level at all.
fn sibling_index(parent: &[usize], path: &NodePath) -> Option<usize> {
    if path.len() > parent.len() && path[..parent.len()] == *parent {
        Some(path[parent.len()])
    } else {
        None
    }
}

fn x_insert_node(parent: &NodePath, position: usize, op: &Op) -> Vec<Op> {
    if let Op::InsertNode {
        path,
        position: op_position,
        node_data,
    } = op
    {
        if path == parent {
            // Sibling insert into the same parent: an accepted insert at or
            // before the proposed position pushes it right.
            let mut op_position = *op_position;
            if position <= op_position {
                op_position += 1;
            }
            return vec![Op::InsertNode {
                path: path.clone(),
                position: op_position,
                node_data: node_data.clone(),
            }];
        }
    }
    if let Some(index) = sibling_index(parent, op.path()) {
        if position <= index {
            let mut shifted = op.clone();
            shifted.path_mut()[parent.len()] += 1;
            return vec![shifted];
        }
    }
    vec![op.clone()]
}

fn x_delete_node(deleted: &NodePath, op: &Op) -> Vec<Op> {
    // A concurrent delete of the same node is idempotent: the accepted
    // side already removed it, so the proposed delete is consumed.
    if let Op::DeleteNode { path } = op {
        if path == deleted {
            return vec![];
        }
    }
    let Some((&deleted_index, parent)) = deleted.split_last() else {
        return vec![op.clone()];
    };
    if let Op::InsertNode {
        path,
        position: op_position,
        node_data,
    } = op
    {
        if path.as_slice() == parent {
            let mut op_position = *op_position;
            if deleted_index < op_position {
                op_position -= 1;
            }
            return vec![Op::InsertNode {
                path: path.clone(),
                position: op_position,
                node_data: node_data.clone(),
            }];
        }
    }
    if let Some(index) = sibling_index(parent, op.path()) {
        if deleted_index < index {
            let mut shifted = op.clone();
            shifted.path_mut()[parent.len()] -= 1;
            return vec![shifted];
        }
        // index == deleted_index: the op runs through the deleted child.
        // Ops strictly below it were flagged as Structure conflicts
        // before the transform ran. An insert whose parent is the deleted
        // node itself is never flagged, slips through here, and keeps its
        // stale path.
    }
    vec![op.clone()]
}

fn x_insert_text(path: &NodePath, ins_pos: usize, ins_len: usize, op: &Op) -> Vec<Op> {
    match op {
        Op::InsertText {
            path: op_path,
            position,
            new_value,
        } if op_path == path => {
            let mut position = *position;
            // Ties shift the proposed side right: the accepted insert
            // keeps its place.
            if position >= ins_pos {
                position += ins_len;
            }
            vec![Op::InsertText {
                path: op_path.clone(),
                position,
                new_value: new_value.clone(),
            }]
        }
        Op::DeleteText {
            path: op_path,
            position,
            old_value,
        } if op_path == path => {
            let mut position = *position;
            if position >= ins_pos {
                position += ins_len;
            }
            vec![Op::DeleteText {
                path: op_path.clone(),
                position,
                old_value: old_value.clone(),
            }]
        }
        _ => vec![op.clone()],
    }
}

fn x_delete_text(path: &NodePath, del_pos: usize, del_len: usize, op: &Op) -> Vec<Op> {
    let del_end = del_pos + del_len;
    match op {
        Op::InsertText {
            path: op_path,
            position,
            new_value,
        } if op_path == path => {
            let mut position = *position;
            if position >= del_end {
                position -= del_len;
            } else if position >= del_pos {
                // The insertion point fell inside the removed range; it
                // lands where the deletion happened.
                position = del_pos;
            }
            vec![Op::InsertText {
                path: op_path.clone(),
                position,
                new_value: new_value.clone(),
            }]
        }
        Op::DeleteText {
            path: op_path,
            position,
            old_value,
        } if op_path == path => {
            let position = *position;
            if position >= del_end {
                return vec![Op::DeleteText {
                    path: op_path.clone(),
                    position: position - del_len,
                    old_value: old_value.clone(),
                }];
            }
            if position >= del_pos {
                // Starts inside the accepted deletion: consumed.
                return vec![];
            }
            if position + old_value.len() > del_pos {
                // Left overlap with the accepted deletion: consumed.
                return vec![];
            }
            vec![op.clone()]
        }
        _ => vec![op.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins_node(path: NodePath, position: usize) -> Op {
        Op::InsertNode {
            path,
            position,
            node_data: "<li>x</li>".to_string(),
        }
    }

    fn ins_text(path: NodePath, position: usize, s: &str) -> Op {
        Op::InsertText {
            path,
            position,
            new_value: s.to_string(),
        }
    }

    fn del_text(path: NodePath, position: usize, s: &str) -> Op {
        Op::DeleteText {
            path,
            position,
            old_value: s.to_string(),
        }
    }

    #[test]
    fn sibling_insert_pushes_a_later_insert_right() {
        let out = transform(&[ins_node(vec![0, 1], 0)], &[ins_node(vec![0, 1], 2)]);
        assert_eq!(out, vec![ins_node(vec![0, 1], 3)]);
    }

    #[test]
    fn sibling_insert_leaves_an_earlier_insert_alone() {
        let out = transform(&[ins_node(vec![0, 1], 3)], &[ins_node(vec![0, 1], 1)]);
        assert_eq!(out, vec![ins_node(vec![0, 1], 1)]);
    }

    #[test]
    fn insert_shifts_paths_through_later_siblings() {
        // accepted insert at index 1; proposed edits below sibling 2
        let accepted = ins_node(vec![0, 1], 1);
        let proposed = del_text(vec![0, 1, 2, 0], 0, "x");
        let out = transform(&[accepted], &[proposed]);
        assert_eq!(out, vec![del_text(vec![0, 1, 3, 0], 0, "x")]);
    }

    #[test]
    fn delete_shifts_paths_through_later_siblings_left() {
        let accepted = Op::DeleteNode { path: vec![0, 1, 1] };
        let proposed = ins_text(vec![0, 1, 3, 0], 2, "y");
        let out = transform(&[accepted], &[proposed]);
        assert_eq!(out, vec![ins_text(vec![0, 1, 2, 0], 2, "y")]);
    }

    #[test]
    fn delete_adjusts_a_sibling_insert_position() {
        let accepted = Op::DeleteNode { path: vec![0, 1, 0] };
        let proposed = ins_node(vec![0, 1], 2);
        let out = transform(&[accepted], &[proposed]);
        assert_eq!(out, vec![ins_node(vec![0, 1], 1)]);
    }

    #[test]
    fn concurrent_node_deletes_consume_the_proposed_one() {
        let accepted = Op::DeleteNode { path: vec![0, 1, 2] };
        let proposed = Op::DeleteNode { path: vec![0, 1, 2] };
        assert!(transform(&[accepted], &[proposed]).is_empty());
    }

    #[test]
    fn delete_at_the_proposed_index_leaves_it_untouched() {
        // the conflict detector owns this case
        let accepted = Op::DeleteNode { path: vec![0, 1, 2] };
        let proposed = del_text(vec![0, 1, 2, 0], 0, "x");
        let out = transform(&[accepted], &[proposed]);
        assert_eq!(out, vec![del_text(vec![0, 1, 2, 0], 0, "x")]);
    }

    #[test]
    fn text_insert_shifts_later_positions_right_with_tie_to_accepted() {
        let path = vec![0, 1, 0, 0];
        let out = transform(
            &[ins_text(path.clone(), 2, "XY")],
            &[ins_text(path.clone(), 2, "z"), ins_text(path.clone(), 5, "w")],
        );
        assert_eq!(
            out,
            vec![ins_text(path.clone(), 4, "z"), ins_text(path, 7, "w")]
        );
    }

    #[test]
    fn text_delete_shifts_later_positions_left() {
        let path = vec![0, 1, 0, 0];
        let out = transform(&[del_text(path.clone(), 2, "abc")], &[ins_text(path.clone(), 8, "!")]);
        assert_eq!(out, vec![ins_text(path, 5, "!")]);
    }

    #[test]
    fn insert_inside_a_deleted_range_clamps_to_the_deletion_point() {
        let path = vec![0, 1, 0, 0];
        let out = transform(&[del_text(path.clone(), 2, "abcd")], &[ins_text(path.clone(), 4, "!")]);
        assert_eq!(out, vec![ins_text(path, 2, "!")]);
    }

    #[test]
    fn delete_starting_inside_an_accepted_deletion_is_dropped() {
        let path = vec![0, 1, 0, 0];
        let out = transform(&[del_text(path.clone(), 2, "abcd")], &[del_text(path, 3, "bc")]);
        assert!(out.is_empty());
    }

    #[test]
    fn delete_overlapping_from_the_left_is_dropped() {
        let path = vec![0, 1, 0, 0];
        let out = transform(&[del_text(path.clone(), 2, "cd")], &[del_text(path, 0, "abc")]);
        assert!(out.is_empty());
    }

    #[test]
    fn disjoint_text_deletes_both_survive() {
        let path = vec![0, 1, 0, 0];
        let out = transform(&[del_text(path.clone(), 5, "xy")], &[del_text(path.clone(), 0, "ab")]);
        assert_eq!(out, vec![del_text(path, 0, "ab")]);
    }

    #[test]
    fn updates_pass_through_untouched() {
        let attr = Op::UpdateAttr {
            path: vec![0, 1, 0],
            key: "class".to_string(),
            old_value: None,
            new_value: Some("x".to_string()),
        };
        let out = transform(
            &[ins_text(vec![0, 1, 0, 0], 0, "z")],
            &[attr.clone()],
        );
        assert_eq!(out, vec![attr]);
    }

    #[test]
    fn ops_on_other_nodes_are_unaffected_by_text_edits() {
        let a = ins_text(vec![0, 1, 0, 0], 0, "z");
        let b = del_text(vec![0, 1, 1, 0], 4, "q");
        assert_eq!(transform(&[a], &[b.clone()]), vec![b]);
    }
}
