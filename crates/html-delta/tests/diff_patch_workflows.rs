//! End-to-end diff then patch workflows.
//!
//! Round trips compare under the parse-render canonical form: the
//! external parser normalizes documents, so equality of raw input text is
//! never the contract.

use html_delta::{base_hash, diff, patch, Delta, Document, Op, PatchError};

fn canonical(html: &str) -> String {
    Document::parse(html)
        .expect("parse")
        .render()
        .expect("render")
}

fn roundtrip(old: &str, new: &str) {
    let delta = diff(old, new, "author").expect("diff");
    let patched = patch(old, &delta).expect("patch");
    assert_eq!(canonical(&patched), canonical(new), "{old:?} -> {new:?}");
}

#[test]
fn diff_of_identical_documents_is_empty() {
    for html in [
        "<p>Hello</p>",
        "<!DOCTYPE html><html><head><title>t</title></head><body></body></html>",
        "<ul><li>A</li><li>B</li></ul>",
    ] {
        let delta = diff(html, html, "author").expect("diff");
        assert!(delta.operations.is_empty(), "{html:?}");
    }
}

#[test]
fn patch_reproduces_the_new_document() {
    roundtrip("<p>ABC</p>", "<p>A B C</p>");
    roundtrip("<p>Hello World</p>", "<p>Hello Brave World</p>");
    roundtrip(
        "<div class=\"a\">x</div>",
        "<div class=\"b\" id=\"n\">x</div>",
    );
    roundtrip("<div id=\"x\" class=\"a\">t</div>", "<div class=\"a\">t</div>");
    roundtrip("<ul><li>A</li></ul>", "<ul><li>A</li><li>B</li><li>C</li></ul>");
    roundtrip("<ul><li>A</li><li>B</li><li>C</li></ul>", "<ul><li>A</li></ul>");
    roundtrip(
        "<div><p>one</p><p>two</p></div>",
        "<div><p>uno</p><p>two!</p></div>",
    );
    roundtrip("<p>naïve café</p>", "<p>naïve cafés</p>");
    roundtrip("<div></div>", "<div><span>new</span>tail</div>");
}

#[test]
fn middle_text_edit_produces_the_minimal_pair_and_restores() {
    let base = "<p>ABC</p>";
    let delta = diff(base, "<p>A B C</p>", "author").expect("diff");
    assert_eq!(
        delta.operations,
        vec![
            Op::DeleteText {
                path: vec![0, 1, 0, 0],
                position: 1,
                old_value: "B".to_string(),
            },
            Op::InsertText {
                path: vec![0, 1, 0, 0],
                position: 1,
                new_value: " B ".to_string(),
            },
        ]
    );
    let patched = patch(base, &delta).expect("patch");
    assert!(patched.contains("<p>A B C</p>"));
}

#[test]
fn a_delta_only_applies_to_its_own_base() {
    let delta = diff("<p>v1</p>", "<p>v2</p>", "author").expect("diff");
    let err = patch("<p>v1 </p>", &delta).unwrap_err();
    assert!(matches!(err, PatchError::BaseMismatch { .. }));
}

#[test]
fn every_diff_path_addresses_the_expected_node_kind_in_the_base() {
    let old = "<div class=\"box\"><p>first</p><p>second</p><span>tail</span></div>";
    let new = "<div class=\"crate\"><p>first!</p><p>2nd</p></div>";
    let base = Document::parse(old).expect("parse");
    let delta = diff(old, new, "author").expect("diff");
    assert!(!delta.operations.is_empty());
    for op in &delta.operations {
        let id = base.resolve(op.path()).expect("resolves in base");
        match op {
            Op::UpdateAttr { .. } => {
                assert!(matches!(base.kind(id), html_delta::NodeKind::Element(_)))
            }
            Op::UpdateText { .. } | Op::InsertText { .. } | Op::DeleteText { .. } => {
                assert!(matches!(base.kind(id), html_delta::NodeKind::Text(_)))
            }
            _ => {}
        }
    }
}

#[test]
fn deltas_survive_the_wire_format() {
    let base = "<ul><li>A</li></ul>";
    let delta = diff(base, "<ul><li>A!</li><li>B</li></ul>", "alice").expect("diff");

    let encoded = delta.to_json_string();
    let decoded = Delta::from_json_string(&encoded).expect("decode");
    assert_eq!(decoded, delta);

    let patched = patch(base, &decoded).expect("patch");
    assert!(patched.contains("<ul><li>A!</li><li>B</li></ul>"));
}

#[test]
fn base_hash_matches_a_locally_computed_digest() {
    let base = "<p>pin the domain</p>";
    let delta = diff(base, "<p>changed</p>", "author").expect("diff");
    assert_eq!(delta.base_hash, base_hash(base));
    assert_eq!(delta.base_hash.len(), 64);
}

#[test]
fn doctype_presence_participates_in_child_indexing() {
    // with a doctype the <html> element is the document's second child
    let old = "<!DOCTYPE html><p>a</p>";
    let new = "<!DOCTYPE html><p>b</p>";
    let delta = diff(old, new, "author").expect("diff");
    assert_eq!(delta.operations.len(), 1);
    assert_eq!(delta.operations[0].path(), &vec![1, 1, 0, 0]);
    roundtrip(old, new);
}

#[test]
fn whitespace_only_text_nodes_are_addressable_children() {
    let old = "<ul> <li>A</li> </ul>";
    let new = "<ul> <li>B</li> </ul>";
    let delta = diff(old, new, "author").expect("diff");
    // the li is the second child of the ul, behind the whitespace text
    assert_eq!(delta.operations.len(), 1);
    assert_eq!(delta.operations[0].path(), &vec![0, 1, 0, 1, 0]);
    roundtrip(old, new);
}
