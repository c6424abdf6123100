//! Merging of primitives on the same node and their combined effect.

use pul_tests::prelude::*;
use pul_update::{NodeOp, NodeUpdates, UpdateKind};

fn frag(name: &str) -> Fragment {
    elem(name).build()
}

#[test]
fn test_insert_merge_is_associative() {
    // GIVEN three insert-before operations
    let (a, b, c) = (
        NodeOp::InsertBefore(frag("a")),
        NodeOp::InsertBefore(frag("b")),
        NodeOp::InsertBefore(frag("c")),
    );

    // WHEN merged as (a + b) + c and a + (b + c)
    let mut left = a.clone();
    left.merge(b.clone()).unwrap();
    left.merge(c.clone()).unwrap();

    let mut right_tail = b;
    right_tail.merge(c).unwrap();
    let mut right = a;
    right.merge(right_tail).unwrap();

    // THEN
    assert_eq!(left, right);
    assert_eq!(left.content().unwrap().len(), 3);
}

#[test]
fn test_delete_merge_is_idempotent() {
    let mut bucket = NodeUpdates::new();
    bucket.add(NodeOp::Delete { substituted: false }).unwrap();
    bucket.add(NodeOp::Delete { substituted: false }).unwrap();

    assert_eq!(bucket.len(), 1);
    assert!(bucket.destroys_target());
}

#[test]
fn test_insert_sequences_keep_arrival_order() {
    Scenario::new("insert_sequences")
        .document("db", "<a/>")
        .step(
            "insert_three",
            |u| {
                u.insert_into("db", 0, "<b/>")
                    .insert_into("db", 0, "<c/>")
                    .insert_into("db", 0, "<d/>")
            },
            |a| a.applied(1).xml("db", "<a><b/><c/><d/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_all_insert_positions_on_one_node() {
    // <a><m/></a>: a=0, m=1
    Scenario::new("insert_positions")
        .document("db", "<a><m/></a>")
        .step(
            "insert_everywhere",
            |u| {
                u.insert_into("db", 0, "<y/>")
                    .insert_into_first("db", 0, "<x/>")
                    .insert_before("db", 1, "<p/>")
                    .insert_after("db", 1, "<q/>")
            },
            |a| a.applied(4).xml("db", "<a><x/><p/><m/><q/><y/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_delete_dominates_other_edits() {
    // <a><b>t</b></a>: a=0, b=1, t=2
    Scenario::new("delete_dominance")
        .document("db", "<a><b>t</b></a>")
        .step(
            "rename_change_and_delete",
            |u| {
                u.rename("db", 1, "c")
                    .replace_value("db", 2, "u")
                    .insert_into("db", 1, "<z/>")
                    .delete("db", 1)
            },
            |a| a.xml("db", "<a/>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_delete_keeps_sibling_inserts() {
    Scenario::new("delete_with_sibling_inserts")
        .document("db", "<a><b/></a>")
        .step(
            "replace_by_inserts",
            |u| {
                u.insert_before("db", 1, "<p/>")
                    .delete("db", 1)
                    .insert_after("db", 1, "<q/>")
            },
            |a| a.applied(3).xml("db", "<a><p/><q/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_replace_node_overrides_delete() {
    Scenario::new("replace_and_delete")
        .document("db", "<a><b/></a>")
        .step(
            "delete_then_replace",
            |u| u.delete("db", 1).replace_node("db", 1, "<c/>"),
            |a| a.applied(1).xml("db", "<a><c/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_replace_node_with_sibling_inserts() {
    Scenario::new("replace_with_siblings")
        .document("db", "<a><b/></a>")
        .step(
            "replace_and_surround",
            |u| {
                u.replace_node("db", 1, "<c/>")
                    .insert_before("db", 1, "<p/>")
                    .insert_after("db", 1, "<q/>")
            },
            |a| a.applied(3).xml("db", "<a><p/><c/><q/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_later_replace_value_wins() {
    Scenario::new("replace_value_twice")
        .document("db", "<a>x</a>")
        .step(
            "two_values",
            |u| u.replace_value("db", 1, "first").replace_value("db", 1, "second"),
            |a| a.applied(1).xml("db", "<a>second</a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_conflicting_renames() {
    Scenario::new("conflicting_renames")
        .document("db", "<a><b/></a>")
        .step(
            "rename_twice",
            |u| u.rename("db", 1, "c").rename("db", 1, "d"),
            |a| a.error(ErrorKind::NameConflict).unchanged(),
        )
        .step(
            "rename_twice_to_same",
            |u| u.rename("db", 1, "c").rename("db", 1, "c"),
            |a| a.applied(1).xml("db", "<a><c/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_replace_element_content() {
    // <a><b/>x<c/></a>: a=0, b=1, x=2, c=3
    Scenario::new("replace_element_content")
        .document("db", "<a><b/>x<c/></a>")
        .step(
            "replace_content",
            |u| u.replace_element_content("db", 0, "new"),
            |a| a.applied(4).xml("db", "<a>new</a>"),
        )
        .step(
            "clear_content",
            |u| u.replace_element_content("db", 0, ""),
            |a| a.applied(1).xml("db", "<a/>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_replace_element_content_overrides_child_edits() {
    // <a><b/></a>: the insert-after on b and the insert-into on a are dropped
    Scenario::new("element_content_dominance")
        .document("db", "<a><b/></a>")
        .step(
            "content_and_inserts",
            |u| {
                u.insert_into("db", 0, "<z/>")
                    .insert_after("db", 1, "<q/>")
                    .rename("db", 1, "r")
                    .replace_element_content("db", 0, "t")
            },
            |a| a.applied(2).xml("db", "<a>t</a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_replace_element_content_keeps_rename_of_target() {
    Scenario::new("element_content_and_rename")
        .document("db", "<a>old</a>")
        .step(
            "content_and_rename",
            |u| u.replace_element_content("db", 0, "new").rename("db", 0, "b"),
            |a| a.xml("db", "<b>new</b>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_bucket_kinds_are_unique() {
    let mut bucket = NodeUpdates::new();
    for name in ["a", "b", "c"] {
        bucket.add(NodeOp::InsertAfter(frag(name))).unwrap();
    }
    bucket.add(NodeOp::Rename(QName::new("n"))).unwrap();

    let kinds: Vec<_> = bucket.iter().map(NodeOp::kind).collect();
    assert_eq!(kinds, vec![UpdateKind::Rename, UpdateKind::InsertAfter]);
}
