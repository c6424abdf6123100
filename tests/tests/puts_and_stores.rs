//! Puts, whole-store operations and write-back.

use pul_tests::prelude::*;

// ==================== Puts ====================

#[test]
fn test_put_serializes_updated_node() {
    // <a><b/></a>: the put follows b while it moves and is renamed
    Scenario::new("put_after_update")
        .document("db", "<a><b/></a>")
        .step(
            "rename_and_put",
            |u| {
                u.put("db", 1, "b.xml")
                    .rename("db", 1, "c")
                    .insert_before("db", 1, "<z/>")
            },
            |a| a.puts(1).written("b.xml", "<c/>").xml("db", "<a><z/><c/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_puts_on_one_node_are_merged() {
    Scenario::new("two_locations")
        .document("db", "<a>t</a>")
        .step(
            "put_twice",
            |u| u.put("db", 0, "one.xml").put("db", 0, "two.xml"),
            |a| a.puts(2).written("one.xml", "<a>t</a>").written("two.xml", "<a>t</a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_put_inside_deleted_subtree_is_dangling() {
    // <a><b><c/></b></a>: a=0, b=1, c=2
    Scenario::new("dangling_put")
        .document("db", "<a><b><c/></b></a>")
        .step(
            "delete_parent",
            |u| u.put("db", 2, "c.xml").delete("db", 1),
            |a| a.error(ErrorKind::DanglingTarget).unchanged(),
        )
        .run()
        .unwrap();
}

#[test]
fn test_put_on_dropped_store_is_dangling() {
    Scenario::new("put_on_dropped")
        .document("db", "<a/>")
        .step(
            "drop_and_put",
            |u| u.put("db", 0, "a.xml").drop_store("db"),
            |a| a.error(ErrorKind::DanglingTarget).unchanged(),
        )
        .run()
        .unwrap();
}

#[test]
fn test_duplicate_put_location() {
    Scenario::new("duplicate_location")
        .document("one", "<a/>")
        .document("two", "<b/>")
        .step(
            "same_location",
            |u| u.put("one", 0, "out.xml").put("two", 0, "out.xml"),
            |a| a.error(ErrorKind::DuplicateExternalTarget).unchanged(),
        )
        .step(
            "same_node_same_location",
            |u| u.put("one", 0, "out.xml").put("one", 0, "out.xml"),
            |a| a.error(ErrorKind::DuplicateExternalTarget),
        )
        .run()
        .unwrap();
}

/// Ten edits on `<r><a/>..<j/></r>`: r=0, a=1 .. j=10.
fn ten_edits(mut u: Operations) -> Operations {
    for (pre, name) in [(1, "n1"), (2, "n2"), (3, "n3"), (4, "n4"), (5, "n5")] {
        u = u.rename("db", pre, name);
    }
    u.insert_after("db", 6, "<x/>")
        .insert_after("db", 7, "<y/>")
        .insert_after("db", 8, "<z/>")
        .delete("db", 9)
        .insert_into("db", 10, "<k/>")
}

#[test]
fn test_duplicate_put_location_blocks_all_edits() {
    Scenario::new("duplicate_location_with_edits")
        .document("db", "<r><a/><b/><c/><d/><e/><f/><g/><h/><i/><j/></r>")
        .step(
            "edits_and_clashing_puts",
            |u| ten_edits(u).put("db", 5, "out.xml").put("db", 6, "out.xml"),
            |a| a.error(ErrorKind::DuplicateExternalTarget).unchanged(),
        )
        .step(
            "edits_and_distinct_puts",
            |u| ten_edits(u).put("db", 5, "five.xml").put("db", 6, "six.xml"),
            |a| {
                a.applied(10)
                    .puts(2)
                    .xml("db", "<r><n1/><n2/><n3/><n4/><n5/><f/><x/><g/><y/><h/><z/><j><k/></j></r>")
                    .written("five.xml", "<n5/>")
                    .written("six.xml", "<f/>")
            },
        )
        .run()
        .unwrap();
}

#[test]
fn test_put_limit() {
    Scenario::new("put_limit")
        .document("db", "<a><b/></a>")
        .options(UpdateOptions::default().with_max_put_targets(1))
        .step(
            "two_puts",
            |u| u.put("db", 0, "a.xml").put("db", 1, "b.xml"),
            |a| a.error(ErrorKind::InvalidTarget),
        )
        .run()
        .unwrap();
}

#[test]
fn test_put_of_text_rejected() {
    Scenario::new("put_text")
        .document("db", "<a>t</a>")
        .step("put_text", |u| u.put("db", 1, "t.xml"), |a| a.error(ErrorKind::InvalidTarget))
        .run()
        .unwrap();
}

#[test]
fn test_failing_sink_is_fatal_and_keeps_edits() {
    Scenario::new("failing_sink")
        .document("db", "<a/>")
        .failing_sink(0)
        .step(
            "edit_and_put",
            |u| u.insert_into("db", 0, "<b/>").put("db", 0, "a.xml"),
            |a| a.fatal().xml("db", "<a><b/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_locks_released_after_fatal_error() {
    // GIVEN a sink that fails on the first write
    let (mut catalog, s) = single("<a/>");
    let user = Principal::new("user");
    let mut sink = MemorySink::failing();
    let mut updates = Updates::new();
    updates.add(Put::new(Target::new(s, 0), "a.xml"), &user, &catalog).unwrap();

    // WHEN
    let result = updates.commit(&mut catalog, &mut sink);

    // THEN the source can be locked again
    assert!(result.as_ref().is_err_and(UpdateError::is_fatal));
    assert!(catalog.get_mut(s).unwrap().start_write().is_ok());
}

// ==================== Store operations ====================

#[test]
fn test_rename_store() {
    Scenario::new("rename_store")
        .document("db", "<a/>")
        .step(
            "rename",
            |u| u.rename_store("db", "archive").insert_into("db", 0, "<b/>"),
            |a| a.applied(1).missing("db").xml("archive", "<a><b/></a>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_rename_store_conflicts() {
    Scenario::new("rename_store_conflicts")
        .document("one", "<a/>")
        .document("two", "<b/>")
        .step(
            "onto_existing",
            |u| u.rename_store("one", "two"),
            |a| a.error(ErrorKind::NameConflict).unchanged(),
        )
        .step(
            "both_to_same",
            |u| u.rename_store("one", "three").rename_store("two", "three"),
            |a| a.error(ErrorKind::NameConflict).unchanged(),
        )
        .step(
            "swap",
            |u| u.rename_store("one", "two").rename_store("two", "one"),
            |a| a.error(ErrorKind::NameConflict).unchanged(),
        )
        .step(
            "two_names",
            |u| u.rename_store("one", "x").rename_store("one", "y"),
            |a| a.error(ErrorKind::NameConflict),
        )
        .step(
            "invalid_name",
            |u| u.rename_store("one", "bad name"),
            |a| a.error(ErrorKind::InvalidTarget),
        )
        .step(
            "swap_free_name",
            |u| u.rename_store("one", "one-renamed"),
            |a| a.missing("one").xml("one-renamed", "<a/>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_drop_store() {
    Scenario::new("drop_store")
        .document("db", "<a/>")
        .document("keep", "<b/>")
        .step(
            "drop",
            |u| u.drop_store("db").insert_into("keep", 0, "<c/>"),
            |a| a.missing("db").xml("keep", "<b><c/></b>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_optimize_store() {
    Scenario::new("optimize")
        .document("db", "<a/>")
        .step("optimize", |u| u.optimize("db").optimize("db"), |a| a.applied(0).xml("db", "<a/>"))
        .run()
        .unwrap();
}

// ==================== Write-back ====================

#[test]
fn test_write_back_to_backing_location() {
    Scenario::new("write_back")
        .backed_document("db", "<a/>", "db.xml")
        .backed_document("idle", "<b/>", "idle.xml")
        .options(UpdateOptions::default().with_write_back(true))
        .step(
            "edit",
            |u| u.insert_into("db", 0, "<c/>").put("idle", 0, "copy.xml"),
            |a| a.exported(1).written("db.xml", "<a><c/></a>").written("copy.xml", "<b/>"),
        )
        .run()
        .unwrap();
}

#[test]
fn test_no_write_back_by_default() {
    let (_, sink) = Scenario::new("no_write_back")
        .backed_document("db", "<a/>", "db.xml")
        .step("edit", |u| u.insert_into("db", 0, "<c/>"), |a| a.exported(0))
        .run()
        .unwrap();

    assert!(sink.get("db.xml").is_none());
}

#[test]
fn test_write_back_to_files() {
    // GIVEN a backed document and a file sink in a temporary directory
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::new();
    let store = MemStore::parse("<a/>").unwrap().with_backing("data/db.xml");
    let s = catalog.add("db", store).unwrap();
    let mut sink = FileSink::new(dir.path());
    let user = Principal::new("user");
    let mut updates = Updates::new().with_options(UpdateOptions::default().with_write_back(true));

    // WHEN
    updates
        .add(Primitive::insert_into(Target::new(s, 0), elem("b").build()), &user, &catalog)
        .unwrap();
    updates
        .add(Put::new(Target::new(s, 0), "exports/a.xml"), &user, &catalog)
        .unwrap();
    let report = updates.commit(&mut catalog, &mut sink).unwrap();

    // THEN
    assert_eq!(report.exported, 1);
    assert_eq!(report.puts, 1);
    let written = std::fs::read_to_string(dir.path().join("data/db.xml")).unwrap();
    assert_eq!(written, "<a><b/></a>");
    let exported = std::fs::read_to_string(dir.path().join("exports/a.xml")).unwrap();
    assert_eq!(exported, "<a><b/></a>");
}
