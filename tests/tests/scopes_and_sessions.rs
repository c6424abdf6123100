//! Transform scopes, permissions and sessions.

use pul_session::{SessionError, SessionRegistry};
use pul_tests::prelude::*;

fn user() -> Principal {
    Principal::new("user")
}

// ==================== Transform scope ====================

#[test]
fn test_transform_edits_only_the_copy() {
    // GIVEN a copy of b taken from <a><b>t</b></a>
    let (mut catalog, s) = single("<a><b>t</b></a>");
    let copy = catalog.copy_node(s, 1).unwrap();
    let mut updates = Updates::transform([copy]);

    // WHEN
    updates.add(Primitive::rename(Target::new(copy, 0), "c"), &user(), &catalog).unwrap();
    updates
        .add(Primitive::replace_value(Target::new(copy, 1), "u"), &user(), &catalog)
        .unwrap();
    updates.commit(&mut catalog, &mut MemorySink::new()).unwrap();

    // THEN
    assert_eq!(document(&catalog, copy), "<c>u</c>");
    assert_eq!(document(&catalog, s), "<a><b>t</b></a>");
}

#[test]
fn test_transform_rejects_original_and_outer_effects() {
    let (mut catalog, s) = single("<a/>");
    let copy = catalog.copy_node(s, 0).unwrap();
    let mut updates = Updates::transform([copy]);

    let original = updates.add(Primitive::delete(Target::new(s, 0)), &user(), &catalog);
    let put = updates.add(Put::new(Target::new(copy, 0), "a.xml"), &user(), &catalog);
    let rename = updates.add(Update::store(copy, StoreOp::Rename("x".into())), &user(), &catalog);

    for result in [original, put, rename] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::CopyIsolation);
    }
    assert_eq!(updates.pending_count(), 0);
}

#[test]
fn test_copy_is_not_locked_against_the_original() {
    // GIVEN the original held by another snapshot
    let mut catalog = Catalog::new();
    let store = MemStore::parse("<a/>").unwrap();
    let lock = store.write_lock();
    let s = catalog.add("db", store).unwrap();
    let copy = catalog.copy_node(s, 0).unwrap();
    assert!(lock.try_acquire());

    // WHEN the copy is updated
    let mut updates = Updates::transform([copy]);
    updates
        .add(Primitive::insert_into(Target::new(copy, 0), elem("b").build()), &user(), &catalog)
        .unwrap();
    let result = updates.commit(&mut catalog, &mut MemorySink::new());

    // THEN
    assert!(result.is_ok());
    assert_eq!(document(&catalog, copy), "<a><b/></a>");
}

// ==================== Permissions ====================

#[test]
fn test_write_permission_per_source() {
    // GIVEN alice may write one but not two
    let mut catalog = Catalog::new();
    let one = catalog.add("one", MemStore::parse("<a/>").unwrap()).unwrap();
    let two = catalog.add("two", MemStore::parse("<b/>").unwrap()).unwrap();
    let alice = Principal::new("alice");
    let mut updates = Updates::new().with_permissions(AccessList::new().grant(alice.clone(), one));

    // WHEN
    let allowed = updates.add(Primitive::rename(Target::new(one, 0), "x"), &alice, &catalog);
    let denied = updates.add(Primitive::rename(Target::new(two, 0), "y"), &alice, &catalog);

    // THEN
    assert!(allowed.is_ok());
    match denied {
        Err(UpdateError::PermissionDenied { principal, resource }) => {
            assert_eq!(principal, "alice");
            assert_eq!(resource, "two");
        }
        other => panic!("expected permission error, got {:?}", other),
    }
    updates.commit(&mut catalog, &mut MemorySink::new()).unwrap();
    assert_eq!(document(&catalog, one), "<x/>");
    assert_eq!(document(&catalog, two), "<b/>");
}

// ==================== Sessions ====================

#[test]
fn test_sessions_commit_in_turn() {
    // GIVEN two sessions on the same document
    let (mut catalog, s) = single("<log/>");
    let registry = SessionRegistry::new();
    let mut sink = MemorySink::new();
    let mut first = registry.open(Principal::new("alice"));
    let mut second = registry.open(Principal::new("bob"));

    // WHEN both append an entry
    first
        .add(Primitive::insert_into(Target::new(s, 0), elem("alice").build()), &catalog)
        .unwrap();
    first.commit(&mut catalog, &mut sink, &registry).unwrap();
    second
        .add(Primitive::insert_into(Target::new(s, 0), elem("bob").build()), &catalog)
        .unwrap();
    second.commit(&mut catalog, &mut sink, &registry).unwrap();

    // THEN
    assert_eq!(document(&catalog, s), "<log><alice/><bob/></log>");
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn test_superseded_snapshot_is_cancelled_before_locking() {
    // GIVEN a snapshot of a session that is superseded by a newer one
    let (mut catalog, s) = single("<a/>");
    let registry = SessionRegistry::new();
    let mut session = registry.open(user());
    session.add(Primitive::rename(Target::new(s, 0), "b"), &catalog).unwrap();
    let stale = registry.begin(session.id());
    let _current = registry.begin(session.id());

    // WHEN the stale snapshot commits
    let result = session.commit_with(&mut catalog, &mut MemorySink::new(), &stale);

    // THEN nothing was locked or written
    assert!(result.as_ref().is_err_and(SessionError::is_cancelled));
    let store = catalog.get(s).unwrap();
    assert_eq!(store.stats().locks, 0);
    assert_eq!(document(&catalog, s), "<a/>");
}

#[test]
fn test_cancel_with_handle() {
    let (mut catalog, s) = single("<a/>");
    let mut updates = Updates::new();
    updates.add(Primitive::delete(Target::new(s, 0)), &user(), &catalog).unwrap();
    updates.add(Primitive::rename(Target::new(s, 0), "b"), &user(), &catalog).unwrap();
    let cancel = CancelHandle::new();
    cancel.cancel();

    let result = updates.commit_with(&mut catalog, &mut MemorySink::new(), &cancel);

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
    assert_eq!(document(&catalog, s), "<a/>");
}
