//! Transaction operation tests.
//!
//! Each test opens its own in-memory store with every fixture registered.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]

mod common;

use coffer::{Action, Cause, Scalar, ScalarKind};
use common::{Counter, Listing, Person, Setting, Track, registered_store, store};

// ============================================
// Insert
// ============================================

#[test]
fn test_insert_unregistered() {
    let store = store();
    let err = store.write(|tx| tx.insert(&mut Person::new(1, "a"))).unwrap_err();
    assert_eq!(err.to_string(), r#"Insert: fixture.Person: unregistered record type "fixture.Person""#);
}

#[test]
fn test_insert_and_get() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Person::new(1, "ada"))).unwrap();

    let person: Person = store.read(|tx| tx.get(1i64)).unwrap();
    assert_eq!(person, Person::new(1, "ada"));
}

#[test]
fn test_insert_duplicate() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Person::new(1, "a"))).unwrap();

    let err = store.write(|tx| tx.insert(&mut Person::new(1, "b"))).unwrap_err();
    assert!(matches!(err.cause(), Cause::DuplicateKey { .. }));
    assert_eq!(err.to_string(), "Insert: fixture.Person: item with ID 1 already exists");

    let person: Person = store.read(|tx| tx.get(1i64)).unwrap();
    assert_eq!(person.name, "a");
}

#[test]
fn test_insert_duplicate_within_one_transaction() {
    let store = registered_store();
    let err = store
        .write(|tx| {
            tx.insert(&mut Person::new(7, "a"))?;
            tx.insert(&mut Person::new(7, "b"))
        })
        .unwrap_err();
    assert!(matches!(err.cause(), Cause::DuplicateKey { .. }));
    assert_eq!(store.read(|tx| tx.count::<Person>()).unwrap(), 0);
}

#[test]
fn test_insert_negative_and_positive_ids() {
    let store = registered_store();
    store
        .write(|tx| {
            for id in [-3i64, 5, -1, 0, i64::MIN, i64::MAX] {
                tx.insert(&mut Person::new(id, &format!("p{id}")))?;
            }
            Ok(())
        })
        .unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.count::<Person>()?, 6);
            for id in [-3i64, 5, -1, 0, i64::MIN, i64::MAX] {
                assert_eq!(tx.get::<Person>(id)?.name, format!("p{id}"));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_insert_multi_field_index() {
    let store = registered_store();
    let mut listing = Listing {
        id: 4,
        name: "lamp".to_string(),
        visible: true,
        notes: vec!["brass".to_string()],
    };
    store.write(|tx| tx.insert(&mut listing)).unwrap();

    store
        .read(|tx| {
            let by_all = tx.find::<Listing>(
                &["ID", "Visible", "Name"],
                &[Scalar::I64(4), Scalar::Bool(true), Scalar::from("lamp")],
            )?;
            assert_eq!(by_all, vec![listing.clone()]);

            let hidden = tx.find::<Listing>(
                &["ID", "Visible", "Name"],
                &[Scalar::I64(4), Scalar::Bool(false), Scalar::from("lamp")],
            )?;
            assert!(hidden.is_empty());

            assert_eq!(tx.find::<Listing>(&["Name"], &[Scalar::from("lamp")])?.len(), 1);
            Ok(())
        })
        .unwrap();
}

// ============================================
// Non-integer IDs
// ============================================

#[test]
fn test_string_id_insert_and_get() {
    let store = registered_store();
    store
        .write(|tx| {
            tx.insert(&mut Setting::new("theme", 1))?;
            tx.insert(&mut Setting::new("lang", 2))
        })
        .unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.get::<Setting>("theme")?, Setting::new("theme", 1));
            assert_eq!(tx.get::<Setting>("lang")?, Setting::new("lang", 2));
            assert!(tx.get::<Setting>("missing").unwrap_err().is_not_found());
            assert_eq!(tx.count::<Setting>()?, 2);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_string_id_duplicate() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Setting::new("theme", 1))).unwrap();
    let err = store.write(|tx| tx.insert(&mut Setting::new("theme", 9))).unwrap_err();
    assert_eq!(err.to_string(), r#"Insert: fixture.Setting: item with ID "theme" already exists"#);
}

#[test]
fn test_string_id_update_upsert_delete() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Setting::new("theme", 1))).unwrap();
    store.write(|tx| tx.update(&Setting::new("theme", 2))).unwrap();
    store
        .write(|tx| {
            tx.upsert(&mut Setting::new("theme", 3))?;
            tx.upsert(&mut Setting::new("font", 4))
        })
        .unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.get::<Setting>("theme")?.value, 3);
            assert_eq!(tx.get::<Setting>("font")?.value, 4);
            assert!(tx.find::<Setting>(&["Value"], &[Scalar::I32(2)])?.is_empty());
            assert_eq!(tx.find::<Setting>(&["Value"], &[Scalar::I32(3)])?.len(), 1);
            Ok(())
        })
        .unwrap();

    store.write(|tx| tx.delete_by_id::<Setting>("theme")).unwrap();
    store
        .read(|tx| {
            assert!(tx.get::<Setting>("theme").unwrap_err().is_not_found());
            assert_eq!(tx.count::<Setting>()?, 1);
            Ok(())
        })
        .unwrap();

    // A fresh insert of the deleted key works again.
    store.write(|tx| tx.insert(&mut Setting::new("theme", 5))).unwrap();
}

#[test]
fn test_update_missing_string_id() {
    let store = registered_store();
    let err = store.write(|tx| tx.update(&Setting::new("ghost", 1))).unwrap_err();
    assert!(err.is_not_found());
}

// ============================================
// Auto-increment
// ============================================

#[test]
fn test_auto_increment_assigns_sequential_ids() {
    let store = registered_store();
    let ids = store
        .write(|tx| {
            let mut ids = Vec::new();
            for label in ["a", "b", "c"] {
                let mut counter = Counter { id: 0, label: label.to_string() };
                tx.insert(&mut counter)?;
                ids.push(counter.id);
            }
            Ok(ids)
        })
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    let mut next = Counter::default();
    store.write(|tx| tx.insert(&mut next)).unwrap();
    assert_eq!(next.id, 4);
}

#[test]
fn test_auto_increment_keeps_explicit_id() {
    let store = registered_store();
    let mut counter = Counter { id: 200, label: "fixed".to_string() };
    store.write(|tx| tx.insert(&mut counter)).unwrap();
    assert_eq!(counter.id, 200);
    assert_eq!(store.read(|tx| tx.get::<Counter>(200u8)).unwrap().label, "fixed");
}

#[test]
fn test_auto_increment_overflow_in_single_transaction() {
    let store = registered_store();
    let err = store
        .write(|tx| {
            for _ in 0..257 {
                let _ = tx.insert(&mut Counter::default());
            }
            Ok(())
        })
        .unwrap_err();

    let Cause::Rollback { errors } = err.cause() else {
        panic!("expected rollback, got {err}");
    };
    assert_eq!(errors.len(), 2);
    let first = errors.iter().next().unwrap();
    assert_eq!(
        first.to_string(),
        "Insert: fixture.Counter: next bucket sequence 256 overflows ID field of type uint8"
    );
    assert!(errors.iter().nth(1).unwrap().is_bad_transaction());
    assert!(err.to_string().starts_with("2 errors occurred:\n* Insert: fixture.Counter: next"));

    assert_eq!(store.read(|tx| tx.count::<Counter>()).unwrap(), 0);
}

#[test]
fn test_auto_increment_overflow_across_transactions() {
    let store = registered_store();
    let mut failures = Vec::new();
    for _ in 0..257 {
        if let Err(err) = store.write(|tx| tx.insert(&mut Counter::default())) {
            failures.push(err);
        }
    }

    assert_eq!(failures.len(), 2);
    for err in &failures {
        assert!(
            matches!(err.cause(), Cause::Overflow { sequence: 256, kind: ScalarKind::U8 }),
            "{err}"
        );
    }
    assert_eq!(store.read(|tx| tx.count::<Counter>()).unwrap(), 255);
}

// ============================================
// Get
// ============================================

#[test]
fn test_get_not_found() {
    let store = registered_store();
    let err = store.read(|tx| tx.get::<Person>(5i64)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.action(), Action::Get);
    assert_eq!(err.to_string(), "Get: fixture.Person: item not found");
}

#[test]
fn test_get_wrong_id_type() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Person::new(5, "a"))).unwrap();
    let err = store.read(|tx| tx.get::<Person>(5u32)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Get: fixture.Person: incompatible type of ID: expected int64, got uint32"
    );
}

#[test]
fn test_failed_get_does_not_poison() {
    let store = registered_store();
    store
        .write(|tx| {
            assert!(tx.get::<Person>(1i64).is_err());
            assert!(!tx.is_poisoned());
            tx.insert(&mut Person::new(1, "a"))
        })
        .unwrap();
    assert_eq!(store.read(|tx| tx.count::<Person>()).unwrap(), 1);
}

// ============================================
// Delete
// ============================================

#[test]
fn test_delete_missing_is_ok() {
    let store = registered_store();
    store.write(|tx| tx.delete(&Person::new(42, "nobody"))).unwrap();
    store.write(|tx| tx.delete_by_id::<Setting>("nothing")).unwrap();
}

#[test]
fn test_delete_by_id_wrong_type() {
    let store = registered_store();
    let err = store.write(|tx| tx.delete_by_id::<Person>("1")).unwrap_err();
    assert!(matches!(
        err.cause(),
        Cause::IdTypeMismatch { expected: ScalarKind::I64, actual: ScalarKind::Str }
    ));
}

#[test]
fn test_delete_removes_record_and_index_entries() {
    let store = registered_store();
    store
        .write(|tx| {
            tx.insert(&mut Person::new(1, "a"))?;
            tx.insert(&mut Person::new(2, "a"))
        })
        .unwrap();

    store.write(|tx| tx.delete(&Person::new(1, "ignored"))).unwrap();

    store
        .read(|tx| {
            assert!(tx.get::<Person>(1i64).unwrap_err().is_not_found());
            let remaining = tx.find::<Person>(&["Name"], &[Scalar::from("a")])?;
            assert_eq!(remaining, vec![Person::new(2, "a")]);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_delete_in_same_transaction() {
    let store = registered_store();
    store
        .write(|tx| {
            tx.insert(&mut Person::new(3, "tmp"))?;
            tx.delete(&Person::new(3, "tmp"))?;
            assert!(tx.get::<Person>(3i64).unwrap_err().is_not_found());
            Ok(())
        })
        .unwrap();
    assert_eq!(store.read(|tx| tx.count::<Person>()).unwrap(), 0);
}

#[test]
fn test_delete_multi_field_index() {
    let store = registered_store();
    let listing = Listing { id: 9, name: "desk".to_string(), visible: false, notes: Vec::new() };
    store.write(|tx| tx.insert(&mut listing.clone())).unwrap();
    store.write(|tx| tx.delete(&listing)).unwrap();

    store
        .read(|tx| {
            let found = tx.find::<Listing>(
                &["ID", "Visible", "Name"],
                &[Scalar::I64(9), Scalar::Bool(false), Scalar::from("desk")],
            )?;
            assert!(found.is_empty());
            assert!(tx.find::<Listing>(&["Name"], &[Scalar::from("desk")])?.is_empty());
            Ok(())
        })
        .unwrap();
}

// ============================================
// Update / Upsert
// ============================================

#[test]
fn test_update_existing_moves_index_entries() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Person::new(1, "old"))).unwrap();
    store.write(|tx| tx.update(&Person::new(1, "new"))).unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.get::<Person>(1i64)?.name, "new");
            assert!(tx.find::<Person>(&["Name"], &[Scalar::from("old")])?.is_empty());
            assert_eq!(tx.find::<Person>(&["Name"], &[Scalar::from("new")])?.len(), 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_update_moves_multi_field_index_entries() {
    let store = registered_store();
    let fields = ["ID", "Visible", "Name"];
    let mut listing = Listing { id: 1, name: "a".to_string(), visible: true, notes: Vec::new() };
    store.write(|tx| tx.insert(&mut listing)).unwrap();

    let moved = Listing { id: 1, name: "b".to_string(), visible: false, notes: Vec::new() };
    store.write(|tx| tx.update(&moved)).unwrap();

    store
        .read(|tx| {
            let old = [Scalar::I64(1), Scalar::Bool(true), Scalar::from("a")];
            assert!(tx.find::<Listing>(&fields, &old)?.is_empty());

            let new = [Scalar::I64(1), Scalar::Bool(false), Scalar::from("b")];
            assert_eq!(tx.find::<Listing>(&fields, &new)?, vec![moved.clone()]);

            assert!(tx.find::<Listing>(&["Name"], &[Scalar::from("a")])?.is_empty());
            assert_eq!(tx.find::<Listing>(&["Name"], &[Scalar::from("b")])?.len(), 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_upsert_moves_nested_index_entries() {
    let store = registered_store();
    let mut track = Track::new("x", "y");
    store.write(|tx| tx.insert(&mut track)).unwrap();

    let mut renamed = Track { id: track.id, artist: "xy".to_string(), title: String::new() };
    store.write(|tx| tx.upsert(&mut renamed)).unwrap();
    assert_eq!(renamed.id, track.id);

    store
        .read(|tx| {
            let fields = ["Artist", "Title"];
            assert!(tx.find::<Track>(&fields, &[Scalar::from("x"), Scalar::from("y")])?.is_empty());
            assert_eq!(
                tx.find::<Track>(&fields, &[Scalar::from("xy"), Scalar::from("")])?,
                vec![renamed.clone()]
            );
            assert_eq!(tx.count::<Track>()?, 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_update_missing() {
    let store = registered_store();
    let err = store.write(|tx| tx.update(&Person::new(1, "x"))).unwrap_err();
    assert_eq!(err.to_string(), "Update: fixture.Person: item not found");
    assert_eq!(store.read(|tx| tx.count::<Person>()).unwrap(), 0);
}

#[test]
fn test_upsert_without_auto_increment() {
    let store = registered_store();
    store.write(|tx| tx.upsert(&mut Person::new(1, "first"))).unwrap();
    store.write(|tx| tx.upsert(&mut Person::new(1, "second"))).unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.count::<Person>()?, 1);
            assert_eq!(tx.get::<Person>(1i64)?.name, "second");
            assert!(tx.find::<Person>(&["Name"], &[Scalar::from("first")])?.is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_upsert_with_auto_increment() {
    let store = registered_store();
    let mut created = Counter { id: 0, label: "new".to_string() };
    store.write(|tx| tx.upsert(&mut created)).unwrap();
    assert_eq!(created.id, 1);

    let mut replaced = Counter { id: 1, label: "replaced".to_string() };
    store.write(|tx| tx.upsert(&mut replaced)).unwrap();
    assert_eq!(replaced.id, 1);

    let mut explicit = Counter { id: 50, label: "explicit".to_string() };
    store.write(|tx| tx.upsert(&mut explicit)).unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.count::<Counter>()?, 2);
            assert_eq!(tx.get::<Counter>(1u8)?.label, "replaced");
            assert_eq!(tx.get::<Counter>(50u8)?.label, "explicit");
            Ok(())
        })
        .unwrap();
}

// ============================================
// Find
// ============================================

#[test]
fn test_find_nested_string_prefix_is_unambiguous() {
    let store = registered_store();
    store
        .write(|tx| {
            tx.insert(&mut Track::new("ab", "c"))?;
            tx.insert(&mut Track::new("a", "bc"))?;
            tx.insert(&mut Track::new("a", "b"))
        })
        .unwrap();

    store
        .read(|tx| {
            let fields = ["Artist", "Title"];
            let ab_c = tx.find::<Track>(&fields, &[Scalar::from("ab"), Scalar::from("c")])?;
            assert_eq!(ab_c.len(), 1);
            assert_eq!(ab_c[0].artist, "ab");

            let a_bc = tx.find::<Track>(&fields, &[Scalar::from("a"), Scalar::from("bc")])?;
            assert_eq!(a_bc.len(), 1);
            assert_eq!(a_bc[0].title, "bc");

            let a_b = tx.find::<Track>(&fields, &[Scalar::from("a"), Scalar::from("b")])?;
            assert_eq!(a_b.len(), 1);
            assert_eq!(a_b[0].title, "b");
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_find_unknown_index() {
    let store = registered_store();
    let err = store.read(|tx| tx.find::<Person>(&["ID"], &[Scalar::I64(1)])).unwrap_err();
    assert!(matches!(err.cause(), Cause::UnknownIndex { .. }));
    assert_eq!(err.action(), Action::Find);
}

#[test]
fn test_find_value_shape_mismatch() {
    let store = registered_store();
    let wrong_kind = store.read(|tx| tx.find::<Person>(&["Name"], &[Scalar::I64(1)])).unwrap_err();
    assert!(matches!(wrong_kind.cause(), Cause::ShapeMismatch { .. }));

    let wrong_len = store.read(|tx| tx.find::<Person>(&["Name"], &[])).unwrap_err();
    assert!(matches!(wrong_len.cause(), Cause::ShapeMismatch { .. }));
}

// ============================================
// Poisoned transactions
// ============================================

#[test]
fn test_poisoned_transaction_rejects_later_writes() {
    let store = registered_store();
    let err = store
        .write(|tx| {
            tx.insert(&mut Person::new(1, "a"))?;
            let missing = tx.update(&Person::new(2, "b")).unwrap_err();
            assert!(missing.is_not_found());
            assert!(tx.is_poisoned());

            let rejected = tx.insert(&mut Person::new(3, "c")).unwrap_err();
            assert!(rejected.is_bad_transaction());
            assert_eq!(
                rejected.to_string(),
                "Insert: fixture.Person: abort early: previous error causes transaction rollback"
            );
            assert!(tx.delete(&Person::new(1, "a")).unwrap_err().is_bad_transaction());
            assert!(tx.truncate::<Person>().unwrap_err().is_bad_transaction());

            // Reads still work inside a poisoned transaction.
            assert_eq!(tx.get::<Person>(1i64)?.name, "a");
            assert_eq!(tx.errors().len(), 4);
            Ok(())
        })
        .unwrap_err();

    let Cause::Rollback { errors } = err.cause() else {
        panic!("expected rollback, got {err}");
    };
    assert_eq!(errors.len(), 4);
    assert_eq!(err.action(), Action::Commit);
    assert_eq!(store.read(|tx| tx.count::<Person>()).unwrap(), 0);
}

#[test]
fn test_aborted_write_rolls_back() {
    let store = registered_store();
    let err = store
        .write(|tx| {
            tx.insert(&mut Person::new(1, "draft"))?;
            tx.insert(&mut Counter::default())?;
            Err::<(), _>(coffer::Error::aborted("draft discarded"))
        })
        .unwrap_err();

    assert!(err.is_aborted());
    assert_eq!(err.to_string(), "Commit: draft discarded");
    store
        .read(|tx| {
            assert_eq!(tx.count::<Person>()?, 0);
            assert_eq!(tx.count::<Counter>()?, 0);
            Ok(())
        })
        .unwrap();

    // The sequence bump was rolled back too.
    let mut next = Counter::default();
    store.write(|tx| tx.insert(&mut next)).unwrap();
    assert_eq!(next.id, 1);
}

// ============================================
// Truncate
// ============================================

#[test]
fn test_truncate_resets_records_indexes_and_sequence() {
    let store = registered_store();
    store
        .write(|tx| {
            for label in ["a", "b"] {
                tx.insert(&mut Counter { id: 0, label: label.to_string() })?;
            }
            tx.insert(&mut Person::new(1, "keep"))
        })
        .unwrap();

    store.write(|tx| tx.truncate::<Counter>()).unwrap();

    let mut fresh = Counter::default();
    store.write(|tx| tx.insert(&mut fresh)).unwrap();
    assert_eq!(fresh.id, 1);
    store
        .read(|tx| {
            assert_eq!(tx.count::<Counter>()?, 1);
            assert_eq!(tx.count::<Person>()?, 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_truncate_then_insert_same_transaction() {
    let store = registered_store();
    store.write(|tx| tx.insert(&mut Person::new(1, "a"))).unwrap();
    store
        .write(|tx| {
            tx.truncate::<Person>()?;
            tx.insert(&mut Person::new(1, "b"))
        })
        .unwrap();

    store
        .read(|tx| {
            assert_eq!(tx.get::<Person>(1i64)?.name, "b");
            assert!(tx.find::<Person>(&["Name"], &[Scalar::from("a")])?.is_empty());
            Ok(())
        })
        .unwrap();
}
