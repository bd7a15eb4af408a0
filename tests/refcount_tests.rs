mod common;

use gdbridge::RuntimeProperty;
use gdbridge::classes::{ConfigFile, Object, RefCounted};
use gdbridge_core::GodotClass;

#[test]
fn test_object_destroyed_after_last_of_two_cycles() {
    for drop_first_tag_first in [true, false] {
        let engine = common::engine();
        let rt = common::runtime(&engine);

        let object = rt.construct_object("RefCounted").unwrap();
        let ptr = object.peek().object_ptr();
        assert_eq!(engine.ref_count(ptr), Some(0), "construction does not reference");

        let first = object
            .map(|o| RefCounted::from_object_ptr(o.object_ptr()))
            .cycle(rt.bridge());
        assert_eq!(engine.ref_count(ptr), Some(1));
        let second = first.clone();
        assert_eq!(engine.ref_count(ptr), Some(2));
        assert_eq!(second.get().get_reference_count(&rt).unwrap(), 2);

        let (a, b) = if drop_first_tag_first {
            (first, second)
        } else {
            (second, first)
        };
        drop(a);
        assert!(engine.is_alive(ptr), "one reference is still held");
        assert_eq!(engine.ref_count(ptr), Some(1));
        drop(b);
        assert!(!engine.is_alive(ptr));
        assert!(rt.leaked_references().is_empty());
    }
}

#[test]
fn test_ledger_tracks_host_references() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let config = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    let ptr = config.get().object_ptr();
    assert_eq!(rt.bridge().host_references(ptr), Some(1));

    let copies: Vec<_> = (0..3).map(|_| config.clone()).collect();
    assert_eq!(rt.bridge().host_references(ptr), Some(4));
    assert_eq!(engine.ref_count(ptr), Some(4));

    drop(copies);
    drop(config);
    assert_eq!(rt.bridge().host_references(ptr), Some(0));
    assert!(!engine.is_alive(ptr));
}

#[test]
fn test_leaked_references_are_reported() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let config = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    let ptr = config.get().object_ptr();
    std::mem::forget(config);

    assert_eq!(rt.leaked_references(), vec![(ptr, 1)]);
    assert!(engine.is_alive(ptr));
}

#[test]
fn test_leak_report_needs_the_ledger() {
    let engine = common::engine();
    let rt = common::builder(&engine)
        .property(RuntimeProperty::RefLedger, 0)
        .build()
        .unwrap();
    assert!(!rt.bridge().ledger_enabled());

    let config = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    std::mem::forget(config);
    assert!(rt.leaked_references().is_empty());
}

#[test]
#[should_panic(expected = "underflow")]
fn test_double_release_is_fatal() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let config = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    let ptr = config.get().object_ptr();
    rt.bridge().reference(ptr);
    rt.bridge().release(ptr);
    drop(config);
    // The host holds nothing now.
    rt.bridge().release(ptr);
}

#[test]
fn test_into_transferred_moves_the_reference() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let config = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    let ptr = config.get().object_ptr();
    let handed = config.into_transferred();
    assert_eq!(rt.bridge().host_references(ptr), Some(0));
    assert_eq!(engine.ref_count(ptr), Some(1), "the reference travels with the value");

    // Taking it back reuses that reference instead of adding one.
    let back = handed.cycle(rt.bridge());
    assert_eq!(engine.ref_count(ptr), Some(1));
    assert_eq!(rt.bridge().host_references(ptr), Some(1));
    drop(back);
    assert!(!engine.is_alive(ptr));
    assert!(rt.leaked_references().is_empty());
}

#[test]
fn test_scoped_ref_counted_transfer_keeps_counts_balanced() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let (ptr, shared) = rt.scope(|lt| {
        let local = ConfigFile::new(&rt).unwrap().scope(lt);
        let ptr = local.get().object_ptr();
        let handed = local.transfer();
        assert_eq!(rt.bridge().host_references(ptr), Some(0));
        (ptr, handed.cycle(rt.bridge()))
    });

    assert_eq!(engine.ref_count(ptr), Some(1));
    assert_eq!(rt.leaked_references(), vec![(ptr, 1)]);
    drop(shared);
    assert!(!engine.is_alive(ptr));
    assert!(rt.leaked_references().is_empty());
}

#[test]
fn test_upcast_to_object_keeps_shared_clones_alive() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let first = ConfigFile::new(&rt).unwrap().cycle(rt.bridge());
    let second = first.clone();
    let ptr = first.get().object_ptr();

    rt.scope(|lt| {
        let object = first.into_transferred().map(|c| c.upcast::<Object>()).scope(lt);
        assert_eq!(object.get().object_ptr(), ptr);
        assert_eq!(engine.ref_count(ptr), Some(2));
    });

    assert!(engine.is_alive(ptr), "the remaining clone still holds a reference");
    assert_eq!(engine.ref_count(ptr), Some(1));
    assert_eq!(second.get().upcast::<RefCounted>().get_reference_count(&rt).unwrap(), 1);
    drop(second);
    assert!(!engine.is_alive(ptr));
    assert!(rt.leaked_references().is_empty());
}

#[test]
fn test_constructed_ref_counted_object_goes_through_the_count() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let object = rt.construct_object("ConfigFile").unwrap();
    let ptr = object.peek().object_ptr();
    rt.scope(|lt| {
        let object = object.scope(lt);
        assert_eq!(engine.ref_count(ptr), Some(1));
        assert_eq!(rt.bridge().host_references(ptr), Some(1));
        assert_eq!(object.get().get_class(&rt).unwrap(), "ConfigFile");
    });
    assert!(!engine.is_alive(ptr));
    assert!(rt.leaked_references().is_empty());
}

#[test]
fn test_constructed_manual_object_is_destroyed() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let object = rt.construct_object("Node").unwrap();
    let ptr = object.peek().object_ptr();
    rt.scope(|lt| {
        object.scope(lt);
        assert_eq!(engine.ref_count(ptr), None);
    });
    assert!(!engine.is_alive(ptr));
    assert!(rt.leaked_references().is_empty());
}
