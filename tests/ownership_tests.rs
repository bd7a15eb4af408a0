mod common;

use gdbridge::classes::{ConfigFile, Node};
use gdbridge::{GString, StringName, Transferred};
use gdbridge_core::{ExtensionApi, GodotClass};

#[test]
fn test_arena_round_trip_is_bit_exact() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let raw = engine.string_new("hello");
    let lt = rt.lifetime();
    let tag = lt.adopt(GString(raw));
    assert_eq!(tag.get().0, raw);
    let back = tag.end();
    assert_eq!(back.0.words(), raw.words());

    drop(lt);
    assert_eq!(engine.live_strings(), 1, "an ended tag is not released by its scope");
    engine.string_destroy(raw);
}

#[test]
fn test_scope_close_releases_live_values() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let names_before = engine.live_string_names();

    rt.scope(|lt| {
        GString::new_in(lt, "a");
        GString::new_in(lt, "b");
        StringName::new_in(lt, "a_fresh_name");
        assert_eq!(lt.live_count(), 3);
        assert_eq!(engine.live_strings(), 2);
    });

    assert_eq!(engine.live_strings(), 0);
    assert_eq!(engine.live_string_names(), names_before);
}

#[test]
fn test_scope_close_destroys_owned_node() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let objects_before = engine.live_objects();

    let node = rt.scope(|lt| {
        let node = Node::new(&rt).unwrap().scope(lt);
        assert!(engine.is_alive(node.get().object_ptr()));
        node.get()
    });

    assert!(!engine.is_alive(node.object_ptr()));
    assert_eq!(engine.live_objects(), objects_before);
}

#[test]
#[should_panic(expected = "already ended")]
fn test_ending_an_id_twice_panics() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    rt.scope(|lt| {
        let id = GString::new_in(lt, "once").id();
        let first: GString = lt.end(id);
        engine.string_destroy(first.0);
        let _second: GString = lt.end(id);
    });
}

#[test]
#[should_panic(expected = "already ended")]
fn test_get_after_end_panics() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    rt.scope(|lt| {
        let tag = GString::new_in(lt, "gone");
        let id = tag.id();
        let value = tag.end();
        engine.string_destroy(value.0);
        let _: GString = lt.get(id);
    });
}

#[test]
#[should_panic(expected = "closed lifetime")]
fn test_adopting_into_closed_scope_panics() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let lt = rt.lifetime();
    lt.close();
    GString::new_in(&lt, "late");
}

#[test]
fn test_transfer_hands_ownership_to_engine() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let root = common::scene_root(&engine);

    let child = rt.scope(|lt| {
        let node = Node::new(&rt).unwrap().scope(lt);
        let ptr = node.get();
        root.add_child(&rt, node.transfer()).unwrap();
        ptr
    });

    assert!(engine.is_alive(child.object_ptr()), "the tree owns the child now");
    assert_eq!(root.get_child_count(&rt).unwrap(), 1);
}

#[test]
fn test_transferred_converts_into_scope() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let config = ConfigFile::new(&rt).unwrap();
    let ptr = config.peek().object_ptr();
    assert_eq!(engine.ref_count(ptr), Some(0));

    rt.scope(|lt| {
        let config = config.scope(lt);
        assert_eq!(engine.ref_count(ptr), Some(1));
        assert_eq!(config.get().object_ptr(), ptr);
    });

    assert!(!engine.is_alive(ptr));
}

#[test]
fn test_root_tags_are_never_released() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let root = gdbridge::Root::new(common::scene_root(&engine));
    let copy = root;
    assert_eq!(copy, root);
    assert!(engine.is_alive(copy.get().object_ptr()));

    let singleton = gdbridge::classes::Engine::singleton(&rt).unwrap();
    assert!(engine.is_alive(singleton.get().object_ptr()));
}

#[test]
fn test_upcast_keeps_the_handle() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let node = Node::new(&rt).unwrap();
    let object: Transferred<gdbridge::classes::Object> = node.map(|n| n.upcast());
    let ptr = object.peek().object_ptr();
    assert_eq!(object.peek().get_class(&rt).unwrap(), "Node");
    rt.scope(|lt| {
        object.scope(lt);
    });
    assert!(!engine.is_alive(ptr));
}
