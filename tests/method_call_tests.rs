mod common;

use gdbridge::classes::{Engine, FileAccess, Node, file_access, node};
use gdbridge::{BridgeError, CallFrame, ErrorCode, GString, MethodBindDescriptor, ObjectPtr};
use gdbridge_core::GodotClass;

#[test]
fn test_two_argument_call_returns_error_codes() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    engine.write_file("user://save.cfg", "");

    let ok = rt.scope(|lt| {
        let path = GString::new_in(lt, "user://save.cfg");
        let mut frame = CallFrame::<2>::new();
        frame.arg(path.get()).arg(0o600_i64);
        let ret = frame.ret::<ErrorCode>();
        rt.ptrcall(&file_access::SET_UNIX_PERMISSIONS, ObjectPtr::NULL, &mut frame)
            .unwrap();
        let code = frame.read(ret).unwrap();
        frame.free();
        code
    });
    assert_eq!(ok, ErrorCode::Ok);
    assert_eq!(i64::from(ok), 0);
    assert_eq!(engine.file_permissions("user://save.cfg"), Some(0o600));

    let bad = FileAccess::set_unix_permissions(&rt, "no scheme here", 0o600).unwrap();
    assert_eq!(bad, ErrorCode::ErrFileBadPath);
    assert_ne!(i64::from(bad), 0);
    assert!(bad.into_result().is_err());

    let out_of_range = FileAccess::set_unix_permissions(&rt, "user://save.cfg", 0o17777).unwrap();
    assert_eq!(out_of_range, ErrorCode::ErrInvalidParameter);
    assert_eq!(engine.live_strings(), 0, "argument strings were released");
}

#[test]
fn test_binds_are_resolved_once() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let frames = Engine::singleton(&rt).unwrap();

    let bind = rt.method_bind(&gdbridge::classes::engine::GET_PROCESS_FRAMES).unwrap();
    for _ in 0..3 {
        assert_eq!(frames.get().get_process_frames(&rt).unwrap(), 0);
    }
    assert_eq!(
        rt.method_bind(&gdbridge::classes::engine::GET_PROCESS_FRAMES).unwrap(),
        bind
    );
}

#[test]
fn test_unknown_method_is_a_hard_error() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    const MISSING: MethodBindDescriptor = MethodBindDescriptor::new("Node", "fly_away", 1, 0);
    const WRONG_HASH: MethodBindDescriptor = MethodBindDescriptor { hash: 7, ..node::GET_NAME };

    let root = common::scene_root(&engine);
    let err = rt
        .call::<0, ()>(&MISSING, root.object_ptr(), CallFrame::new())
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::MethodNotFound {
            class: "Node",
            method: "fly_away",
            hash: 1
        }
    );
    assert!(matches!(
        rt.call::<0, ()>(&WRONG_HASH, root.object_ptr(), CallFrame::new()),
        Err(BridgeError::MethodNotFound { hash: 7, .. })
    ));
    assert_eq!(engine.take_errors().len(), 2);
}

#[test]
fn test_frame_must_match_the_signature() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let root = common::scene_root(&engine);

    let mut frame = CallFrame::<2>::new();
    frame.arg(0_i64);
    let err = rt
        .ptrcall(&node::GET_CHILD, root.object_ptr(), &mut frame)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::ArgumentCount {
            class: "Node",
            method: "get_child",
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn test_instance_methods_need_a_receiver() {
    let engine = common::engine();
    let rt = common::runtime(&engine);

    let err = rt
        .call::<0, bool>(&node::IS_INSIDE_TREE, ObjectPtr::NULL, CallFrame::new())
        .unwrap_err();
    assert!(matches!(err, BridgeError::NullReceiver { method: "is_inside_tree", .. }));
    assert!(FileAccess::file_exists(&rt, "user://nothing").is_ok());
}

#[test]
#[should_panic(expected = "before the call")]
fn test_reading_before_the_call_panics() {
    let mut frame = CallFrame::<0>::new();
    let ret = frame.ret::<i64>();
    let _ = frame.read(ret);
}

#[test]
#[should_panic(expected = "holds only 1")]
fn test_overfilling_a_frame_panics() {
    let mut frame = CallFrame::<1>::new();
    frame.arg(1_i64).arg(2_i64);
}

#[test]
fn test_node_glue() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let root = common::scene_root(&engine);

    assert_eq!(root.get_name(&rt).unwrap(), "root");
    assert!(root.is_inside_tree(&rt).unwrap());
    assert_eq!(root.get_parent(&rt).unwrap(), None);

    let child = Node::new(&rt).unwrap();
    let ptr = child.peek();
    ptr.set_name(&rt, "Player").unwrap();
    assert!(!ptr.is_inside_tree(&rt).unwrap());
    root.add_child(&rt, child).unwrap();

    assert!(ptr.is_inside_tree(&rt).unwrap());
    assert_eq!(ptr.get_parent(&rt).unwrap().map(|p| p.get()), Some(root));
    assert_eq!(root.get_child(&rt, -1).unwrap().map(|c| c.get()), Some(ptr));
    assert_eq!(root.get_child(&rt, 5).unwrap(), None);
    assert_eq!(engine.take_errors().len(), 1, "out of range index is reported");

    let removed = root.remove_child(&rt, ptr).unwrap();
    assert_eq!(root.get_child_count(&rt).unwrap(), 0);
    assert!(!ptr.is_inside_tree(&rt).unwrap());
    rt.scope(|lt| {
        removed.scope(lt);
    });
    assert!(!engine.is_alive(ptr.object_ptr()));
    assert_eq!(engine.live_strings(), 0);
}

#[test]
fn test_object_glue() {
    let engine = common::engine();
    let rt = common::runtime(&engine);
    let root = common::scene_root(&engine);

    let object: gdbridge::classes::Object = root.upcast();
    assert_eq!(object.get_class(&rt).unwrap(), "Node");
    assert_eq!(rt.class_name(root.object_ptr()), "Node");
    let id = object.get_instance_id(&rt).unwrap();
    let expected = gdbridge_core::ExtensionApi::object_get_instance_id(&*engine, root.object_ptr());
    assert_eq!(id, expected);
}
