//! `Node` methods and the virtuals it declares.
//!
//! Nodes are manually managed. Once added to a parent the tree owns them,
//! so lookups return [`Root`] tags and `add_child` consumes a
//! [`Transferred`] child.

use gdbridge_core::{
    BridgeError, CallFrame, GString, GodotClass, Inherits, MethodFlags, ObjectPtr, Root,
    StringName, Transferred,
};
use gdbridge_registry::VirtualMethod;

use super::Node;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const SET_NAME: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "set_name", 83702148, 1);
pub const GET_NAME: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "get_name", 2002593661, 0).with_flags(MethodFlags::CONST);
pub const ADD_CHILD: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "add_child", 3863233950, 3);
pub const REMOVE_CHILD: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "remove_child", 1078189570, 1);
pub const GET_CHILD_COUNT: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "get_child_count", 894402480, 1)
        .with_flags(MethodFlags::CONST);
pub const GET_CHILD: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "get_child", 541253412, 2).with_flags(MethodFlags::CONST);
pub const GET_PARENT: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "get_parent", 3160264692, 0)
        .with_flags(MethodFlags::CONST);
pub const IS_INSIDE_TREE: MethodBindDescriptor =
    MethodBindDescriptor::new("Node", "is_inside_tree", 36873697, 0)
        .with_flags(MethodFlags::CONST);

// ============================================================================
// Virtuals
// ============================================================================

macro_rules! node_virtual {
    ($(#[$meta:meta])* $marker:ident, $name:literal, $args:ty) => {
        $(#[$meta])*
        pub struct $marker;

        impl VirtualMethod for $marker {
            const NAME: &'static str = $name;
            type Owner = Node;
            type Args = $args;
            type Ret = ();
        }
    };
}

node_virtual!(
    /// Runs once, after the node and its children entered the tree.
    Ready,
    "_ready",
    ()
);
node_virtual!(
    /// Idle frame, with the elapsed time in seconds.
    Process,
    "_process",
    (f64,)
);
node_virtual!(PhysicsProcess, "_physics_process", (f64,));
node_virtual!(EnterTree, "_enter_tree", ());
node_virtual!(ExitTree, "_exit_tree", ());

// ============================================================================
// Methods
// ============================================================================

fn node_or_none(ptr: ObjectPtr) -> Option<Root<Node>> {
    (!ptr.is_null()).then(|| Root::new(Node::from_object_ptr(ptr)))
}

impl Node {
    pub fn new(rt: &Runtime) -> Result<Transferred<Node>, BridgeError> {
        rt.construct::<Node>()
    }

    pub fn get_name(self, rt: &Runtime) -> Result<String, BridgeError> {
        let name: StringName = rt.call(&GET_NAME, self.object_ptr(), CallFrame::<0>::new())?;
        Ok(rt.scope(|lt| lt.adopt(name).get().to_rust(rt.api())))
    }

    pub fn set_name(self, rt: &Runtime, name: &str) -> Result<(), BridgeError> {
        rt.scope(|lt| {
            let name = GString::new_in(lt, name);
            let mut frame = CallFrame::<1>::new();
            frame.arg(name.get());
            rt.call(&SET_NAME, self.object_ptr(), frame)
        })
    }

    /// Hand `child` to this node. If the call cannot be made the child is
    /// released instead.
    pub fn add_child<C: Inherits<Node>>(
        self,
        rt: &Runtime,
        child: Transferred<C>,
    ) -> Result<(), BridgeError> {
        let mut frame = CallFrame::<3>::new();
        frame
            .arg(child.peek().object_ptr())
            .arg(false)
            .arg(0_i64);
        match rt.call::<3, ()>(&ADD_CHILD, self.object_ptr(), frame) {
            Ok(()) => {
                child.end();
                Ok(())
            }
            Err(err) => {
                rt.scope(|lt| {
                    child.scope(lt);
                });
                Err(err)
            }
        }
    }

    /// Detach `child`. The caller owns it afterwards.
    pub fn remove_child(self, rt: &Runtime, child: Node) -> Result<Transferred<Node>, BridgeError> {
        let mut frame = CallFrame::<1>::new();
        frame.arg(child);
        rt.call::<1, ()>(&REMOVE_CHILD, self.object_ptr(), frame)?;
        Ok(Transferred::new(child))
    }

    pub fn get_child_count(self, rt: &Runtime) -> Result<i64, BridgeError> {
        let mut frame = CallFrame::<1>::new();
        frame.arg(false);
        rt.call(&GET_CHILD_COUNT, self.object_ptr(), frame)
    }

    /// Child at `index`; negative indices count from the end.
    pub fn get_child(self, rt: &Runtime, index: i64) -> Result<Option<Root<Node>>, BridgeError> {
        let mut frame = CallFrame::<2>::new();
        frame.arg(index).arg(false);
        let child: ObjectPtr = rt.call(&GET_CHILD, self.object_ptr(), frame)?;
        Ok(node_or_none(child))
    }

    pub fn get_parent(self, rt: &Runtime) -> Result<Option<Root<Node>>, BridgeError> {
        let parent: ObjectPtr = rt.call(&GET_PARENT, self.object_ptr(), CallFrame::<0>::new())?;
        Ok(node_or_none(parent))
    }

    pub fn is_inside_tree(self, rt: &Runtime) -> Result<bool, BridgeError> {
        rt.call(&IS_INSIDE_TREE, self.object_ptr(), CallFrame::<0>::new())
    }
}
