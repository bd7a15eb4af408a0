//! Scene tree bookkeeping and the notifications that go with it.
//!
//! Entering the tree runs `_enter_tree` parents first and then `_ready`
//! children first. Leaving runs `_exit_tree` children first. Freeing a node
//! frees its whole subtree.

use gdbridge_core::{ExtensionApi, InstanceHandle, ObjectPtr};

use crate::SoftwareEngine;
use crate::notification;

impl SoftwareEngine {
    /// Children of `node`, in order. Empty for non-nodes.
    pub fn children(&self, node: ObjectPtr) -> Vec<ObjectPtr> {
        self.state()
            .objects
            .get(&node)
            .and_then(|r| r.node())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn node_name(&self, node: ObjectPtr) -> Option<String> {
        self.state()
            .objects
            .get(&node)
            .and_then(|r| r.node())
            .map(|n| n.name.clone())
    }

    pub fn is_inside_tree(&self, node: ObjectPtr) -> bool {
        self.state()
            .objects
            .get(&node)
            .and_then(|r| r.node())
            .is_some_and(|n| n.in_tree)
    }

    pub(crate) fn subtree_pre_order(&self, node: ObjectPtr) -> Vec<ObjectPtr> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    fn is_ancestor(&self, candidate: ObjectPtr, node: ObjectPtr) -> bool {
        let state = self.state();
        let mut current = Some(node);
        while let Some(ptr) = current {
            if ptr == candidate {
                return true;
            }
            current = state.objects.get(&ptr).and_then(|r| r.node()).and_then(|n| n.parent);
        }
        false
    }

    pub(crate) fn add_child(&self, parent: ObjectPtr, child: ObjectPtr) {
        const FUNCTION: &str = "Node::add_child";
        if child.is_null() {
            self.report("parameter \"node\" is null", FUNCTION);
            return;
        }
        if self.is_ancestor(child, parent) {
            self.report("can't add a node as a child of itself or its descendant", FUNCTION);
            return;
        }

        let parent_in_tree = {
            let mut state = self.state();
            let Some(record) = state.objects.get_mut(&child) else {
                panic!("add_child with freed object {child:?}");
            };
            let (class, id) = (record.class.clone(), record.id);
            let Some(node) = record.node_mut() else {
                drop(state);
                self.report(&format!("{class} is not a Node"), FUNCTION);
                return;
            };
            if node.parent.is_some() {
                drop(state);
                self.report("can't add child, already has a parent", FUNCTION);
                return;
            }
            node.parent = Some(parent);
            if node.name.is_empty() {
                node.name = format!("@{class}@{}", id.0);
            }
            let parent_node = state.record_mut(parent).node_mut();
            match parent_node {
                Some(parent_node) => {
                    parent_node.children.push(child);
                    parent_node.in_tree
                }
                None => false,
            }
        };

        if parent_in_tree {
            self.propagate_enter(child);
            self.propagate_ready(child);
        }
    }

    pub(crate) fn remove_child(&self, parent: ObjectPtr, child: ObjectPtr) {
        let in_tree = {
            let state = self.state();
            match state.objects.get(&child).and_then(|r| r.node()) {
                Some(node) if node.parent == Some(parent) => node.in_tree,
                _ => {
                    drop(state);
                    self.report("node is not a child of this node", "Node::remove_child");
                    return;
                }
            }
        };
        if in_tree {
            self.propagate_exit(child);
        }
        self.detach(child);
    }

    fn detach(&self, child: ObjectPtr) {
        let mut state = self.state();
        let Some(parent) = state.record_mut(child).node_mut().and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = state.objects.get_mut(&parent).and_then(|r| r.node_mut()) {
            node.children.retain(|c| *c != child);
        }
    }

    fn set_in_tree(&self, node: ObjectPtr, in_tree: bool) {
        if let Some(node) = self.state().record_mut(node).node_mut() {
            node.in_tree = in_tree;
        }
    }

    fn propagate_enter(&self, node: ObjectPtr) {
        self.set_in_tree(node, true);
        self.notification(node, notification::ENTER_TREE);
        self.notify(node, "_enter_tree", &[]);
        for child in self.children(node) {
            self.propagate_enter(child);
        }
    }

    fn propagate_ready(&self, node: ObjectPtr) {
        for child in self.children(node) {
            self.propagate_ready(child);
        }
        let first_time = match self.state().record_mut(node).node_mut() {
            Some(n) if !n.ready => {
                n.ready = true;
                true
            }
            _ => false,
        };
        if first_time {
            self.notification(node, notification::READY);
            self.notify(node, "_ready", &[]);
        }
    }

    fn propagate_exit(&self, node: ObjectPtr) {
        for child in self.children(node).into_iter().rev() {
            self.propagate_exit(child);
        }
        self.notify(node, "_exit_tree", &[]);
        self.notification(node, notification::EXIT_TREE);
        self.set_in_tree(node, false);
    }

    /// Free `object` and, for nodes, everything below it.
    pub(crate) fn destroy_tree(&self, object: ObjectPtr) {
        if self.is_inside_tree(object) {
            self.propagate_exit(object);
        }
        self.detach(object);

        let doomed = self.subtree_pre_order(object);
        for &ptr in doomed.iter().rev() {
            self.notification(ptr, notification::PREDELETE);
        }

        let mut bound: Vec<(InstanceHandle, String)> = Vec::new();
        {
            let mut state = self.state();
            for ptr in doomed.iter().rev() {
                if let Some(record) = state.objects.remove(ptr) {
                    state.by_id.remove(&record.id);
                    state.destroyed += 1;
                    if let Some(instance) = record.binding {
                        bound.push((instance, record.class));
                    }
                }
            }
        }
        tracing::trace!(?object, freed = doomed.len(), "object destroyed");

        for (instance, class) in bound {
            let callbacks = self
                .state()
                .extensions
                .get(&class)
                .map(|ext| ext.callbacks.clone());
            match callbacks {
                Some(callbacks) => callbacks.free_instance(instance),
                None => self.print_error(
                    &format!("no callbacks for class '{class}' to free {instance:?}"),
                    "Object::free",
                    file!(),
                    line!(),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(engine: &SoftwareEngine) -> ObjectPtr {
        let name = engine.string_name_new("Node");
        let ptr = engine.classdb_construct_object(name);
        engine.string_name_destroy(name);
        ptr
    }

    #[test]
    fn adding_under_root_enters_tree() {
        let engine = SoftwareEngine::new();
        let parent = node(&engine);
        let child = node(&engine);
        engine.add_child(parent, child);
        assert!(!engine.is_inside_tree(child));

        engine.add_child(engine.root_node(), parent);
        assert!(engine.is_inside_tree(parent));
        assert!(engine.is_inside_tree(child));
        let id = engine.object_get_instance_id(parent).0;
        assert_eq!(engine.node_name(parent).unwrap(), format!("@Node@{id}"));
    }

    #[test]
    fn freeing_a_parent_frees_children() {
        let engine = SoftwareEngine::new();
        let parent = node(&engine);
        let child = node(&engine);
        engine.add_child(engine.root_node(), parent);
        engine.add_child(parent, child);

        engine.object_destroy(parent);
        assert!(!engine.is_alive(parent));
        assert!(!engine.is_alive(child));
        assert!(engine.children(engine.root_node()).is_empty());
    }

    #[test]
    fn cycles_and_double_parents_are_rejected() {
        let engine = SoftwareEngine::new();
        let a = node(&engine);
        let b = node(&engine);
        engine.add_child(a, b);
        engine.add_child(b, a);
        engine.add_child(engine.root_node(), b);
        let errors = engine.take_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("already has a parent"));
    }

    #[test]
    fn remove_child_keeps_the_node_alive() {
        let engine = SoftwareEngine::new();
        let child = node(&engine);
        engine.add_child(engine.root_node(), child);
        engine.remove_child(engine.root_node(), child);
        assert!(engine.is_alive(child));
        assert!(!engine.is_inside_tree(child));
        engine.object_destroy(child);
    }
}
