//! ClassRegistry - the name-keyed table of engine and host classes.
//!
//! # Storage Model
//!
//! - **Entries**: every [`ClassEntry`] stored by class name
//! - **Hierarchy**: a `petgraph::DiGraph` with one node per class name and an
//!   edge from each class to its parent. Parents may be registered after
//!   their children; a placeholder node stands in until then.
//!
//! # Lifecycle
//!
//! The registry is filled during startup and treated as read-only afterwards.
//! Registering a name twice replaces the earlier entry.

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use gdbridge_core::{ClassFlags, DispatchError, RegistrationError};

use crate::entry::ClassEntry;
use crate::virtuals::{VirtualFn, VirtualSlot};

/// Outcome of resolving a virtual method on a class.
#[derive(Clone)]
pub enum Resolution {
    /// A host override, found on `class`.
    Override { class: String, method: VirtualFn },
    /// The engine's own implementation, declared on `class`.
    EngineDefault { class: String },
}

impl Resolution {
    pub fn is_override(&self) -> bool {
        matches!(self, Resolution::Override { .. })
    }

    /// The class the resolution was found on.
    pub fn class(&self) -> &str {
        match self {
            Resolution::Override { class, .. } | Resolution::EngineDefault { class } => class,
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Override { class, .. } => {
                f.debug_struct("Override").field("class", class).finish()
            }
            Resolution::EngineDefault { class } => {
                f.debug_struct("EngineDefault").field("class", class).finish()
            }
        }
    }
}

/// Registry of every class the host knows about.
#[derive(Default)]
pub struct ClassRegistry {
    // === PRIMARY: name-based storage ===
    classes: FxHashMap<String, ClassEntry>,

    // === Hierarchy ===
    /// Child -> parent edges.
    hierarchy: DiGraph<String, ()>,
    nodes: FxHashMap<String, NodeIndex>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Insert or replace a class. Returns the entry it replaced.
    pub fn register(&mut self, entry: ClassEntry) -> Result<Option<ClassEntry>, RegistrationError> {
        if entry.name().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let node = self.node_for(entry.name());

        // Re-registration may change the parent.
        let old_edges: Vec<_> = self
            .hierarchy
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in old_edges {
            self.hierarchy.remove_edge(edge);
        }
        if let Some(parent) = entry.parent() {
            let parent_node = self.node_for(parent);
            self.hierarchy.add_edge(node, parent_node, ());
        }

        tracing::debug!(class = entry.name(), parent = ?entry.parent(), "registering class");
        let previous = self.classes.insert(entry.name().to_owned(), entry);
        if let Some(previous) = &previous {
            tracing::debug!(class = previous.name(), "replaced earlier registration");
        }
        Ok(previous)
    }

    fn node_for(&mut self, name: &str) -> NodeIndex {
        if let Some(node) = self.nodes.get(name) {
            return *node;
        }
        let node = self.hierarchy.add_node(name.to_owned());
        self.nodes.insert(name.to_owned(), node);
        node
    }

    /// Check that every parent is registered and the hierarchy is acyclic.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let mut names: Vec<&String> = self.classes.keys().collect();
        names.sort();
        for name in names {
            if let Some(parent) = self.classes[name].parent()
                && !self.classes.contains_key(parent)
            {
                return Err(RegistrationError::UnknownParent {
                    class: name.clone(),
                    parent: parent.to_owned(),
                });
            }
        }
        if is_cyclic_directed(&self.hierarchy) {
            let class = self
                .classes
                .keys()
                .find(|name| self.in_cycle(name))
                .cloned()
                .unwrap_or_default();
            return Err(RegistrationError::InheritanceCycle { class });
        }
        Ok(())
    }

    fn in_cycle(&self, name: &str) -> bool {
        let Some(&node) = self.nodes.get(name) else {
            return false;
        };
        self.hierarchy
            .neighbors_directed(node, Direction::Outgoing)
            .any(|parent| has_path_connecting(&self.hierarchy, parent, node, None))
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.values()
    }

    /// Host-defined entries, sorted by name.
    pub fn extensions(&self) -> Vec<&ClassEntry> {
        let mut out: Vec<_> = self.classes.values().filter(|e| e.is_extension()).collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    /// The class followed by its registered ancestors, nearest first.
    ///
    /// Stops at the first unregistered parent and never loops.
    pub fn ancestors(&self, name: &str) -> Vec<&ClassEntry> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(name);
        while let Some(entry) = current {
            if chain.len() > self.classes.len() {
                break;
            }
            chain.push(entry);
            current = entry.parent().and_then(|p| self.classes.get(p));
        }
        chain
    }

    /// Whether `class` is `ancestor` or derives from it.
    pub fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        match (self.nodes.get(class), self.nodes.get(ancestor)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.hierarchy, from, to, None),
            _ => false,
        }
    }

    /// Whether any class in the chain is reference counted.
    pub fn is_ref_counted(&self, class: &str) -> bool {
        self.ancestors(class)
            .iter()
            .any(|e| e.flags().contains(ClassFlags::REF_COUNTED))
    }

    // ==========================================================================
    // Virtual dispatch
    // ==========================================================================

    /// Find what runs when the engine calls `method` on an instance of
    /// `class`.
    ///
    /// Walks the parent chain from `class` upwards; the first class that
    /// overrides or declares the method decides the outcome.
    pub fn resolve_virtual(&self, class: &str, method: &str) -> Result<Resolution, DispatchError> {
        if !self.classes.contains_key(class) {
            return Err(DispatchError::UnregisteredClass {
                class: class.to_owned(),
            });
        }
        for entry in self.ancestors(class) {
            match entry.virtuals().get(method) {
                Some(VirtualSlot::Override(f)) => {
                    return Ok(Resolution::Override {
                        class: entry.name().to_owned(),
                        method: f.clone(),
                    });
                }
                Some(VirtualSlot::Declared) => {
                    return Ok(Resolution::EngineDefault {
                        class: entry.name().to_owned(),
                    });
                }
                None => {}
            }
        }
        Err(DispatchError::UnknownVirtual {
            class: class.to_owned(),
            method: method.to_owned(),
        })
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.classes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbridge_core::{ArgFrame, Slot};
    use std::any::Any;
    use std::sync::Arc;

    fn noop() -> VirtualFn {
        Arc::new(
            |_: &mut dyn Any, _: ArgFrame<'_>, _: &mut Slot| -> Result<(), DispatchError> {
                Ok(())
            },
        )
    }

    fn engine_tree() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        reg.register(ClassEntry::engine("Object", None).declare_name("_notification"))
            .unwrap();
        reg.register(
            ClassEntry::engine("Node", Some("Object"))
                .declare_name("_ready")
                .declare_name("_process"),
        )
        .unwrap();
        reg.register(ClassEntry::engine("CanvasItem", Some("Node")).declare_name("_draw"))
            .unwrap();
        reg
    }

    #[test]
    fn ancestors_nearest_first() {
        let reg = engine_tree();
        let names: Vec<_> = reg.ancestors("CanvasItem").iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["CanvasItem", "Node", "Object"]);
        assert!(reg.is_subclass("CanvasItem", "Object"));
        assert!(!reg.is_subclass("Object", "Node"));
    }

    #[test]
    fn nearest_declaration_wins() {
        let reg = engine_tree();
        let res = reg.resolve_virtual("CanvasItem", "_ready").unwrap();
        assert!(!res.is_override());
        assert_eq!(res.class(), "Node");

        let res = reg.resolve_virtual("CanvasItem", "_notification").unwrap();
        assert_eq!(res.class(), "Object");
    }

    #[test]
    fn override_beats_ancestor_declaration() {
        let mut reg = engine_tree();
        reg.register(
            ClassEntry::engine("Sprite", Some("CanvasItem")).with_override("_process", noop()),
        )
        .unwrap();
        let res = reg.resolve_virtual("Sprite", "_process").unwrap();
        assert!(res.is_override());
        assert_eq!(res.class(), "Sprite");
        assert_eq!(reg.resolve_virtual("Sprite", "_ready").unwrap().class(), "Node");
    }

    #[test]
    fn unknown_method_is_an_error() {
        let reg = engine_tree();
        assert_eq!(
            reg.resolve_virtual("Node", "_bogus").unwrap_err(),
            DispatchError::UnknownVirtual {
                class: "Node".into(),
                method: "_bogus".into()
            }
        );
        assert_eq!(
            reg.resolve_virtual("Missing", "_ready").unwrap_err(),
            DispatchError::UnregisteredClass {
                class: "Missing".into()
            }
        );
    }

    #[test]
    fn reregistration_is_last_writer_wins() {
        let mut reg = engine_tree();
        let prev = reg
            .register(ClassEntry::engine("Node", Some("Object")).declare_name("_input"))
            .unwrap();
        assert!(prev.is_some());
        assert_eq!(reg.len(), 3);
        assert!(reg.resolve_virtual("Node", "_ready").is_err());
        assert_eq!(reg.resolve_virtual("Node", "_input").unwrap().class(), "Node");
    }

    #[test]
    fn reparenting_updates_the_graph() {
        let mut reg = engine_tree();
        reg.register(ClassEntry::engine("Thing", Some("Node"))).unwrap();
        assert!(reg.is_subclass("Thing", "Node"));
        reg.register(ClassEntry::engine("Thing", Some("Object"))).unwrap();
        assert!(!reg.is_subclass("Thing", "Node"));
        assert!(reg.is_subclass("Thing", "Object"));
    }

    #[test]
    fn validate_reports_missing_parent_and_cycles() {
        let mut reg = engine_tree();
        assert_eq!(reg.validate(), Ok(()));

        reg.register(ClassEntry::engine("Orphan", Some("Nowhere"))).unwrap();
        assert_eq!(
            reg.validate(),
            Err(RegistrationError::UnknownParent {
                class: "Orphan".into(),
                parent: "Nowhere".into()
            })
        );

        let mut reg = ClassRegistry::new();
        reg.register(ClassEntry::engine("A", Some("B"))).unwrap();
        reg.register(ClassEntry::engine("B", Some("A"))).unwrap();
        assert!(matches!(
            reg.validate(),
            Err(RegistrationError::InheritanceCycle { .. })
        ));
        // chain walking still terminates
        assert!(reg.ancestors("A").len() <= 3);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut reg = ClassRegistry::new();
        assert_eq!(
            reg.register(ClassEntry::engine("", None)).unwrap_err(),
            RegistrationError::EmptyName
        );
    }

    #[test]
    fn ref_counted_is_inherited() {
        let mut reg = engine_tree();
        reg.register(
            ClassEntry::engine("RefCounted", Some("Object")).with_flags(ClassFlags::REF_COUNTED),
        )
        .unwrap();
        reg.register(ClassEntry::engine("ConfigFile", Some("RefCounted"))).unwrap();
        assert!(reg.is_ref_counted("ConfigFile"));
        assert!(!reg.is_ref_counted("Node"));
    }
}
