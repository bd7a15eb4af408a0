//! Built-in class and method tables.

use gdbridge_core::{ConversionError, ObjectPtr, Slot};

use crate::SoftwareEngine;
use crate::methods;

/// What backing data a native class carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    Plain,
    Node,
    ConfigFile,
}

#[derive(Debug)]
pub struct NativeClass {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub ref_counted: bool,
    pub constructible: bool,
    pub data: DataKind,
}

pub const CLASSES: &[NativeClass] = &[
    NativeClass {
        name: "Object",
        parent: None,
        ref_counted: false,
        constructible: true,
        data: DataKind::Plain,
    },
    NativeClass {
        name: "RefCounted",
        parent: Some("Object"),
        ref_counted: true,
        constructible: true,
        data: DataKind::Plain,
    },
    NativeClass {
        name: "Node",
        parent: Some("Object"),
        ref_counted: false,
        constructible: true,
        data: DataKind::Node,
    },
    NativeClass {
        name: "ConfigFile",
        parent: Some("RefCounted"),
        ref_counted: true,
        constructible: true,
        data: DataKind::ConfigFile,
    },
    NativeClass {
        name: "FileAccess",
        parent: Some("RefCounted"),
        ref_counted: true,
        constructible: false,
        data: DataKind::Plain,
    },
    NativeClass {
        name: "Engine",
        parent: Some("Object"),
        ref_counted: false,
        constructible: false,
        data: DataKind::Plain,
    },
];

pub fn native_class(name: &str) -> Option<&'static NativeClass> {
    CLASSES.iter().find(|c| c.name == name)
}

/// Whether native class `class` is `ancestor` or derives from it.
pub fn inherits(class: &str, ancestor: &str) -> bool {
    let mut current = native_class(class);
    while let Some(c) = current {
        if c.name == ancestor {
            return true;
        }
        current = c.parent.and_then(native_class);
    }
    false
}

/// Argument count is checked before the call; decoding failures are
/// reported through the engine's error channel.
pub type NativeMethod =
    fn(&SoftwareEngine, ObjectPtr, &[Slot], &mut Slot) -> Result<(), ConversionError>;

#[derive(Debug)]
pub struct MethodDef {
    pub class: &'static str,
    pub name: &'static str,
    pub hash: i64,
    pub argc: usize,
    pub is_static: bool,
    pub func: NativeMethod,
}

macro_rules! method {
    (static $class:literal, $name:literal, $hash:literal, $argc:literal, $func:path) => {
        MethodDef {
            class: $class,
            name: $name,
            hash: $hash,
            argc: $argc,
            is_static: true,
            func: $func,
        }
    };
    ($class:literal, $name:literal, $hash:literal, $argc:literal, $func:path) => {
        MethodDef {
            class: $class,
            name: $name,
            hash: $hash,
            argc: $argc,
            is_static: false,
            func: $func,
        }
    };
}

#[rustfmt::skip]
pub const METHODS: &[MethodDef] = &[
    method!("Object", "get_class", 201670096, 0, methods::object_get_class),
    method!("Object", "get_instance_id", 3905245786, 0, methods::object_get_instance_id),
    method!("RefCounted", "get_reference_count", 3905245786, 0, methods::ref_counted_get_reference_count),
    method!("Node", "set_name", 83702148, 1, methods::node_set_name),
    method!("Node", "get_name", 2002593661, 0, methods::node_get_name),
    method!("Node", "add_child", 3863233950, 3, methods::node_add_child),
    method!("Node", "remove_child", 1078189570, 1, methods::node_remove_child),
    method!("Node", "get_child_count", 894402480, 1, methods::node_get_child_count),
    method!("Node", "get_child", 541253412, 2, methods::node_get_child),
    method!("Node", "get_parent", 3160264692, 0, methods::node_get_parent),
    method!("Node", "is_inside_tree", 36873697, 0, methods::node_is_inside_tree),
    method!("ConfigFile", "set_value", 2504492430, 3, methods::config_set_value),
    method!("ConfigFile", "get_value", 89809366, 3, methods::config_get_value),
    method!("ConfigFile", "has_section", 3927539163, 1, methods::config_has_section),
    method!("ConfigFile", "has_section_key", 820780508, 2, methods::config_has_section_key),
    method!("ConfigFile", "save", 166001499, 1, methods::config_save),
    method!("ConfigFile", "load", 166001499, 1, methods::config_load),
    method!("ConfigFile", "parse", 166001499, 1, methods::config_parse),
    method!("ConfigFile", "clear", 3218959716, 0, methods::config_clear),
    method!(static "FileAccess", "file_exists", 2323990056, 1, methods::file_exists),
    method!(static "FileAccess", "get_unix_permissions", 524341837, 1, methods::file_get_unix_permissions),
    method!(static "FileAccess", "set_unix_permissions", 846038644, 2, methods::file_set_unix_permissions),
    method!("Engine", "get_process_frames", 3905245786, 0, methods::engine_get_process_frames),
    method!("Engine", "is_editor_hint", 36873697, 0, methods::engine_is_editor_hint),
];

/// Bind handles are offset so they never collide with null.
const BIND_BASE: u64 = 0xB1D0_0000;

pub fn bind_word(index: usize) -> u64 {
    BIND_BASE + index as u64
}

pub fn method_for_bind(word: u64) -> Option<&'static MethodDef> {
    let index = word.checked_sub(BIND_BASE)?;
    METHODS.get(index as usize)
}

pub fn find_method(class: &str, name: &str) -> Option<(usize, &'static MethodDef)> {
    METHODS
        .iter()
        .enumerate()
        .find(|(_, m)| m.class == class && m.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy() {
        assert!(inherits("ConfigFile", "Object"));
        assert!(inherits("Node", "Node"));
        assert!(!inherits("Node", "RefCounted"));
        assert!(!inherits("Missing", "Object"));
    }

    #[test]
    fn binds_round_trip() {
        let (index, def) = find_method("Node", "add_child").unwrap();
        assert_eq!(def.argc, 3);
        assert_eq!(method_for_bind(bind_word(index)).unwrap().name, "add_child");
        assert!(method_for_bind(0).is_none());
    }

    #[test]
    fn every_method_class_exists() {
        for m in METHODS {
            assert!(native_class(m.class).is_some(), "{}", m.class);
        }
    }
}
