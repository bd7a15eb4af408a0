//! Engine-side bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use gdbridge_core::{ClassFlags, ExtensionClassCallbacks, InstanceHandle, InstanceId, ObjectPtr};

/// A value stored by the engine itself (config entries, variant payloads).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjectPtr),
}

#[derive(Debug, Default)]
pub struct NodeData {
    pub name: String,
    pub parent: Option<ObjectPtr>,
    pub children: Vec<ObjectPtr>,
    pub in_tree: bool,
    /// `_ready` runs once per node lifetime.
    pub ready: bool,
}

pub type ConfigData = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug)]
pub enum ObjectData {
    Plain,
    Node(NodeData),
    ConfigFile(ConfigData),
}

#[derive(Debug)]
pub struct ObjectRecord {
    /// Dynamic class: the extension class once an instance is bound.
    pub class: String,
    pub native_class: &'static str,
    pub id: InstanceId,
    /// `None` for objects that are not reference counted.
    pub refcount: Option<u32>,
    pub binding: Option<InstanceHandle>,
    pub data: ObjectData,
}

impl ObjectRecord {
    pub fn node(&self) -> Option<&NodeData> {
        match &self.data {
            ObjectData::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut NodeData> {
        match &mut self.data {
            ObjectData::Node(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ExtensionRecord {
    pub parent: String,
    pub flags: ClassFlags,
    pub callbacks: Arc<dyn ExtensionClassCallbacks>,
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub contents: String,
    pub permissions: u32,
}

#[derive(Debug)]
pub struct NameRecord {
    pub text: String,
    pub refs: u32,
}

#[derive(Default)]
pub struct EngineState {
    pub objects: FxHashMap<ObjectPtr, ObjectRecord>,
    pub by_id: FxHashMap<InstanceId, ObjectPtr>,
    pub strings: FxHashMap<u64, String>,
    pub names: FxHashMap<u64, NameRecord>,
    pub names_by_text: FxHashMap<String, u64>,
    pub extensions: FxHashMap<String, ExtensionRecord>,
    pub singletons: FxHashMap<&'static str, ObjectPtr>,
    pub files: BTreeMap<String, FileRecord>,
    pub root: ObjectPtr,
    pub process_frames: i64,
    pub destroyed: u64,
    pub errors: Vec<String>,
}

impl EngineState {
    pub fn string(&self, word: u64) -> String {
        match self.strings.get(&word) {
            Some(text) => text.clone(),
            None => panic!("use of destroyed String {word:#x}"),
        }
    }

    pub fn name(&self, word: u64) -> String {
        match self.names.get(&word) {
            Some(record) => record.text.clone(),
            None => panic!("use of destroyed StringName {word:#x}"),
        }
    }

    pub fn record(&self, object: ObjectPtr) -> &ObjectRecord {
        match self.objects.get(&object) {
            Some(record) => record,
            None => panic!("use of freed object {object:?}"),
        }
    }

    pub fn record_mut(&mut self, object: ObjectPtr) -> &mut ObjectRecord {
        match self.objects.get_mut(&object) {
            Some(record) => record,
            None => panic!("use of freed object {object:?}"),
        }
    }
}
