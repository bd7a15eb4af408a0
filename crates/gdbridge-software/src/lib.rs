//! An in-process implementation of the engine extension ABI.
//!
//! [`SoftwareEngine`] keeps objects, strings, string names and a small scene
//! tree in a mutex-guarded table and implements [`ExtensionApi`] over it. It
//! knows a handful of native classes (`Object`, `RefCounted`, `Node`,
//! `ConfigFile`, `FileAccess`, `Engine`) and an in-memory filesystem, which
//! is enough to run the binding layer headless in tests and benchmarks.
//!
//! Misuse that would corrupt memory in a real engine (using a freed object,
//! destroying a string twice, an invalid method bind) panics here.
//!
//! The state lock is never held while calling back into the host, so host
//! overrides may call engine methods freely.

mod classes;
mod config_text;
mod methods;
mod state;
mod tree;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use gdbridge_core::{
    ClassCreationInfo, ClassFlags, ConversionError, DispatchError, ExtensionApi, FromSlot,
    GString, Handle, InstanceHandle, InstanceId, IntoSlot, MethodBind, ObjectPtr, Slot,
    StringNamePtr, StringPtr, Variant, VariantPtr, VariantType,
};

use crate::classes::{DataKind, NativeClass};
use crate::state::{
    EngineState, ExtensionRecord, FileRecord, NameRecord, NodeData, ObjectData, ObjectRecord,
    Value,
};

/// Notification constants delivered through `_notification`.
pub mod notification {
    pub const PREDELETE: i64 = 1;
    pub const ENTER_TREE: i64 = 10;
    pub const EXIT_TREE: i64 = 11;
    pub const READY: i64 = 13;
    pub const PROCESS: i64 = 17;
    pub const PHYSICS_PROCESS: i64 = 16;
}

const ADDRESS_BASE: u64 = 0x1_0000;
const ADDRESS_STEP: u64 = 0x10;

/// Headless engine.
pub struct SoftwareEngine {
    state: Mutex<EngineState>,
    next_address: AtomicU64,
    next_instance_id: AtomicU64,
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareEngine {
    /// An engine with a scene tree root and the `Engine` singleton.
    pub fn new() -> Self {
        let engine = Self {
            state: Mutex::new(EngineState::default()),
            next_address: AtomicU64::new(ADDRESS_BASE),
            next_instance_id: AtomicU64::new(1),
        };

        let root = engine.create_native(native("Node"));
        let singleton = engine.create_native(native("Engine"));
        {
            let mut state = engine.state();
            if let Some(node) = state.record_mut(root).node_mut() {
                node.name = "root".to_owned();
                node.in_tree = true;
                node.ready = true;
            }
            state.root = root;
            state.singletons.insert("Engine", singleton);
        }
        engine
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn alloc(&self) -> u64 {
        self.next_address.fetch_add(ADDRESS_STEP, Ordering::Relaxed) + ADDRESS_STEP
    }

    fn create_native(&self, class: &'static NativeClass) -> ObjectPtr {
        let ptr = ObjectPtr::from_word(self.alloc());
        let id = InstanceId(self.next_instance_id.fetch_add(1, Ordering::Relaxed));
        let data = match class.data {
            DataKind::Plain => ObjectData::Plain,
            DataKind::Node => ObjectData::Node(NodeData::default()),
            DataKind::ConfigFile => ObjectData::ConfigFile(Default::default()),
        };
        let record = ObjectRecord {
            class: class.name.to_owned(),
            native_class: class.name,
            id,
            refcount: class.ref_counted.then_some(0),
            binding: None,
            data,
        };
        let mut state = self.state();
        state.objects.insert(ptr, record);
        state.by_id.insert(id, ptr);
        tracing::trace!(?ptr, class = class.name, "object created");
        ptr
    }

    /// Report an engine error through the regular error channel.
    pub(crate) fn report(&self, message: &str, function: &str) {
        self.print_error(message, function, file!(), line!());
    }

    /// Contents of the `String` argument in `slot`.
    pub(crate) fn text(&self, slot: &Slot) -> Result<String, ConversionError> {
        let string = GString::from_slot(slot)?;
        Ok(self.state().string(string.0.word()))
    }

    pub(crate) fn value_from_variant(&self, slot: &Slot) -> Result<Value, ConversionError> {
        let variant = Variant::from_slot(slot)?;
        Ok(match variant.variant_type()? {
            VariantType::Nil => Value::Nil,
            VariantType::Bool => Value::Bool(variant.to_bool()?),
            VariantType::Int => Value::Int(variant.to_int()?),
            VariantType::Float => Value::Float(variant.to_float()?),
            VariantType::Object => Value::Object(variant.to_object()?),
            VariantType::String => Value::Str(self.state().string(variant.0.words()[1])),
            other => {
                return Err(ConversionError::VariantType {
                    expected: "a storable value",
                    actual: other.name(),
                });
            }
        })
    }

    /// Build a variant the caller owns.
    pub(crate) fn variant_from_value(&self, value: &Value) -> Variant {
        match value {
            Value::Nil => Variant::NIL,
            Value::Bool(b) => Variant::from_bool(*b),
            Value::Int(i) => Variant::from_int(*i),
            Value::Float(f) => Variant::from_float(*f),
            Value::Object(ptr) => Variant::from_object(*ptr),
            Value::Str(text) => {
                let string = self.string_new(text);
                Variant(VariantPtr::from_words([
                    VariantType::String.into(),
                    string.word(),
                    0,
                ]))
            }
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// The scene tree root. Owned by the engine.
    pub fn root_node(&self) -> ObjectPtr {
        self.state().root
    }

    pub fn is_alive(&self, object: ObjectPtr) -> bool {
        self.state().objects.contains_key(&object)
    }

    /// `None` for freed or non-RefCounted objects.
    pub fn ref_count(&self, object: ObjectPtr) -> Option<u32> {
        self.state().objects.get(&object).and_then(|r| r.refcount)
    }

    pub fn class_of(&self, object: ObjectPtr) -> Option<String> {
        self.state().objects.get(&object).map(|r| r.class.clone())
    }

    pub fn live_objects(&self) -> usize {
        self.state().objects.len()
    }

    pub fn destroyed_objects(&self) -> u64 {
        self.state().destroyed
    }

    pub fn live_strings(&self) -> usize {
        self.state().strings.len()
    }

    pub fn live_string_names(&self) -> usize {
        self.state().names.len()
    }

    pub fn is_extension_class(&self, class: &str) -> bool {
        self.state().extensions.contains_key(class)
    }

    /// Create or replace a file in the in-memory filesystem.
    pub fn write_file(&self, path: &str, contents: &str) {
        let mut state = self.state();
        let file = state.files.entry(path.to_owned()).or_insert(FileRecord {
            contents: String::new(),
            permissions: 0o644,
        });
        file.contents = contents.to_owned();
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).map(|f| f.contents.clone())
    }

    pub fn file_permissions(&self, path: &str) -> Option<u32> {
        self.state().files.get(path).map(|f| f.permissions)
    }

    /// Drain the errors reported through `print_error`.
    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.state().errors)
    }
}

fn native(name: &str) -> &'static NativeClass {
    match classes::native_class(name) {
        Some(class) => class,
        None => panic!("native class table is missing {name}"),
    }
}

// ============================================================================
// ExtensionApi
// ============================================================================

impl ExtensionApi for SoftwareEngine {
    fn string_new(&self, text: &str) -> StringPtr {
        let word = self.alloc();
        self.state().strings.insert(word, text.to_owned());
        StringPtr::from_word(word)
    }

    fn string_to_utf8(&self, string: StringPtr) -> String {
        self.state().string(string.word())
    }

    fn string_destroy(&self, string: StringPtr) {
        if self.state().strings.remove(&string.word()).is_none() {
            panic!("String {string:?} destroyed twice");
        }
    }

    /// Names are interned; each call returns a new reference.
    fn string_name_new(&self, text: &str) -> StringNamePtr {
        let mut state = self.state();
        if let Some(&word) = state.names_by_text.get(text) {
            if let Some(record) = state.names.get_mut(&word) {
                record.refs += 1;
            }
            return StringNamePtr::from_word(word);
        }
        let word = self.alloc();
        state.names.insert(
            word,
            NameRecord {
                text: text.to_owned(),
                refs: 1,
            },
        );
        state.names_by_text.insert(text.to_owned(), word);
        StringNamePtr::from_word(word)
    }

    fn string_name_to_utf8(&self, name: StringNamePtr) -> String {
        self.state().name(name.word())
    }

    fn string_name_destroy(&self, name: StringNamePtr) {
        let mut state = self.state();
        let Some(record) = state.names.get_mut(&name.word()) else {
            panic!("StringName {name:?} destroyed twice");
        };
        record.refs -= 1;
        if record.refs == 0 {
            if let Some(record) = state.names.remove(&name.word()) {
                state.names_by_text.remove(&record.text);
            }
        }
    }

    fn variant_from_string(&self, string: StringPtr) -> VariantPtr {
        let text = self.string_to_utf8(string);
        let copy = self.string_new(&text);
        Handle::from_words([VariantType::String.into(), copy.word(), 0])
    }

    fn variant_to_string(&self, variant: VariantPtr) -> StringPtr {
        let variant = Variant(variant);
        let text = match variant.variant_type() {
            Ok(VariantType::Nil) => "<null>".to_owned(),
            Ok(VariantType::Bool) => variant.to_bool().unwrap_or_default().to_string(),
            Ok(VariantType::Int) => variant.to_int().unwrap_or_default().to_string(),
            Ok(VariantType::Float) => variant.to_float().unwrap_or_default().to_string(),
            Ok(VariantType::String) => self.state().string(variant.0.words()[1]),
            Ok(VariantType::Object) => {
                let ptr = ObjectPtr::from_word(variant.0.words()[1]);
                match self.state().objects.get(&ptr) {
                    Some(record) => format!("<{}#{}>", record.class, record.id.0),
                    None => "<Freed Object>".to_owned(),
                }
            }
            Ok(other) => format!("<{}>", other.name()),
            Err(err) => panic!("variant_to_string: {err}"),
        };
        self.string_new(&text)
    }

    fn variant_destroy(&self, variant: VariantPtr) {
        let [ty, payload, _] = variant.words();
        if ty == u64::from(VariantType::String) {
            self.string_destroy(StringPtr::from_word(payload));
        }
    }

    fn classdb_construct_object(&self, class: StringNamePtr) -> ObjectPtr {
        let name = self.state().name(class.word());
        let extension = self.state().extensions.get(&name).cloned();
        if let Some(extension) = extension {
            if extension.flags.contains(ClassFlags::ABSTRACT) {
                self.report(
                    &format!("class '{name}' is abstract"),
                    "ClassDB::instantiate",
                );
                return ObjectPtr::NULL;
            }
            return extension.callbacks.create_instance();
        }
        match classes::native_class(&name) {
            Some(native) if native.constructible => self.create_native(native),
            Some(_) => {
                self.report(
                    &format!("class '{name}' can't be instantiated"),
                    "ClassDB::instantiate",
                );
                ObjectPtr::NULL
            }
            None => {
                self.report(&format!("class '{name}' does not exist"), "ClassDB::instantiate");
                ObjectPtr::NULL
            }
        }
    }

    fn classdb_get_method_bind(
        &self,
        class: StringNamePtr,
        method: StringNamePtr,
        hash: i64,
    ) -> MethodBind {
        let class = self.state().name(class.word());
        let method = self.state().name(method.word());
        match classes::find_method(&class, &method) {
            Some((index, def)) if def.hash == hash => {
                MethodBind(Handle::from_word(classes::bind_word(index)))
            }
            Some((_, def)) => {
                self.report(
                    &format!(
                        "method bind {class}::{method} has hash {}, requested {hash}",
                        def.hash
                    ),
                    "ClassDB::get_method_bind",
                );
                MethodBind::NULL
            }
            None => {
                self.report(
                    &format!("method bind {class}::{method} not found"),
                    "ClassDB::get_method_bind",
                );
                MethodBind::NULL
            }
        }
    }

    fn object_method_bind_ptrcall(
        &self,
        bind: MethodBind,
        receiver: ObjectPtr,
        args: &[Slot],
        ret: &mut Slot,
    ) {
        let Some(def) = classes::method_for_bind(bind.0.word()) else {
            panic!("invalid method bind {bind:?}");
        };
        if args.len() != def.argc {
            panic!(
                "{}::{} takes {} argument(s), got {}",
                def.class,
                def.name,
                def.argc,
                args.len()
            );
        }
        if !def.is_static {
            let state = self.state();
            let Some(record) = state.objects.get(&receiver) else {
                panic!("{}::{} called on freed object {receiver:?}", def.class, def.name);
            };
            if !classes::inherits(record.native_class, def.class) {
                panic!(
                    "{}::{} called on an object of class {}",
                    def.class, def.name, record.class
                );
            }
        }
        if let Err(err) = (def.func)(self, receiver, args, ret) {
            self.report(&err.to_string(), def.name);
        }
    }

    fn object_destroy(&self, object: ObjectPtr) {
        if !self.is_alive(object) {
            panic!("object {object:?} destroyed twice or never created");
        }
        self.destroy_tree(object);
    }

    fn object_get_instance_id(&self, object: ObjectPtr) -> InstanceId {
        self.state().record(object).id
    }

    fn object_get_instance_from_id(&self, id: InstanceId) -> ObjectPtr {
        self.state()
            .by_id
            .get(&id)
            .copied()
            .unwrap_or(ObjectPtr::NULL)
    }

    fn object_get_class_name(&self, object: ObjectPtr) -> StringNamePtr {
        let class = self.state().record(object).class.clone();
        self.string_name_new(&class)
    }

    fn object_set_instance(
        &self,
        object: ObjectPtr,
        class: StringNamePtr,
        instance: InstanceHandle,
    ) {
        let mut state = self.state();
        let class = state.name(class.word());
        let record = state.record_mut(object);
        record.class = class;
        record.binding = Some(instance);
    }

    fn global_get_singleton(&self, name: StringNamePtr) -> ObjectPtr {
        let state = self.state();
        let name = state.name(name.word());
        state
            .singletons
            .get(name.as_str())
            .copied()
            .unwrap_or(ObjectPtr::NULL)
    }

    fn object_is_ref_counted(&self, object: ObjectPtr) -> bool {
        self.state().record(object).refcount.is_some()
    }

    fn ref_reference(&self, object: ObjectPtr) -> bool {
        match &mut self.state().record_mut(object).refcount {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    fn ref_unreference(&self, object: ObjectPtr) -> bool {
        match &mut self.state().record_mut(object).refcount {
            Some(0) => panic!("reference count of {object:?} is already zero"),
            Some(count) => {
                *count -= 1;
                *count == 0
            }
            None => false,
        }
    }

    fn classdb_register_extension_class(
        &self,
        class: StringNamePtr,
        parent: StringNamePtr,
        info: ClassCreationInfo,
    ) {
        let class = self.state().name(class.word());
        let parent = self.state().name(parent.word());
        let parent_known =
            classes::native_class(&parent).is_some() || self.is_extension_class(&parent);
        if !parent_known {
            self.report(
                &format!("class '{class}' extends unknown class '{parent}'"),
                "ClassDB::register_extension_class",
            );
            return;
        }
        tracing::debug!(%class, %parent, "extension class registered with engine");
        self.state().extensions.insert(
            class,
            ExtensionRecord {
                parent,
                flags: info.flags,
                callbacks: info.callbacks,
            },
        );
    }

    fn print_error(&self, message: &str, function: &str, file: &str, line: u32) {
        tracing::error!(function, file, line, "{message}");
        self.state().errors.push(format!("{function}: {message}"));
    }
}

// ============================================================================
// Virtual dispatch into the host
// ============================================================================

impl SoftwareEngine {
    /// Call virtual `name` on `object` if its class overrides it.
    ///
    /// Returns `Ok(false)` when the engine default applies (plain objects,
    /// or host classes without an override).
    pub fn dispatch_virtual(
        &self,
        object: ObjectPtr,
        name: &str,
        args: &[Slot],
        ret: &mut Slot,
    ) -> Result<bool, DispatchError> {
        let target = {
            let state = self.state();
            let record = state.record(object);
            record.binding.and_then(|instance| {
                state
                    .extensions
                    .get(&record.class)
                    .map(|ext| (instance, ext.callbacks.clone()))
            })
        };
        let Some((instance, callbacks)) = target else {
            return Ok(false);
        };
        match callbacks.get_virtual(name)? {
            Some(call) => {
                call(instance, args, ret)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Engine-initiated dispatch: failures are reported, not returned.
    pub(crate) fn notify(&self, object: ObjectPtr, name: &str, args: &[Slot]) {
        let mut ret = Slot::ZERO;
        if let Err(err) = self.dispatch_virtual(object, name, args, &mut ret) {
            self.report(&err.to_string(), name);
        }
    }

    /// Deliver `_notification(what)`.
    pub fn notification(&self, object: ObjectPtr, what: i64) {
        self.notify(object, "_notification", &[what.into_slot()]);
    }

    /// Advance one idle frame: `_process(delta)` on every node in the tree,
    /// parents before children.
    pub fn process_frame(&self, delta: f64) -> Result<(), DispatchError> {
        self.state().process_frames += 1;
        self.frame_pass("_process", notification::PROCESS, delta)
    }

    /// Advance one physics tick.
    pub fn physics_frame(&self, delta: f64) -> Result<(), DispatchError> {
        self.frame_pass("_physics_process", notification::PHYSICS_PROCESS, delta)
    }

    fn frame_pass(&self, name: &str, what: i64, delta: f64) -> Result<(), DispatchError> {
        let root = self.root_node();
        let mut first_error = None;
        for node in self.subtree_pre_order(root) {
            if !self.is_alive(node) {
                continue;
            }
            self.notification(node, what);
            let mut ret = Slot::ZERO;
            if let Err(err) = self.dispatch_virtual(node, name, &[delta.into_slot()], &mut ret) {
                self.report(&err.to_string(), name);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
