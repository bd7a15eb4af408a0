//! Minimal in-memory engine used by this crate's unit tests.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::api::{ClassCreationInfo, ExtensionApi};
use crate::convert::Slot;
use crate::handle::{
    Handle, InstanceHandle, InstanceId, MethodBind, ObjectPtr, StringNamePtr, StringPtr,
    VariantPtr,
};
use crate::variant::VariantType;

#[derive(Default)]
struct State {
    next: u64,
    objects: FxHashMap<ObjectPtr, Option<u32>>,
    strings: FxHashMap<u64, String>,
    names: FxHashMap<u64, String>,
    destroyed: Vec<ObjectPtr>,
    calls: Vec<(MethodBind, ObjectPtr, Vec<Slot>)>,
}

/// Records everything; objects are either plain or reference counted.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn alloc(state: &mut State) -> u64 {
        state.next += 0x10;
        state.next
    }

    pub fn new_object(&self) -> ObjectPtr {
        let mut state = self.state();
        let ptr = ObjectPtr::from_word(Self::alloc(&mut state));
        state.objects.insert(ptr, None);
        ptr
    }

    pub fn new_ref_counted(&self) -> ObjectPtr {
        let mut state = self.state();
        let ptr = ObjectPtr::from_word(Self::alloc(&mut state));
        state.objects.insert(ptr, Some(0));
        ptr
    }

    pub fn ref_count(&self, object: ObjectPtr) -> Option<u32> {
        self.state().objects.get(&object).copied().flatten()
    }

    pub fn is_alive(&self, object: ObjectPtr) -> bool {
        self.state().objects.contains_key(&object)
    }

    pub fn destroyed(&self) -> Vec<ObjectPtr> {
        self.state().destroyed.clone()
    }

    pub fn live_strings(&self) -> usize {
        self.state().strings.len()
    }

    pub fn live_names(&self) -> usize {
        self.state().names.len()
    }

    pub fn calls(&self) -> Vec<(MethodBind, ObjectPtr, Vec<Slot>)> {
        self.state().calls.clone()
    }
}

impl ExtensionApi for FakeApi {
    fn string_new(&self, text: &str) -> StringPtr {
        let mut state = self.state();
        let id = Self::alloc(&mut state);
        state.strings.insert(id, text.to_owned());
        StringPtr::from_word(id)
    }

    fn string_to_utf8(&self, string: StringPtr) -> String {
        self.state().strings.get(&string.word()).cloned().unwrap_or_default()
    }

    fn string_destroy(&self, string: StringPtr) {
        let removed = self.state().strings.remove(&string.word());
        assert!(removed.is_some(), "string {string:?} destroyed twice");
    }

    fn string_name_new(&self, text: &str) -> StringNamePtr {
        let mut state = self.state();
        let id = Self::alloc(&mut state);
        state.names.insert(id, text.to_owned());
        StringNamePtr::from_word(id)
    }

    fn string_name_to_utf8(&self, name: StringNamePtr) -> String {
        self.state().names.get(&name.word()).cloned().unwrap_or_default()
    }

    fn string_name_destroy(&self, name: StringNamePtr) {
        let removed = self.state().names.remove(&name.word());
        assert!(removed.is_some(), "string name {name:?} destroyed twice");
    }

    fn variant_from_string(&self, string: StringPtr) -> VariantPtr {
        let text = self.string_to_utf8(string);
        let copy = self.string_new(&text);
        Handle::from_words([VariantType::String as u64, copy.word(), 0])
    }

    fn variant_to_string(&self, variant: VariantPtr) -> StringPtr {
        let [ty, payload, _] = variant.words();
        if ty == VariantType::String as u64 {
            let text = self.string_to_utf8(StringPtr::from_word(payload));
            self.string_new(&text)
        } else {
            self.string_new(&format!("{}", payload as i64))
        }
    }

    fn variant_destroy(&self, variant: VariantPtr) {
        let [ty, payload, _] = variant.words();
        if ty == VariantType::String as u64 {
            self.string_destroy(StringPtr::from_word(payload));
        }
    }

    fn classdb_construct_object(&self, _class: StringNamePtr) -> ObjectPtr {
        self.new_object()
    }

    fn classdb_get_method_bind(&self, _: StringNamePtr, _: StringNamePtr, hash: i64) -> MethodBind {
        MethodBind(Handle::from_word(hash as u64))
    }

    fn object_method_bind_ptrcall(
        &self,
        bind: MethodBind,
        receiver: ObjectPtr,
        args: &[Slot],
        ret: &mut Slot,
    ) {
        self.state().calls.push((bind, receiver, args.to_vec()));
        *ret = Slot::from_word(args.len() as u64);
    }

    fn object_destroy(&self, object: ObjectPtr) {
        let mut state = self.state();
        assert!(
            state.objects.remove(&object).is_some(),
            "object {object:?} destroyed twice"
        );
        state.destroyed.push(object);
    }

    fn object_get_instance_id(&self, object: ObjectPtr) -> InstanceId {
        InstanceId(object.word())
    }

    fn object_get_instance_from_id(&self, id: InstanceId) -> ObjectPtr {
        ObjectPtr::from_word(id.0)
    }

    fn object_get_class_name(&self, _object: ObjectPtr) -> StringNamePtr {
        self.string_name_new("Object")
    }

    fn object_set_instance(&self, _: ObjectPtr, _: StringNamePtr, _: InstanceHandle) {}

    fn global_get_singleton(&self, _name: StringNamePtr) -> ObjectPtr {
        ObjectPtr::NULL
    }

    fn object_is_ref_counted(&self, object: ObjectPtr) -> bool {
        matches!(self.state().objects.get(&object), Some(Some(_)))
    }

    fn ref_reference(&self, object: ObjectPtr) -> bool {
        match self.state().objects.get_mut(&object) {
            Some(Some(count)) => {
                *count += 1;
                true
            }
            _ => false,
        }
    }

    fn ref_unreference(&self, object: ObjectPtr) -> bool {
        match self.state().objects.get_mut(&object) {
            Some(Some(count)) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            _ => false,
        }
    }

    fn classdb_register_extension_class(
        &self,
        _: StringNamePtr,
        _: StringNamePtr,
        _: ClassCreationInfo,
    ) {
    }

    fn print_error(&self, _: &str, _: &str, _: &str, _: u32) {}
}
