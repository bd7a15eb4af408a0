//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gdbridge::classes::Node;
use gdbridge::{Runtime, RuntimeBuilder, RuntimeProperty};
use gdbridge_core::GodotClass;
use gdbridge_software::SoftwareEngine;

pub fn engine() -> Arc<SoftwareEngine> {
    Arc::new(SoftwareEngine::new())
}

/// A builder with the reference ledger on, whatever the build profile.
pub fn builder(engine: &Arc<SoftwareEngine>) -> RuntimeBuilder {
    Runtime::builder(engine.clone()).property(RuntimeProperty::RefLedger, 1)
}

pub fn runtime(engine: &Arc<SoftwareEngine>) -> Runtime {
    builder(engine).build().expect("runtime should build")
}

pub fn scene_root(engine: &SoftwareEngine) -> Node {
    Node::from_object_ptr(engine.root_node())
}
