//! Error types for the binding core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError          - failures at a native call site
//! ├── ConversionError  - a slot could not be decoded into a host value
//! └── DispatchError    - virtual dispatch misconfiguration
//! RegistrationError    - class registry validation failures
//! ```
//!
//! Ownership-protocol violations (double end, stale ids, refcount underflow)
//! are programming errors and panic instead of returning one of these.

use thiserror::Error;

use crate::handle::InstanceHandle;

// ============================================================================
// Conversion Errors
// ============================================================================

/// A slot held a value the requested host type cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Integer does not fit in the target type.
    #[error("integer {value} does not fit in {target_type}")]
    IntegerOverflow {
        value: i64,
        target_type: &'static str,
    },

    /// Boolean slot held something other than 0 or 1.
    #[error("invalid boolean word {word:#x}")]
    InvalidBool { word: u64 },

    /// Integer outside the engine's `Error` range.
    #[error("unknown error code {0}")]
    UnknownErrorCode(i64),

    /// Variant type tag is not one the host understands.
    #[error("unknown variant type {0}")]
    UnknownVariantType(u64),

    /// Variant held a different type than requested.
    #[error("expected variant of type {expected}, found {actual}")]
    VariantType {
        expected: &'static str,
        actual: &'static str,
    },
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Virtual dispatch could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The class was never registered.
    #[error("class '{class}' is not registered")]
    UnregisteredClass { class: String },

    /// No class in the chain declares or overrides the method.
    #[error("virtual method '{method}' is not declared anywhere in the hierarchy of '{class}'")]
    UnknownVirtual { class: String, method: String },

    /// The engine supplied the wrong number of arguments.
    #[error("'{method}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An argument slot could not be decoded.
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: ConversionError,
    },

    /// The instance behind the handle has an unexpected host type.
    #[error("instance is not a {expected}")]
    InstanceType { expected: &'static str },

    /// The instance is already executing a virtual call.
    #[error("instance {0:?} is already in use by another virtual call")]
    InstanceBusy(InstanceHandle),

    /// The instance handle is not (or no longer) known to the host.
    #[error("instance {0:?} does not exist")]
    InstanceNotFound(InstanceHandle),

    /// The host runtime that registered the class has shut down.
    #[error("runtime for class '{class}' has shut down")]
    RuntimeGone { class: String },
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Class registry validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Class names must be non-empty.
    #[error("class name is empty")]
    EmptyName,

    /// A class names a parent that is not registered.
    #[error("class '{class}' extends unknown class '{parent}'")]
    UnknownParent { class: String, parent: String },

    /// The parent chain loops back on itself.
    #[error("class '{class}' is part of an inheritance cycle")]
    InheritanceCycle { class: String },
}

// ============================================================================
// Bridge Errors
// ============================================================================

/// Failure at a native call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The engine has no method bind for this class/method/hash.
    #[error("method bind {class}::{method} (hash {hash}) could not be resolved")]
    MethodNotFound {
        class: &'static str,
        method: &'static str,
        hash: i64,
    },

    /// Frame argument count does not match the bind's signature.
    #[error("{class}::{method} takes {expected} argument(s), frame holds {actual}")]
    ArgumentCount {
        class: &'static str,
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Instance method called with a null receiver.
    #[error("{class}::{method} called on a null object")]
    NullReceiver {
        class: &'static str,
        method: &'static str,
    },

    /// The engine refused to construct the class.
    #[error("engine could not construct class '{class}'")]
    ConstructFailed { class: String },

    /// No engine singleton with this name.
    #[error("engine singleton '{name}' not found")]
    SingletonNotFound { name: String },

    /// Return slot could not be decoded.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Virtual dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
