//! Runtime startup errors.

use thiserror::Error;

use gdbridge_core::RegistrationError;

/// Errors from [`RuntimeBuilder::build`](crate::RuntimeBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The class set failed validation.
    #[error("class registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// A host class tried to take the name of an engine class.
    #[error("host class '{0}' shadows an engine class")]
    ShadowsEngineClass(String),
}
