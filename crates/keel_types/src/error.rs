use thiserror::Error;

use crate::registry::MAX_TYPE_COUNT;

/// Errors that can occur while registering component types.
///
/// All of these are configuration errors: the candidate list handed to the
/// registry is malformed or over capacity. None of them are retried; a batch
/// that fails leaves none of its types registered.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component type registry is full (requested {requested} of {MAX_TYPE_COUNT} types); increase MAX_TYPE_COUNT")]
    CapacityExceeded { requested: usize },

    #[error("component type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("component type '{name}' declares a write group against '{target}', which is not a registered component in this batch")]
    UnknownWriteGroupTarget { name: String, target: String },

    #[error("component type '{name}' declares a write group against itself")]
    SelfWriteGroup { name: String },

    #[error("component type '{name}' declares write groups but was registered after the startup batch; write groups must be declared in a batch")]
    LateWriteGroup { name: String },

    #[error("buffer component '{name}' has zero-sized elements")]
    ZeroSizedBufferElement { name: String },

    #[error("buffer component '{name}' declares capacity {capacity}, which makes its block size exceed the representable maximum")]
    BufferCapacityTooLarge { name: String, capacity: usize },

    #[error("component type '{name}' declares a buffer capacity but is not a buffer component")]
    CapacityOnNonBuffer { name: String },

    #[error("component type declaration has an empty qualified name")]
    EmptyTypeName,
}
