//! Keel Engine component-type registry
//!
//! Assigns stable, bit-encoded indices to component data types and computes
//! the metadata the storage and query layers run on:
//! - Dense table indices with classification flags packed in the high bits
//! - Block-layout metadata (size, alignment, inline buffer capacity)
//! - Cross-run stable identity via an FNV-1a hash of the qualified name
//! - Write-group exclusion sets for query filtering
//!
//! The registry is populated once at startup from the discovery step's
//! candidate list; types first touched later register lazily and safely
//! under concurrency.

mod declaration;
mod descriptor;
mod entity;
mod error;
mod index;
mod registry;
mod stable_hash;
mod write_group;

pub use declaration::{ComponentData, TypeDeclaration};
pub use descriptor::{TypeCategory, TypeDescriptor, BUFFER_HEADER_BYTES};
pub use entity::Entity;
pub use error::RegistryError;
pub use index::TypeIndex;
pub use registry::{
    initialize_types, registry, try_type_index_of, type_index_of, TypeRegistry, MAX_TYPE_COUNT,
};
pub use stable_hash::StableTypeHash;

#[doc(hidden)]
pub type __TypeIndexCell = once_cell::sync::OnceCell<TypeIndex>;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
