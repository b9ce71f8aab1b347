// declaration.rs - Candidate type declarations
//
// The discovery step (a build-time scan or explicit startup calls) produces
// a flat list of TypeDeclaration values; the registry consumes that list
// without caring how it was gathered. Rust call sites that know their type
// statically implement ComponentData instead, usually through
// define_component_type!, and resolve indices through the per-type cache.

use std::borrow::Cow;

use once_cell::sync::OnceCell;

use crate::descriptor::TypeCategory;
use crate::error::RegistryError;
use crate::index::TypeIndex;

/// One candidate component type plus its declared metadata, as handed to
/// [`crate::TypeRegistry::register_batch`].
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    qualified_name: Cow<'static, str>,
    category: TypeCategory,
    value_size: usize,
    buffer_capacity: Option<usize>,
    system_state: bool,
    forced_memory_ordering: Option<u64>,
    entity_offsets: Vec<u32>,
    write_group_targets: Vec<Cow<'static, str>>,
}

impl TypeDeclaration {
    fn new(
        qualified_name: impl Into<Cow<'static, str>>,
        category: TypeCategory,
        value_size: usize,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            category,
            value_size,
            buffer_capacity: None,
            system_state: false,
            forced_memory_ordering: None,
            entity_offsets: Vec::new(),
            write_group_targets: Vec::new(),
        }
    }

    /// Declare a plain per-entity data type.
    pub fn plain<T>(qualified_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(
            qualified_name,
            TypeCategory::PlainData,
            std::mem::size_of::<T>(),
        )
    }

    /// Declare a variable-length buffer type with `T` as the element.
    pub fn buffer<T>(qualified_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(
            qualified_name,
            TypeCategory::BufferData,
            std::mem::size_of::<T>(),
        )
    }

    /// Declare a shared (by-reference) data type.
    pub fn shared<T>(qualified_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(
            qualified_name,
            TypeCategory::SharedData,
            std::mem::size_of::<T>(),
        )
    }

    /// Declare a heap-managed reference type. These occupy no block space,
    /// so no Rust layout is needed.
    pub fn managed(qualified_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(qualified_name, TypeCategory::ManagedReference, 0)
    }

    /// Override the inline element capacity. Only meaningful for buffers.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Mark the type as persisting across entity destruction for cleanup
    /// bookkeeping.
    pub fn system_state(mut self) -> Self {
        self.system_state = true;
        self
    }

    /// Force the block-sort key instead of deriving it from the stable hash.
    pub fn with_memory_ordering(mut self, ordering: u64) -> Self {
        self.forced_memory_ordering = Some(ordering);
        self
    }

    /// Record the byte offsets of embedded entity values.
    pub fn with_entity_offsets(mut self, offsets: &[u32]) -> Self {
        self.entity_offsets = offsets.to_vec();
        self
    }

    /// Declare that this type writes the same logical output as `target`.
    /// May be called multiple times; duplicate targets collapse.
    pub fn writes_same_output_as(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.write_group_targets.push(target.into());
        self
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn category(&self) -> TypeCategory {
        self.category
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn buffer_capacity(&self) -> Option<usize> {
        self.buffer_capacity
    }

    pub fn is_system_state(&self) -> bool {
        self.system_state
    }

    pub fn forced_memory_ordering(&self) -> Option<u64> {
        self.forced_memory_ordering
    }

    pub fn entity_offsets(&self) -> &[u32] {
        &self.entity_offsets
    }

    pub fn write_group_targets(&self) -> impl Iterator<Item = &str> {
        self.write_group_targets.iter().map(|target| target.as_ref())
    }

    pub fn has_write_group_targets(&self) -> bool {
        !self.write_group_targets.is_empty()
    }

    /// Check declaration consistency before any table slot is reserved.
    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if self.qualified_name.is_empty() {
            return Err(RegistryError::EmptyTypeName);
        }
        if self.buffer_capacity.is_some() && self.category != TypeCategory::BufferData {
            return Err(RegistryError::CapacityOnNonBuffer {
                name: self.qualified_name.to_string(),
            });
        }
        if self.category == TypeCategory::BufferData && self.value_size == 0 {
            return Err(RegistryError::ZeroSizedBufferElement {
                name: self.qualified_name.to_string(),
            });
        }
        Ok(())
    }
}

/// Trait for Rust types registered with the component-type registry.
///
/// Implement it through [`define_component_type!`] for plain data types, or
/// by hand when the declaration needs buffer/shared/system-state metadata.
/// The hidden cache slot backs the lock-free typed fast path; it belongs to
/// the process-wide registry and must not be shared with ad-hoc instances.
pub trait ComponentData: Send + Sync + 'static {
    /// Fully-qualified name, the input to the stable hash. Must not change
    /// across builds or persisted data loses its identity.
    const QUALIFIED_NAME: &'static str;

    /// The declaration the registry would receive for this type.
    fn declaration() -> TypeDeclaration;

    #[doc(hidden)]
    fn index_cache() -> &'static OnceCell<TypeIndex>;
}

/// Implement [`ComponentData`] for a type.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component_type!(Position, "game::Position");
///
/// // Non-plain declarations take an explicit declaration expression:
/// define_component_type!(
///     Waypoints,
///     "game::Waypoints",
///     keel_types::TypeDeclaration::buffer::<Waypoints>("game::Waypoints")
/// );
/// ```
#[macro_export]
macro_rules! define_component_type {
    ($ty:ty, $name:expr) => {
        $crate::define_component_type!(
            $ty,
            $name,
            $crate::TypeDeclaration::plain::<$ty>($name)
        );
    };
    ($ty:ty, $name:expr, $declaration:expr) => {
        impl $crate::ComponentData for $ty {
            const QUALIFIED_NAME: &'static str = $name;

            fn declaration() -> $crate::TypeDeclaration {
                $declaration
            }

            fn index_cache() -> &'static $crate::__TypeIndexCell {
                static CACHE: $crate::__TypeIndexCell = $crate::__TypeIndexCell::new();
                &CACHE
            }
        }
    };
}
