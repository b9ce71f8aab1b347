// descriptor.rs - Immutable per-type metadata
//
// One TypeDescriptor exists per registered component type. It is fully
// constructed before the registry publishes it and never mutated afterwards.
// Block-layout rules (buffer header overhead, default capacity, alignment)
// all live here so storage and serialization agree on them.

use serde::{Deserialize, Serialize};

use crate::declaration::TypeDeclaration;
use crate::error::RegistryError;
use crate::index::{IndexFlags, TypeIndex};
use crate::stable_hash::{derive_memory_ordering, StableTypeHash};

/// Bytes reserved at the front of a buffer component's block slot for the
/// out-of-line pointer, length and capacity fields.
pub const BUFFER_HEADER_BYTES: usize = 16;

/// Element count a buffer component stores inline when its declaration does
/// not override the capacity. Derived from element size rather than cache
/// line size so the value is cross-platform deterministic.
const DEFAULT_BUFFER_CAPACITY_BYTES: usize = 128;

/// Storage classification of a registered type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCategory {
    /// Plain per-entity value stored inline in a block.
    PlainData,
    /// Variable-length inline array with a declared capacity.
    BufferData,
    /// Value shared by reference across many entities; occupies no block space.
    SharedData,
    /// The reserved entity-identity type at table index 1.
    EntityIdentity,
    /// Heap-managed reference component; occupies no block space.
    ManagedReference,
}

/// Immutable metadata for one registered component type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Encoded index: dense table slot plus classification flags.
    pub index: TypeIndex,
    /// Total bytes the type occupies in a storage block, including buffer
    /// header and inline capacity. 0 for tag, shared and managed types.
    pub size_in_block: usize,
    /// Size of one logical element; equals `size_in_block` for plain types.
    pub element_size: usize,
    /// Required byte alignment within a block.
    pub alignment: usize,
    /// Inline element capacity for buffers; -1 for everything else.
    pub buffer_capacity: i32,
    pub category: TypeCategory,
    /// Cross-run identity; see [`StableTypeHash`].
    pub stable_hash: StableTypeHash,
    /// Sort key for component ordering inside a block. 0 is reserved for
    /// entity identity.
    pub memory_ordering: u64,
    /// Byte offsets of embedded entity values, for remapping on clone.
    pub entity_offsets: Box<[u32]>,
    /// Indices of types declared to write the same logical output as this
    /// one; queries targeting this type exclusively must exclude them.
    pub write_groups: Box<[TypeIndex]>,
}

impl TypeDescriptor {
    /// Build the descriptor for a validated declaration at `clean_index`.
    ///
    /// `write_groups` is the exclusion set gathered for this type by the
    /// batch edge-collection pass; lazily registered types pass an empty set.
    pub(crate) fn build(
        clean_index: u32,
        declaration: &TypeDeclaration,
        write_groups: Box<[TypeIndex]>,
    ) -> Result<Self, RegistryError> {
        let stable_hash = StableTypeHash::of_name(declaration.qualified_name());
        let value_size = declaration.value_size();

        let (size_in_block, element_size, buffer_capacity) = match declaration.category() {
            TypeCategory::PlainData | TypeCategory::EntityIdentity => {
                (value_size, value_size, -1)
            }
            TypeCategory::BufferData => {
                if value_size == 0 {
                    return Err(RegistryError::ZeroSizedBufferElement {
                        name: declaration.qualified_name().to_string(),
                    });
                }
                let capacity = declaration
                    .buffer_capacity()
                    .unwrap_or(DEFAULT_BUFFER_CAPACITY_BYTES / value_size);
                // An oversized capacity override would overflow the block
                // size or truncate when narrowed to i32.
                let size_in_block = capacity
                    .checked_mul(value_size)
                    .and_then(|inline| inline.checked_add(BUFFER_HEADER_BYTES))
                    .filter(|&size| size <= i32::MAX as usize)
                    .ok_or_else(|| RegistryError::BufferCapacityTooLarge {
                        name: declaration.qualified_name().to_string(),
                        capacity,
                    })?;
                (size_in_block, value_size, capacity as i32)
            }
            // Not stored per-entity in a block.
            TypeCategory::SharedData | TypeCategory::ManagedReference => (0, 0, -1),
        };

        let memory_ordering = declaration
            .forced_memory_ordering()
            .unwrap_or_else(|| derive_memory_ordering(stable_hash));

        let entity_offsets: Box<[u32]> = declaration.entity_offsets().into();
        let flags = if clean_index == 0 {
            // The reserved "none" slot stays flag-free.
            IndexFlags::default()
        } else {
            IndexFlags {
                zero_sized: size_in_block == 0,
                buffer: declaration.category() == TypeCategory::BufferData,
                system_state: declaration.is_system_state(),
                shared: declaration.category() == TypeCategory::SharedData,
                chunk: false,
                no_entity_references: entity_offsets.is_empty(),
            }
        };

        Ok(Self {
            index: TypeIndex::encode(clean_index, flags),
            size_in_block,
            element_size,
            alignment: block_alignment(value_size),
            buffer_capacity,
            category: declaration.category(),
            stable_hash,
            memory_ordering,
            entity_offsets,
            write_groups,
        })
    }

    /// Descriptor for reserved slot 0: the absence marker.
    pub(crate) fn none() -> Self {
        Self {
            index: TypeIndex::NONE,
            size_in_block: 0,
            element_size: 0,
            alignment: 1,
            buffer_capacity: -1,
            category: TypeCategory::PlainData,
            stable_hash: StableTypeHash(0),
            memory_ordering: 0,
            entity_offsets: Box::new([]),
            write_groups: Box::new([]),
        }
    }

    /// Descriptor for reserved slot 1: the entity-identity type.
    pub(crate) fn entity_identity() -> Self {
        let size = std::mem::size_of::<crate::Entity>();
        Self {
            index: TypeIndex::encode(1, IndexFlags::default()),
            size_in_block: size,
            element_size: size,
            alignment: block_alignment(size),
            buffer_capacity: -1,
            category: TypeCategory::EntityIdentity,
            stable_hash: StableTypeHash::of_name(crate::Entity::QUALIFIED_NAME),
            // Entity identity always sorts first in a block.
            memory_ordering: 0,
            entity_offsets: crate::Entity::ENTITY_OFFSETS.into(),
            write_groups: Box::new([]),
        }
    }

    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.size_in_block == 0
    }

    #[inline]
    pub fn has_write_groups(&self) -> bool {
        !self.write_groups.is_empty()
    }
}

/// Alignment of a value within a storage block.
///
/// Deterministic across platforms: the value's own size when it is a small
/// power of two, else 16. Zero-sized types align to 1.
pub(crate) fn block_alignment(value_size: usize) -> usize {
    if value_size == 0 {
        1
    } else if value_size < 16 && value_size.is_power_of_two() {
        value_size
    } else {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::TypeDeclaration;

    #[derive(Clone, Copy)]
    struct Position {
        _x: f32,
        _y: f32,
        _z: f32,
    }

    #[derive(Clone, Copy)]
    struct Waypoint {
        _target: u64,
    }

    #[test]
    fn plain_data_layout() {
        let decl = TypeDeclaration::plain::<Position>("demo::Position");
        let descriptor = TypeDescriptor::build(2, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.size_in_block, 12);
        assert_eq!(descriptor.element_size, 12);
        assert_eq!(descriptor.buffer_capacity, -1);
        assert_eq!(descriptor.alignment, 16); // 12 is not a power of two
        assert_eq!(descriptor.index.index(), 2);
        assert!(!descriptor.index.is_zero_sized());
        assert!(!descriptor.index.has_entity_references());
    }

    #[test]
    fn zero_sized_tag_sets_flag() {
        struct Tag;
        let decl = TypeDeclaration::plain::<Tag>("demo::Tag");
        let descriptor = TypeDescriptor::build(3, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.size_in_block, 0);
        assert!(descriptor.is_zero_sized());
        assert!(descriptor.index.is_zero_sized());
        assert_eq!(descriptor.alignment, 1);
    }

    #[test]
    fn buffer_layout_includes_header_and_capacity() {
        let decl = TypeDeclaration::buffer::<Waypoint>("demo::Waypoints");
        let descriptor = TypeDescriptor::build(4, &decl, Box::new([])).unwrap();
        // Default capacity: 128 bytes worth of 8-byte elements.
        assert_eq!(descriptor.buffer_capacity, 16);
        assert_eq!(descriptor.element_size, 8);
        assert_eq!(descriptor.size_in_block, BUFFER_HEADER_BYTES + 16 * 8);
        assert!(descriptor.index.is_buffer());
        assert!(!descriptor.index.is_zero_sized());
    }

    #[test]
    fn buffer_capacity_override() {
        let decl =
            TypeDeclaration::buffer::<Waypoint>("demo::Waypoints").with_buffer_capacity(4);
        let descriptor = TypeDescriptor::build(4, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.buffer_capacity, 4);
        assert_eq!(descriptor.size_in_block, BUFFER_HEADER_BYTES + 4 * 8);
    }

    #[test]
    fn oversized_buffer_capacity_is_rejected() {
        // Overflows usize when multiplied by the element size.
        let decl = TypeDeclaration::buffer::<Waypoint>("demo::Waypoints")
            .with_buffer_capacity(usize::MAX / 2);
        let err = TypeDescriptor::build(4, &decl, Box::new([])).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::BufferCapacityTooLarge { capacity, .. } if capacity == usize::MAX / 2
        ));

        // No usize overflow, but the block size no longer fits an i32 and
        // the capacity would go negative when narrowed.
        let decl = TypeDeclaration::buffer::<Waypoint>("demo::Waypoints")
            .with_buffer_capacity(i32::MAX as usize);
        let err = TypeDescriptor::build(4, &decl, Box::new([])).unwrap_err();
        assert!(matches!(err, RegistryError::BufferCapacityTooLarge { .. }));
    }

    #[test]
    fn shared_data_occupies_no_block_space() {
        #[derive(Clone, Copy)]
        struct RenderMaterial {
            _id: u64,
        }
        let decl = TypeDeclaration::shared::<RenderMaterial>("demo::RenderMaterial");
        let descriptor = TypeDescriptor::build(5, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.size_in_block, 0);
        assert!(descriptor.index.is_shared());
        assert!(descriptor.index.is_zero_sized());
    }

    #[test]
    fn system_state_shared_sets_both_bits() {
        #[derive(Clone, Copy)]
        struct CleanupTicket {
            _owner: u64,
        }
        let decl = TypeDeclaration::shared::<CleanupTicket>("demo::CleanupTicket").system_state();
        let descriptor = TypeDescriptor::build(6, &decl, Box::new([])).unwrap();
        assert!(descriptor.index.is_system_state());
        assert!(descriptor.index.is_shared());
        assert!(descriptor.index.is_system_state_shared());
    }

    #[test]
    fn entity_offsets_clear_no_reference_flag() {
        let decl = TypeDeclaration::plain::<Waypoint>("demo::Follows").with_entity_offsets(&[0]);
        let descriptor = TypeDescriptor::build(7, &decl, Box::new([])).unwrap();
        assert!(descriptor.index.has_entity_references());
        assert_eq!(&*descriptor.entity_offsets, &[0]);
    }

    #[test]
    fn forced_memory_ordering_wins() {
        let decl =
            TypeDeclaration::plain::<Position>("demo::Position").with_memory_ordering(42);
        let descriptor = TypeDescriptor::build(2, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.memory_ordering, 42);
    }

    #[test]
    fn memory_ordering_defaults_to_stable_hash() {
        let decl = TypeDeclaration::plain::<Position>("demo::Position");
        let descriptor = TypeDescriptor::build(2, &decl, Box::new([])).unwrap();
        assert_eq!(descriptor.memory_ordering, descriptor.stable_hash.0);
    }

    #[test]
    fn zero_sized_buffer_element_is_rejected() {
        struct Empty;
        let decl = TypeDeclaration::buffer::<Empty>("demo::Broken");
        let err = TypeDescriptor::build(2, &decl, Box::new([])).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::ZeroSizedBufferElement { .. }
        ));
    }

    #[test]
    fn reserved_slots_have_expected_shape() {
        let none = TypeDescriptor::none();
        assert_eq!(none.index.index(), 0);
        assert!(!none.index.is_zero_sized()); // slot 0 carries no flags
        assert_eq!(none.stable_hash, StableTypeHash(0));

        let entity = TypeDescriptor::entity_identity();
        assert_eq!(entity.index.index(), 1);
        assert_eq!(entity.size_in_block, 8);
        assert_eq!(entity.alignment, 8);
        assert_eq!(entity.memory_ordering, 0);
        assert!(entity.index.has_entity_references());
        assert_eq!(entity.category, TypeCategory::EntityIdentity);
    }

    #[test]
    fn block_alignment_rules() {
        assert_eq!(block_alignment(0), 1);
        assert_eq!(block_alignment(1), 1);
        assert_eq!(block_alignment(4), 4);
        assert_eq!(block_alignment(8), 8);
        assert_eq!(block_alignment(12), 16);
        assert_eq!(block_alignment(16), 16);
        assert_eq!(block_alignment(64), 16);
    }
}
