// index.rs - Encoded component type index
//
// A TypeIndex packs six classification flags into the high bits of a u32.
// The low 24 bits hold the dense registry table index. Consumers test flags
// through named methods; raw bit positions never leave this module.

use serde::{Deserialize, Serialize};

// Inverted so the entity-identity type can keep index 1 flag-free: entities
// reference themselves, so the flag stays clear on the reserved slot.
const HAS_NO_ENTITY_REFERENCES_FLAG: u32 = 1 << 25;
const BUFFER_COMPONENT_FLAG: u32 = 1 << 26;
const SYSTEM_STATE_FLAG: u32 = 1 << 27;
const SHARED_COMPONENT_FLAG: u32 = 1 << 28;
const CHUNK_COMPONENT_FLAG: u32 = 1 << 29;
const ZERO_SIZED_FLAG: u32 = 1 << 30;

const CLEAR_FLAGS_MASK: u32 = 0x00FF_FFFF;

/// Classification flags carried in the high bits of a [`TypeIndex`].
///
/// "System-state shared" is not a seventh flag; it is the composite of the
/// system-state and shared bits and is tested as both bits set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexFlags {
    pub zero_sized: bool,
    pub buffer: bool,
    pub system_state: bool,
    pub shared: bool,
    pub chunk: bool,
    pub no_entity_references: bool,
}

/// A registered component type's handle: dense table index plus
/// classification bits.
///
/// Format: [7-bit flags | 24-bit clean index] (bit 31 unused so the encoded
/// value stays valid as an i32 where callers need signed storage).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeIndex(u32);

impl TypeIndex {
    /// Reserved slot 0: "no type". Carries no flags.
    pub const NONE: TypeIndex = TypeIndex(0);

    /// Encode a clean table index with its classification flags.
    pub(crate) fn encode(clean: u32, flags: IndexFlags) -> Self {
        debug_assert!(
            clean <= CLEAR_FLAGS_MASK,
            "clean index {clean} exceeds the 24-bit index mask"
        );
        let mut bits = clean;
        if flags.zero_sized {
            bits |= ZERO_SIZED_FLAG;
        }
        if flags.buffer {
            bits |= BUFFER_COMPONENT_FLAG;
        }
        if flags.system_state {
            bits |= SYSTEM_STATE_FLAG;
        }
        if flags.shared {
            bits |= SHARED_COMPONENT_FLAG;
        }
        if flags.chunk {
            bits |= CHUNK_COMPONENT_FLAG;
        }
        if flags.no_entity_references {
            bits |= HAS_NO_ENTITY_REFERENCES_FLAG;
        }
        Self(bits)
    }

    /// The clean table index with all flag bits masked off.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 & CLEAR_FLAGS_MASK) as usize
    }

    #[inline]
    pub fn is_buffer(self) -> bool {
        self.0 & BUFFER_COMPONENT_FLAG != 0
    }

    #[inline]
    pub fn is_system_state(self) -> bool {
        self.0 & SYSTEM_STATE_FLAG != 0
    }

    /// Both the system-state and shared bits set.
    #[inline]
    pub fn is_system_state_shared(self) -> bool {
        let composite = SYSTEM_STATE_FLAG | SHARED_COMPONENT_FLAG;
        self.0 & composite == composite
    }

    #[inline]
    pub fn is_shared(self) -> bool {
        self.0 & SHARED_COMPONENT_FLAG != 0
    }

    #[inline]
    pub fn is_chunk_component(self) -> bool {
        self.0 & CHUNK_COMPONENT_FLAG != 0
    }

    #[inline]
    pub fn is_zero_sized(self) -> bool {
        self.0 & ZERO_SIZED_FLAG != 0
    }

    #[inline]
    pub fn has_entity_references(self) -> bool {
        self.0 & HAS_NO_ENTITY_REFERENCES_FLAG == 0
    }

    /// Derive the chunk-component variant of this index.
    ///
    /// The query layer uses this to target per-block metadata components
    /// without knowing bit positions.
    #[inline]
    pub fn as_chunk_component(self) -> Self {
        Self(self.0 | CHUNK_COMPONENT_FLAG)
    }

    /// Clear the chunk-component bit, recovering the ordinary variant.
    #[inline]
    pub fn without_chunk_flag(self) -> Self {
        Self(self.0 & !CHUNK_COMPONENT_FLAG)
    }

    /// Serialize to the raw 32-bit representation (for networking/save files).
    #[inline]
    pub fn to_bits(self) -> u32 {
        self.0
    }

    /// Deserialize from the raw 32-bit representation.
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}
