// entity.rs - Entity handle with generational index
//
// Entities are lightweight 8-byte handles. The generation counter prevents
// use-after-free bugs when a slot is recycled. The registry reserves table
// index 1 for this type so every storage block leads with entity identity.

use serde::{Deserialize, Serialize};

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in entity metadata array
/// - Generation: Incremented on entity destruction (prevents use-after-free)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Fully-qualified name registered for the entity-identity type.
    pub const QUALIFIED_NAME: &'static str = "keel_types::Entity";

    /// Byte offsets of embedded entity values within this type's layout.
    /// The handle is itself an entity value, so the table is `[0]`.
    pub const ENTITY_OFFSETS: &'static [u32] = &[0];

    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}
