// stable_hash.rs - Cross-run stable type identity
//
// Registry table indices are only stable within one build. Serialized data
// instead records this hash of the type's fully-qualified name, which two
// processes compute identically regardless of registration order.

use serde::{Deserialize, Serialize};

const FNV1A_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV1A_PRIME: u64 = 1_099_511_628_211;

/// 64-bit FNV-1a hash of a component type's fully-qualified name.
///
/// Each UTF-16 code unit of the name is folded as two bytes, low byte first.
/// Wire compatibility note: the folding must stay byte-for-byte identical
/// across releases, or persisted data loses its type identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableTypeHash(pub u64);

impl StableTypeHash {
    /// Hash a fully-qualified type name. Pure and total.
    pub fn of_name(qualified_name: &str) -> Self {
        let mut hash = FNV1A_OFFSET_BASIS;
        for unit in qualified_name.encode_utf16() {
            hash = (hash ^ u64::from(unit & 0xFF)).wrapping_mul(FNV1A_PRIME);
            hash = (hash ^ u64::from(unit >> 8)).wrapping_mul(FNV1A_PRIME);
        }
        Self(hash)
    }
}

/// Derive a type's memory-ordering key from its stable hash.
///
/// Ordering 0 is reserved for the entity-identity type so it always sorts
/// first in a storage block; a hash that lands on 0 is forced to 1.
pub(crate) fn derive_memory_ordering(hash: StableTypeHash) -> u64 {
    if hash.0 != 0 {
        hash.0
    } else {
        1
    }
}
