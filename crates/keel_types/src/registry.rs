// registry.rs - Process-wide component type registry
//
// Array-backed table of type descriptors with two reserved slots: 0 is the
// "none" marker, 1 is entity identity. The bulk startup batch goes through
// the write-group builder before any slot is finalized; types first touched
// at runtime take the double-checked lazy path. Descriptors are published
// as Arcs, fully constructed before they become visible to any reader.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::declaration::{ComponentData, TypeDeclaration};
use crate::descriptor::TypeDescriptor;
use crate::error::RegistryError;
use crate::index::TypeIndex;
use crate::stable_hash::StableTypeHash;
use crate::write_group::WriteGroupSets;

/// Hard ceiling on registered types. Indices are dense and never reused, so
/// exceeding this is a build-time sizing mistake, not a runtime condition.
pub const MAX_TYPE_COUNT: usize = 10 * 1024;

struct Tables {
    descriptors: Vec<Arc<TypeDescriptor>>,
    index_by_hash: HashMap<u64, TypeIndex>,
    index_by_name: HashMap<String, TypeIndex>,
}

impl Tables {
    fn insert(&mut self, name: &str, descriptor: TypeDescriptor) -> TypeIndex {
        let index = descriptor.index;
        debug_assert_eq!(index.index(), self.descriptors.len(), "table slot skipped");
        self.index_by_hash.insert(descriptor.stable_hash.0, index);
        self.index_by_name.insert(name.to_string(), index);
        self.descriptors.push(Arc::new(descriptor));
        index
    }
}

/// The component-type registry.
///
/// One process-wide instance lives behind [`registry`]; constructing private
/// instances is supported for tools and tests. Reads after initialization
/// never block writers on the typed fast path (see [`type_index_of`]).
pub struct TypeRegistry {
    tables: RwLock<Tables>,
}

impl TypeRegistry {
    /// Create a registry seeded with the two reserved slots.
    pub fn new() -> Self {
        let none = TypeDescriptor::none();
        let entity = TypeDescriptor::entity_identity();

        let mut tables = Tables {
            descriptors: Vec::new(),
            index_by_hash: HashMap::new(),
            index_by_name: HashMap::new(),
        };
        tables.index_by_hash.insert(none.stable_hash.0, none.index);
        tables.descriptors.push(Arc::new(none));
        tables.insert(crate::Entity::QUALIFIED_NAME, entity);

        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Register a startup batch of candidate types.
    ///
    /// Write-group exclusion sets are gathered across the whole batch before
    /// any descriptor is materialized, so annotations may reference any
    /// member regardless of input order. On error, none of the batch's types
    /// are registered.
    pub fn register_batch(&self, declarations: &[TypeDeclaration]) -> Result<(), RegistryError> {
        for declaration in declarations {
            declaration.validate()?;
        }

        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());

        let first_index = tables.descriptors.len();
        let requested = first_index + declarations.len();
        if requested > MAX_TYPE_COUNT {
            return Err(RegistryError::CapacityExceeded { requested });
        }

        // Reject duplicates (against the table and within the batch) before
        // touching any slot. Name collisions and hash collisions are both
        // fatal; a hash collision would corrupt the stable-hash side table.
        let mut batch_hashes = HashSet::with_capacity(declarations.len());
        for declaration in declarations {
            let name = declaration.qualified_name();
            let hash = StableTypeHash::of_name(name);
            if tables.index_by_name.contains_key(name)
                || tables.index_by_hash.contains_key(&hash.0)
                || !batch_hashes.insert(hash.0)
            {
                return Err(RegistryError::DuplicateType {
                    name: name.to_string(),
                });
            }
        }

        let mut write_groups = WriteGroupSets::collect(declarations, first_index as u32)?;

        // Materialize every descriptor before publishing any of them.
        let mut built = Vec::with_capacity(declarations.len());
        for (offset, declaration) in declarations.iter().enumerate() {
            let clean = (first_index + offset) as u32;
            built.push(TypeDescriptor::build(
                clean,
                declaration,
                write_groups.take(clean),
            )?);
        }

        for (declaration, descriptor) in declarations.iter().zip(built) {
            tables.insert(declaration.qualified_name(), descriptor);
        }

        info!(
            batch = declarations.len(),
            registered = tables.descriptors.len(),
            "component type batch registered"
        );
        Ok(())
    }

    /// Resolve a type's index, registering it if this is the first use.
    ///
    /// Double-checked: a shared-lock lookup first, then the write lock with
    /// a re-check, so concurrent first-use from many threads creates exactly
    /// one descriptor. Declarations carrying write-group
    /// annotations must go through [`Self::register_batch`]; exclusion sets
    /// are final once a batch's descriptors are published.
    pub fn get_or_register(
        &self,
        declaration: &TypeDeclaration,
    ) -> Result<TypeIndex, RegistryError> {
        // Fast path, shared lock only.
        if let Some(index) = self.index_of_name(declaration.qualified_name()) {
            return Ok(index);
        }

        declaration.validate()?;
        if declaration.has_write_group_targets() {
            return Err(RegistryError::LateWriteGroup {
                name: declaration.qualified_name().to_string(),
            });
        }

        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());

        // Another thread may have won the race while we acquired the lock.
        if let Some(index) = tables.index_by_name.get(declaration.qualified_name()) {
            return Ok(*index);
        }

        let clean = tables.descriptors.len();
        if clean >= MAX_TYPE_COUNT {
            return Err(RegistryError::CapacityExceeded {
                requested: clean + 1,
            });
        }

        let descriptor = TypeDescriptor::build(clean as u32, declaration, Box::new([]))?;
        if tables.index_by_hash.contains_key(&descriptor.stable_hash.0) {
            return Err(RegistryError::DuplicateType {
                name: declaration.qualified_name().to_string(),
            });
        }

        let index = tables.insert(declaration.qualified_name(), descriptor);
        debug!(
            name = declaration.qualified_name(),
            index = index.index(),
            "component type registered lazily"
        );
        Ok(index)
    }

    /// Look up the descriptor for an encoded index.
    ///
    /// Panics when the clean index is out of range: an index that did not
    /// come from this registry is a caller bug, not a recoverable condition.
    pub fn descriptor(&self, index: TypeIndex) -> Arc<TypeDescriptor> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let clean = index.index();
        match tables.descriptors.get(clean) {
            Some(descriptor) => Arc::clone(descriptor),
            None => panic!(
                "type index {clean} is out of range ({} types registered); \
                 was it produced by a different registry?",
                tables.descriptors.len()
            ),
        }
    }

    /// Resolve a stable hash recorded by an earlier (possibly different)
    /// process run. A miss is recoverable: the serialization layer decides
    /// how to treat types that no longer exist in this build.
    pub fn index_for_stable_hash(&self, hash: StableTypeHash) -> Option<TypeIndex> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.index_by_hash.get(&hash.0).copied()
    }

    /// Resolve a fully-qualified name to its index.
    pub fn index_of_name(&self, name: &str) -> Option<TypeIndex> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.index_by_name.get(name).copied()
    }

    /// Number of registered descriptors, including the two reserved slots.
    pub fn count(&self) -> usize {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.descriptors.len()
    }

    /// The exclusion set for queries targeting `index` exclusively. Empty
    /// for types with no declared writers.
    pub fn write_group_types(&self, index: TypeIndex) -> Box<[TypeIndex]> {
        self.descriptor(index).write_groups.clone()
    }

    /// Snapshot of all registered descriptors in index order.
    pub fn descriptors(&self) -> Vec<Arc<TypeDescriptor>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.descriptors.clone()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// The process-wide registry. Initialized on first touch; lives until exit.
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

/// Register the startup candidate list with the process-wide registry.
pub fn initialize_types(declarations: &[TypeDeclaration]) -> Result<(), RegistryError> {
    REGISTRY.register_batch(declarations)
}

/// Resolve `T`'s index against the process-wide registry.
///
/// The first call per type registers (or finds) the descriptor and fills
/// `T`'s cache slot; every call after that is a single atomic load with no
/// lock taken.
pub fn try_type_index_of<T: ComponentData>() -> Result<TypeIndex, RegistryError> {
    T::index_cache()
        .get_or_try_init(|| REGISTRY.get_or_register(&T::declaration()))
        .copied()
}

/// Panicking variant of [`try_type_index_of`] for the hot path. A failure
/// here is a malformed declaration, which is fatal by design.
pub fn type_index_of<T: ComponentData>() -> TypeIndex {
    match try_type_index_of::<T>() {
        Ok(index) => index,
        Err(err) => panic!(
            "failed to register component type '{}': {err}",
            T::QUALIFIED_NAME
        ),
    }
}
