// write_group.rs - Exclusion-set construction for write groups
//
// A type that declares "writes the same logical output as X" must be
// excluded from any query that targets X exclusively. The sets are built in
// two passes over a whole batch so they are complete before any descriptor
// is materialized: reserve provisional indices first, then walk the declared
// annotations and accumulate writer indices under each target's index.

use std::collections::{BTreeSet, HashMap};

use crate::declaration::TypeDeclaration;
use crate::error::RegistryError;
use crate::index::{IndexFlags, TypeIndex};

/// Per-target exclusion sets for one registration batch, keyed by the
/// target's provisional clean index.
#[derive(Debug)]
pub(crate) struct WriteGroupSets {
    by_target: HashMap<u32, BTreeSet<u32>>,
}

impl WriteGroupSets {
    /// Run both passes over `declarations`, whose first member will receive
    /// clean index `first_index`.
    pub fn collect(
        declarations: &[TypeDeclaration],
        first_index: u32,
    ) -> Result<Self, RegistryError> {
        // Pass 1: provisional indices, so annotations can resolve to indices
        // before any descriptor exists.
        let mut index_by_name: HashMap<&str, u32> = HashMap::with_capacity(declarations.len());
        for (offset, declaration) in declarations.iter().enumerate() {
            let provisional = first_index + offset as u32;
            if index_by_name
                .insert(declaration.qualified_name(), provisional)
                .is_some()
            {
                return Err(RegistryError::DuplicateType {
                    name: declaration.qualified_name().to_string(),
                });
            }
        }

        // Pass 2: collect edges. An annotation against a type outside the
        // batch is a configuration error, never silently dropped; a dropped
        // edge would let two systems write the same output unnoticed.
        let mut by_target: HashMap<u32, BTreeSet<u32>> = HashMap::new();
        for (offset, declaration) in declarations.iter().enumerate() {
            let writer = first_index + offset as u32;
            for target_name in declaration.write_group_targets() {
                if target_name == declaration.qualified_name() {
                    return Err(RegistryError::SelfWriteGroup {
                        name: declaration.qualified_name().to_string(),
                    });
                }
                let target = *index_by_name.get(target_name).ok_or_else(|| {
                    RegistryError::UnknownWriteGroupTarget {
                        name: declaration.qualified_name().to_string(),
                        target: target_name.to_string(),
                    }
                })?;
                by_target.entry(target).or_default().insert(writer);
            }
        }

        Ok(Self { by_target })
    }

    /// Materialize the exclusion set gathered under `clean_index`, sorted
    /// ascending. Targets with no writers get an empty slice, not an absent
    /// one. Entries are flag-free indices; writer flags are not yet known
    /// when the sets are built.
    pub fn take(&mut self, clean_index: u32) -> Box<[TypeIndex]> {
        match self.by_target.remove(&clean_index) {
            Some(writers) => writers
                .into_iter()
                .map(|writer| TypeIndex::encode(writer, IndexFlags::default()))
                .collect(),
            None => Box::new([]),
        }
    }
}
