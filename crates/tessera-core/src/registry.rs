//! Long-term keys shared between the KDC and each principal.
//!
//! The registry is built once at startup and never mutated. It is passed
//! explicitly (usually behind an `Arc`) to every component that needs it;
//! there is no global table.

use std::collections::HashMap;

use tessera_proto::{KeyMaterial, PrincipalId};
use thiserror::Error;

use crate::crypto::validate_key_len;

/// Errors raised while building a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same identity appears twice
    #[error("duplicate principal: {0}")]
    Duplicate(PrincipalId),

    /// A long-term key has an unsupported length
    #[error("principal {id} has a {len}-byte key (expected 16, 24 or 32)")]
    InvalidKeyLength {
        /// Offending principal
        id: PrincipalId,
        /// Length of its key
        len: usize,
    },
}

/// Immutable identity → long-term key table.
///
/// Entries keep their insertion order; a principal's position is used to
/// derive its default listening port.
#[derive(Debug, Clone, Default)]
pub struct PrincipalRegistry {
    entries: Vec<(PrincipalId, KeyMaterial)>,
    index: HashMap<PrincipalId, usize>,
}

impl PrincipalRegistry {
    /// Build a registry from `(identity, key)` pairs.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Duplicate`] if an identity repeats
    /// - [`RegistryError::InvalidKeyLength`] if a key is not 16, 24 or 32
    ///   bytes
    pub fn new(
        entries: impl IntoIterator<Item = (PrincipalId, KeyMaterial)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        for (id, key) in entries {
            if validate_key_len(key.as_bytes()).is_err() {
                return Err(RegistryError::InvalidKeyLength { id, len: key.len() });
            }
            if registry.index.contains_key(&id) {
                return Err(RegistryError::Duplicate(id));
            }

            registry.index.insert(id.clone(), registry.entries.len());
            registry.entries.push((id, key));
        }

        Ok(registry)
    }

    /// Long-term key of `id`
    #[must_use]
    pub fn key(&self, id: &PrincipalId) -> Option<&KeyMaterial> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }

    /// True if `id` is registered
    #[must_use]
    pub fn contains(&self, id: &PrincipalId) -> bool {
        self.index.contains_key(id)
    }

    /// Zero-based registration order of `id`
    #[must_use]
    pub fn position(&self, id: &PrincipalId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Registered identities in registration order
    pub fn principals(&self) -> impl Iterator<Item = &PrincipalId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Number of registered principals
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no principal is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
