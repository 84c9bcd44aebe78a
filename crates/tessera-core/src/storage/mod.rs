//! Persistence of established session keys.
//!
//! The core calls [`SessionKeyStore::persist`] exactly once per successful
//! run, after mutual authentication, and never for a failed one. Both
//! principals of a pair resolve to the same entry: the pair is normalized by
//! sorting the two identities.

mod memory;

pub use memory::MemoryKeyStore;
use tessera_proto::{KeyMaterial, PrincipalId};
use thiserror::Error;

/// Errors from a session key store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Store lock was poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}

/// Sink for keys agreed by completed runs.
///
/// Implementations must be safe to share between the listener and the
/// command loop of one principal.
pub trait SessionKeyStore: Send + Sync {
    /// Persist `key` for the unordered pair (`local`, `peer`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the key could not be written.
    fn persist(
        &self,
        local: &PrincipalId,
        peer: &PrincipalId,
        key: &KeyMaterial,
    ) -> Result<(), StoreError>;

    /// Load the key stored for the unordered pair (`a`, `b`), if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be read.
    fn load(&self, a: &PrincipalId, b: &PrincipalId) -> Result<Option<KeyMaterial>, StoreError>;
}

/// Order a pair of identities so both principals name it the same way.
#[must_use]
pub fn sorted_pair<'a>(
    a: &'a PrincipalId,
    b: &'a PrincipalId,
) -> (&'a PrincipalId, &'a PrincipalId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let a = PrincipalId::new("A").unwrap();
        let b = PrincipalId::new("B").unwrap();

        assert_eq!(sorted_pair(&a, &b), sorted_pair(&b, &a));
        assert_eq!(sorted_pair(&b, &a).0.as_str(), "A");
    }
}
