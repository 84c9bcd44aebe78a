use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tessera_proto::{KeyMaterial, PrincipalId};

use super::{SessionKeyStore, StoreError, sorted_pair};

/// In-memory key store for testing and simulation
///
/// All state is wrapped in `Arc<Mutex<>>` so clones share one map, letting a
/// test hand a clone to a node and inspect the original afterwards.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<MemoryKeyStoreInner>>,
}

#[derive(Default)]
struct MemoryKeyStoreInner {
    /// Keys by sorted identity pair
    keys: HashMap<(PrincipalId, PrincipalId), KeyMaterial>,

    /// Number of successful `persist` calls
    writes: usize,
}

impl MemoryKeyStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct pairs with a stored key
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().map_err(|_| StoreError::Poisoned)?.keys.len())
    }

    /// True if no key has been stored
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Total number of `persist` calls, counting overwrites
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn write_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().map_err(|_| StoreError::Poisoned)?.writes)
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore").finish_non_exhaustive()
    }
}

impl SessionKeyStore for MemoryKeyStore {
    fn persist(
        &self,
        local: &PrincipalId,
        peer: &PrincipalId,
        key: &KeyMaterial,
    ) -> Result<(), StoreError> {
        let (first, second) = sorted_pair(local, peer);
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;

        inner.keys.insert((first.clone(), second.clone()), key.clone());
        inner.writes += 1;
        Ok(())
    }

    fn load(&self, a: &PrincipalId, b: &PrincipalId) -> Result<Option<KeyMaterial>, StoreError> {
        let (first, second) = sorted_pair(a, b);
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(inner.keys.get(&(first.clone(), second.clone())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> PrincipalId {
        PrincipalId::new(name).unwrap()
    }

    #[test]
    fn both_sides_resolve_to_one_entry() {
        let store = MemoryKeyStore::new();
        let key = KeyMaterial::new(vec![3; 32]);

        store.persist(&id("B"), &id("A"), &key).unwrap();

        assert_eq!(store.load(&id("A"), &id("B")).unwrap(), Some(key.clone()));
        assert_eq!(store.load(&id("B"), &id("A")).unwrap(), Some(key));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryKeyStore::new();
        let handle = store.clone();

        handle.persist(&id("A"), &id("C"), &KeyMaterial::new(vec![1; 16])).unwrap();

        assert_eq!(store.write_count().unwrap(), 1);
        assert!(store.load(&id("A"), &id("B")).unwrap().is_none());
    }
}
