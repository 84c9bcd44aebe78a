//! Established sessions of one principal, keyed by peer.
//!
//! The listener (responder runs) and the command loop (initiator runs) both
//! record into the same table, possibly at the same moment, so all access
//! goes through a single mutex.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tessera_proto::{KeyMaterial, PrincipalId};

/// Shared peer → session key map.
///
/// Cloning is cheap and every clone sees the same map.
#[derive(Clone, Default)]
pub struct SessionTable {
    inner: Arc<Mutex<HashMap<PrincipalId, KeyMaterial>>>,
}

impl SessionTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the key agreed with `peer`, replacing any earlier one.
    ///
    /// Returns true if an earlier session with `peer` was replaced.
    pub fn insert(&self, peer: PrincipalId, key: KeyMaterial) -> bool {
        self.lock().insert(peer, key).is_some()
    }

    /// Key agreed with `peer`, if any
    #[must_use]
    pub fn get(&self, peer: &PrincipalId) -> Option<KeyMaterial> {
        self.lock().get(peer).cloned()
    }

    /// Peers with an established session, sorted
    #[must_use]
    pub fn peers(&self) -> Vec<PrincipalId> {
        let mut peers: Vec<_> = self.lock().keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Number of established sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no session is established
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are whole key values, so a writer that panicked mid-insert
    // cannot leave a half-written entry behind.
    fn lock(&self) -> MutexGuard<'_, HashMap<PrincipalId, KeyMaterial>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTable").field("peers", &self.peers()).finish()
    }
}
