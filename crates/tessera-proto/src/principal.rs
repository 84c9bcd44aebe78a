//! Identities and key material carried inside records.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{ProtocolError, Result};

/// Name of a principal registered with the KDC (e.g. `"A"`).
///
/// Identities are restricted to ASCII letters, digits and `-`, at most
/// [`PrincipalId::MAX_LEN`] bytes. They end up in file names (the session key
/// store joins two sorted identities with `_`), so path separators, dots and
/// the separator itself are excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Maximum identity length in bytes
    pub const MAX_LEN: usize = 64;

    /// Validate and wrap an identity.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPrincipal`] if the identity is empty,
    /// too long, or contains characters outside `[A-Za-z0-9-]`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(ProtocolError::InvalidPrincipal("empty identity".to_string()));
        }

        if id.len() > Self::MAX_LEN {
            return Err(ProtocolError::InvalidPrincipal(format!(
                "identity is {} bytes, limit is {}",
                id.len(),
                Self::MAX_LEN
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(ProtocolError::InvalidPrincipal(format!(
                "identity {id:?} contains characters outside [A-Za-z0-9-]"
            )));
        }

        Ok(Self(id))
    }

    /// Decode an identity from a record field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPrincipal`] on invalid UTF-8 or any
    /// reason listed in [`PrincipalId::new`].
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        let id = std::str::from_utf8(bytes)
            .map_err(|_| ProtocolError::InvalidPrincipal("identity is not UTF-8".to_string()))?;
        Self::new(id)
    }

    /// Borrow the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Raw symmetric key bytes as they travel inside a sealed record.
///
/// # Security
///
/// - **Debug Redaction**: `Debug` prints only the length.
/// - **Zeroize**: bytes are wiped when the value is dropped.
/// - **Constant-Time Equality**: `PartialEq` uses `subtle`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no key bytes are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial(<redacted {} bytes>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        for name in ["A", "B", "alice", "node-7"] {
            assert_eq!(PrincipalId::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", "../etc", "a/b", "a_b", "a.b", "é"] {
            assert!(PrincipalId::new(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn rejects_long_names() {
        let name = "x".repeat(PrincipalId::MAX_LEN + 1);
        assert!(matches!(PrincipalId::new(name), Err(ProtocolError::InvalidPrincipal(_))));
    }

    #[test]
    fn key_material_debug_is_redacted() {
        let key = KeyMaterial::new(vec![0xAB; 32]);
        let debug = format!("{key:?}");

        assert!(debug.contains("32 bytes"));
        assert!(!debug.contains("171"));
    }
}
