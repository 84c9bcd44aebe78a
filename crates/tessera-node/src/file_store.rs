//! File-backed session key store.
//!
//! Each pair gets one file, `<key_dir>/<min>_<max>.key`, holding the raw
//! session key bytes. Both principals of a pair write the same file; the
//! last completed run wins. Each write goes through its own temporary file in
//! the same directory, so concurrent writers never see a partial key.

use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tessera_core::{SessionKeyStore, StoreError, storage::sorted_pair};
use tessera_proto::{KeyMaterial, PrincipalId};

/// [`SessionKeyStore`] writing one file per principal pair.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the key files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the key of the unordered pair (`a`, `b`).
    #[must_use]
    pub fn path_for(&self, a: &PrincipalId, b: &PrincipalId) -> PathBuf {
        let (low, high) = sorted_pair(a, b);
        self.dir.join(format!("{low}_{high}.key"))
    }

    fn write(&self, path: &Path, key: &KeyMaterial) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(key.as_bytes())?;
        tmp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl SessionKeyStore for FileKeyStore {
    fn persist(
        &self,
        local: &PrincipalId,
        peer: &PrincipalId,
        key: &KeyMaterial,
    ) -> Result<(), StoreError> {
        let path = self.path_for(local, peer);
        self.write(&path, key)
            .map_err(|err| StoreError::Io(format!("{}: {err}", path.display())))?;

        tracing::info!(path = %path.display(), "session key saved");
        Ok(())
    }

    fn load(&self, a: &PrincipalId, b: &PrincipalId) -> Result<Option<KeyMaterial>, StoreError> {
        let path = self.path_for(a, b);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(KeyMaterial::new(bytes))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(format!("{}: {err}", path.display()))),
        }
    }
}
