//! Opaque blob storage for envelopes and vault records.
//!
//! Backends only ever see ciphertext. [`RegistryStore`] is the glue a calling
//! application uses to persist the sealed registry and the vault record.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::asymmetric::{AsymmetricWrap, RsaOaep};
use crate::crypto::{HybridDecryptor, HybridEncryptor};
use crate::errors::{Result, SealError};
use crate::kem::{KemPrimitive, MlKem1024};
use crate::types::{HybridEnvelope, PublicKeys, SecretKeys, VaultRecord};

/// Key/value store for opaque byte strings.
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One file per key under a root directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates `root` if it does not exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| SealError::Storage(e.to_string()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
        if !valid {
            return Err(SealError::Storage(format!("invalid blob key {key:?}")));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SealError::Storage(e.to_string())),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so readers never observe a torn blob. Each write
        // uses its own temp file and the last rename wins.
        let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        let written = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(SealError::Storage(e.to_string()));
        }
        Ok(())
    }
}

/// Persists sealed registry blobs and vault records in a [`BlobStore`].
pub struct RegistryStore<S, K = MlKem1024, A = RsaOaep> {
    store: S,
    encryptor: HybridEncryptor<K, A>,
    decryptor: HybridDecryptor<K, A>,
}

impl<S: BlobStore> RegistryStore<S, MlKem1024, RsaOaep> {
    pub fn new(store: S) -> Self {
        Self::with_primitives(store, MlKem1024, RsaOaep::default())
    }
}

impl<S: BlobStore, K: KemPrimitive + Clone, A: AsymmetricWrap + Clone> RegistryStore<S, K, A> {
    pub fn with_primitives(store: S, kem: K, wrap: A) -> Self {
        Self {
            store,
            encryptor: HybridEncryptor::new(kem.clone(), wrap.clone()),
            decryptor: HybridDecryptor::new(kem, wrap),
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Seal `plaintext` and store the envelope's wire string under `key`.
    pub fn save_registry(&self, key: &str, plaintext: &[u8], keys: &PublicKeys) -> Result<()> {
        let wire = self.encryptor.encrypt_for(plaintext, keys)?.to_wire()?;
        self.store.put(key, wire.as_bytes())?;
        debug!(key, envelope_len = wire.len(), "stored sealed registry");
        Ok(())
    }

    /// Fetch and open the registry stored under `key`.
    pub fn load_registry(&self, key: &str, keys: &SecretKeys) -> Result<Vec<u8>> {
        let raw = self.fetch(key)?;
        let wire = std::str::from_utf8(&raw).map_err(|_| SealError::DecryptionFailed)?;
        let envelope = HybridEnvelope::from_wire(wire)?;
        self.decryptor.decrypt_with(&envelope, keys)
    }

    pub fn save_vault_record(&self, key: &str, record: &VaultRecord) -> Result<()> {
        self.store.put(key, &record.to_bytes()?)
    }

    pub fn load_vault_record(&self, key: &str) -> Result<VaultRecord> {
        VaultRecord::from_bytes(&self.fetch(key)?)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.store
            .get(key)?
            .ok_or_else(|| SealError::NotFound(key.to_string()))
    }
}
