//! One-shot provisioning of all key material for a key epoch.
//!
//! A [`KeyManager`] moves from `Uninitialized` to `Initialized` exactly once.
//! Generating again would produce unrelated keys and orphan every envelope
//! sealed so far, so a second `generate` on the same manager is refused; a new
//! epoch is a new manager. Envelopes from earlier epochs are not re-encrypted.

use std::sync::{Mutex, PoisonError};

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::asymmetric::{AsymmetricWrap, RsaOaep};
use crate::config::KeyGenConfig;
use crate::crypto::{HybridDecryptor, HybridEncryptor};
use crate::errors::{Result, SealError};
use crate::kem::{KemPrimitive, MlKem1024};
use crate::types::{MasterKey, PublicKeys, SecretKeys, VaultRecord};
use crate::vault::PrivateKeyVault;

/// Identifies one `generate` run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEpoch {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
}

impl KeyEpoch {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Everything `generate` hands back for distribution.
///
/// `public_keys` go to every encrypting process; `vault_record` and
/// `master_key` go through separate channels and must not be stored together.
#[derive(Debug)]
pub struct Provisioned {
    pub epoch: KeyEpoch,
    pub public_keys: PublicKeys,
    pub vault_record: VaultRecord,
    pub master_key: MasterKey,
}

#[derive(Clone, Debug)]
struct Initialized {
    epoch: KeyEpoch,
    public_keys: PublicKeys,
    vault_record: VaultRecord,
}

#[derive(Debug)]
enum KeyState {
    Uninitialized,
    Initialized(Initialized),
}

pub struct KeyManager<K = MlKem1024, A = RsaOaep> {
    kem: K,
    wrap: A,
    state: Mutex<KeyState>,
}

impl KeyManager<MlKem1024, RsaOaep> {
    pub fn new(config: &KeyGenConfig) -> Self {
        Self::with_primitives(MlKem1024, RsaOaep::new(config.rsa_bits))
    }
}

impl Default for KeyManager<MlKem1024, RsaOaep> {
    fn default() -> Self {
        Self::new(&KeyGenConfig::default())
    }
}

impl<K: KemPrimitive + Clone, A: AsymmetricWrap + Clone> KeyManager<K, A> {
    pub fn with_primitives(kem: K, wrap: A) -> Self {
        Self {
            kem,
            wrap,
            state: Mutex::new(KeyState::Uninitialized),
        }
    }

    /// Generate a KEM key pair, an asymmetric key pair and (unless supplied)
    /// a master key, then seal both private keys into a vault record.
    ///
    /// Concurrent callers are serialized; only the first succeeds. Any
    /// primitive failure aborts provisioning and leaves the manager
    /// uninitialized.
    pub fn generate(&self, master: Option<MasterKey>) -> Result<Provisioned> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, KeyState::Initialized(_)) {
            return Err(SealError::AlreadyInitialized);
        }

        let kem_pair = self.kem.generate()?;
        let asym_pair = self.wrap.generate()?;
        let master_key = master.unwrap_or_else(MasterKey::generate);

        let vault_record = PrivateKeyVault::wrap(
            &master_key,
            kem_pair.secret_key.as_bytes(),
            asym_pair.private_key.as_bytes(),
        )?;

        let epoch = KeyEpoch::new();
        let public_keys = PublicKeys {
            kem_public_key: kem_pair.public_key.clone(),
            asymmetric_public_key: asym_pair.public_key.clone(),
        };

        *state = KeyState::Initialized(Initialized {
            epoch,
            public_keys: public_keys.clone(),
            vault_record: vault_record.clone(),
        });

        info!(
            epoch = %epoch.id,
            kem = self.kem.name(),
            wrap = self.wrap.name(),
            "generated key material"
        );

        Ok(Provisioned {
            epoch,
            public_keys,
            vault_record,
            master_key,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized().is_ok()
    }

    pub fn epoch(&self) -> Result<KeyEpoch> {
        self.initialized().map(|s| s.epoch)
    }

    pub fn public_keys(&self) -> Result<PublicKeys> {
        self.initialized().map(|s| s.public_keys)
    }

    pub fn vault_record(&self) -> Result<VaultRecord> {
        self.initialized().map(|s| s.vault_record)
    }

    /// Unseal this epoch's private keys.
    pub fn unlock(&self, master: &MasterKey) -> Result<SecretKeys> {
        let record = self.vault_record()?;
        PrivateKeyVault::unwrap(master, &record)
    }

    pub fn encryptor(&self) -> HybridEncryptor<K, A> {
        HybridEncryptor::new(self.kem.clone(), self.wrap.clone())
    }

    pub fn decryptor(&self) -> HybridDecryptor<K, A> {
        HybridDecryptor::new(self.kem.clone(), self.wrap.clone())
    }

    fn initialized(&self) -> Result<Initialized> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            KeyState::Initialized(s) => Ok(s.clone()),
            KeyState::Uninitialized => Err(SealError::NotInitialized),
        }
    }
}
