//! Private key vault: both private keys sealed under the out-of-band master key.
//!
//! The master key is already a pre-shared symmetric secret, so this is a
//! single AES-256-GCM seal over a CBOR bundle of the two keys, with a fresh
//! nonce per wrap.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::errors::{Result, SealError};
use crate::secret::SecretVec;
use crate::symmetric;
use crate::types::{
    from_cbor, to_cbor, MasterKey, PrivateKeyBundle, SecretKeys, VaultRecord, NONCE_LEN, TAG_LEN,
};

/// Seals and unseals [`SecretKeys`] under a [`MasterKey`].
pub struct PrivateKeyVault;

impl PrivateKeyVault {
    pub fn wrap(
        master: &MasterKey,
        kem_secret_key: &[u8],
        asymmetric_private_key: &[u8],
    ) -> Result<VaultRecord> {
        let bundle = PrivateKeyBundle {
            v: PrivateKeyBundle::CURRENT_VERSION,
            kem_secret_key: kem_secret_key.to_vec(),
            asymmetric_private_key: asymmetric_private_key.to_vec(),
        };
        let mut plaintext = to_cbor(&bundle)?;
        drop(bundle);

        let nonce = symmetric::generate_nonce();
        let sealed = symmetric::seal(master.as_bytes(), &nonce, &plaintext);
        plaintext.zeroize();
        let (payload, auth_tag) = sealed?;

        debug!(payload_len = payload.len(), "sealed private keys into vault record");
        Ok(VaultRecord {
            nonce,
            auth_tag,
            payload,
        })
    }

    /// Convenience wrapper over [`Self::wrap`].
    pub fn wrap_keys(master: &MasterKey, keys: &SecretKeys) -> Result<VaultRecord> {
        Self::wrap(
            master,
            keys.kem_secret_key.as_bytes(),
            keys.asymmetric_private_key.as_bytes(),
        )
    }

    /// Any failure is `VaultUnlock`, with no further detail.
    pub fn unwrap(master: &MasterKey, record: &VaultRecord) -> Result<SecretKeys> {
        Self::open(master, record).map_err(|_| {
            warn!("vault record rejected");
            SealError::VaultUnlock
        })
    }

    fn open(master: &MasterKey, record: &VaultRecord) -> Result<SecretKeys> {
        let mut plaintext = symmetric::open(
            master.as_bytes(),
            &record.nonce,
            &record.payload,
            &record.auth_tag,
        )?;
        let decoded: Result<PrivateKeyBundle> = from_cbor(&plaintext);
        plaintext.zeroize();
        let mut bundle = decoded?;

        if bundle.v != PrivateKeyBundle::CURRENT_VERSION {
            return Err(SealError::VaultUnlock);
        }
        Ok(SecretKeys {
            kem_secret_key: SecretVec::new(std::mem::take(&mut bundle.kem_secret_key)),
            asymmetric_private_key: SecretVec::new(std::mem::take(
                &mut bundle.asymmetric_private_key,
            )),
        })
    }
}

/// Persisted JSON layout: `{ "nonce": hex, "authTag": hex, "payload": hex }`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct VaultRecordJson {
    nonce: String,
    auth_tag: String,
    payload: String,
}

impl VaultRecord {
    pub fn to_json(&self) -> Result<String> {
        let json = VaultRecordJson {
            nonce: hex::encode(self.nonce),
            auth_tag: hex::encode(self.auth_tag),
            payload: hex::encode(&self.payload),
        };
        serde_json::to_string(&json).map_err(|e| SealError::Encoding(e.to_string()))
    }

    /// Parse the JSON form. Structural problems are `VaultUnlock`, the same as
    /// a tampered record.
    pub fn from_json(s: &str) -> Result<Self> {
        let json: VaultRecordJson =
            serde_json::from_str(s).map_err(|_| SealError::VaultUnlock)?;
        let nonce: [u8; NONCE_LEN] = hex::decode(&json.nonce)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or(SealError::VaultUnlock)?;
        let auth_tag: [u8; TAG_LEN] = hex::decode(&json.auth_tag)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or(SealError::VaultUnlock)?;
        let payload = hex::decode(&json.payload).map_err(|_| SealError::VaultUnlock)?;
        Ok(Self {
            nonce,
            auth_tag,
            payload,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_json().map(String::into_bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(bytes).map_err(|_| SealError::VaultUnlock)?;
        Self::from_json(s)
    }
}
