//! Key material, envelope and vault types, plus serialization helpers.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, SealError};
use crate::secret::{SecretBytes32, SecretVec};

/// Envelope version tag for the current generation.
pub const ENVELOPE_VERSION_V2: &str = "v2";

/// Algorithm suite sealed under [`ENVELOPE_VERSION_V2`]:
/// - ML-KEM-1024 for the post-quantum share of the DEK
/// - RSA-OAEP (SHA-256) for the classical wrap of the masked DEK
/// - AES-256-GCM for the payload
pub const SUITE_V2: &str = "MlKem1024+RsaOaepSha256+Aes256Gcm";

/// Symmetric key length (DEK, master key, KEM shared secret).
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Post-quantum KEM key pair.
///
/// The public half is freely distributable. The secret half belongs to
/// whichever component holds decrypt responsibility.
#[derive(Clone, Debug)]
pub struct KemKeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: SecretVec,
}

/// Classical asymmetric key pair. Public key is SPKI (DER or PEM), private
/// key is PKCS#8 (DER or PEM).
#[derive(Clone, Debug)]
pub struct AsymmetricKeyPair {
    pub public_key: Vec<u8>,
    pub private_key: SecretVec,
}

/// The out-of-band symmetric secret that protects private keys at rest.
///
/// Never transmitted inside an envelope and never stored next to the
/// vault record it unlocks.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey(SecretBytes32);

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        let key = Self(SecretBytes32::new(bytes));
        bytes.zeroize();
        key
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(SecretBytes32::new(bytes))
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        SecretBytes32::from_slice(slice)
            .map(Self)
            .ok_or(SealError::KeyMaterial("master key must be 32 bytes"))
    }

    /// Parse the 64-character hex form used in configuration.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut raw = hex::decode(s.trim()).map_err(|_| SealError::KeyMaterial("master key hex"))?;
        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Public keys distributed to every encrypting process.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeys {
    /// ML-KEM encapsulation key bytes.
    #[serde(with = "serde_bytes")]
    pub kem_public_key: Vec<u8>,
    /// Asymmetric public key (SPKI DER or PEM).
    #[serde(with = "serde_bytes")]
    pub asymmetric_public_key: Vec<u8>,
}

/// Both private keys, as held by a process with decrypt responsibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKeys {
    pub kem_secret_key: SecretVec,
    pub asymmetric_private_key: SecretVec,
}

/// The persisted or transmitted ciphertext object.
///
/// Immutable once produced: any single-bit change makes decryption fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridEnvelope {
    /// Version tag; selects the field layout and primitive suite.
    pub version: String,
    /// KEM ciphertext carrying the post-quantum shared secret.
    pub kem_ciphertext: Vec<u8>,
    /// `wrap(DEK XOR sharedSecret)` under the asymmetric public key.
    pub wrapped_key: Vec<u8>,
    /// Payload AES-GCM nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Payload AES-GCM tag.
    pub auth_tag: [u8; TAG_LEN],
    /// Payload ciphertext without the tag.
    pub payload_ciphertext: Vec<u8>,
}

/// Private keys sealed under the master key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultRecord {
    pub nonce: [u8; NONCE_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub payload: Vec<u8>,
}

/// Plaintext layout inside a [`VaultRecord`] before sealing.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub(crate) struct PrivateKeyBundle {
    pub v: u32,
    #[serde(with = "serde_bytes")]
    pub kem_secret_key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub asymmetric_private_key: Vec<u8>,
}

impl PrivateKeyBundle {
    pub const CURRENT_VERSION: u32 = 1;
}

/// Serialize a value to CBOR.
///
/// The output carries the CBOR self-describe tag.
pub fn to_cbor<T: serde::Serialize>(v: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_cbor::ser::Serializer::new(&mut buf);
    ser.self_describe()
        .map_err(|e| SealError::Encoding(e.to_string()))?;
    v.serialize(&mut ser)
        .map_err(|e| SealError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
pub fn from_cbor<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_cbor::from_slice::<T>(data).map_err(|e| SealError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_key_hex_roundtrip() {
        let key = MasterKey::generate();
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(MasterKey::from_hex(&hex).unwrap(), key);
    }

    #[test]
    fn test_master_key_rejects_wrong_length() {
        assert!(matches!(
            MasterKey::from_hex("abcd"),
            Err(SealError::KeyMaterial(_))
        ));
        assert!(matches!(
            MasterKey::from_hex("zz"),
            Err(SealError::KeyMaterial(_))
        ));
    }

    #[test]
    fn test_master_key_debug_redacted() {
        assert_eq!(format!("{:?}", MasterKey::generate()), "MasterKey([REDACTED])");
    }

    #[test]
    fn test_fresh_master_keys_differ() {
        assert_ne!(MasterKey::generate(), MasterKey::generate());
    }

    #[test]
    fn test_cbor_roundtrip_private_bundle() {
        let bundle = PrivateKeyBundle {
            v: PrivateKeyBundle::CURRENT_VERSION,
            kem_secret_key: vec![1, 2, 3],
            asymmetric_private_key: vec![4, 5],
        };
        let bytes = to_cbor(&bundle).unwrap();
        let back: PrivateKeyBundle = from_cbor(&bytes).unwrap();
        assert_eq!(back.v, 1);
        assert_eq!(back.kem_secret_key, vec![1, 2, 3]);
        assert_eq!(back.asymmetric_private_key, vec![4, 5]);
    }

    #[test]
    fn test_from_cbor_garbage() {
        let r: Result<PrivateKeyBundle> = from_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(r, Err(SealError::Encoding(_))));
    }
}
