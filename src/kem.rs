//! Post-quantum key encapsulation.
//!
//! The hybrid protocol only needs a KEM that yields a 32-byte shared secret;
//! [`KemPrimitive`] is the seam where the algorithm is chosen. [`MlKem1024`]
//! is the implementation sealed under envelope version `v2`.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, EncodedSizeUser, KemCore, MlKem1024 as MlKem1024Params};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::errors::{Result, SealError};
use crate::secret::{SecretBytes32, SecretVec};
use crate::types::KemKeyPair;

/// A key-encapsulation mechanism producing a 32-byte shared secret.
pub trait KemPrimitive: Send + Sync {
    /// Algorithm name, for logs.
    fn name(&self) -> &'static str;

    /// Encoded public key length in bytes.
    fn public_key_len(&self) -> usize;

    /// Encapsulation ciphertext length in bytes.
    fn ciphertext_len(&self) -> usize;

    fn generate(&self) -> Result<KemKeyPair>;

    /// Produce `(ciphertext, shared_secret)` for `public_key`.
    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SecretBytes32)>;

    /// Recover the shared secret from `ciphertext`.
    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SecretBytes32>;

    /// Cheap structural check run before any randomness is spent.
    fn validate_public_key(&self, public_key: &[u8]) -> Result<()> {
        if public_key.len() != self.public_key_len() {
            return Err(SealError::KeyMaterial("kem public key size"));
        }
        Ok(())
    }
}

type EncapsulationKey = <MlKem1024Params as KemCore>::EncapsulationKey;
type DecapsulationKey = <MlKem1024Params as KemCore>::DecapsulationKey;

/// ML-KEM-1024 (FIPS 203).
#[derive(Clone, Copy, Debug, Default)]
pub struct MlKem1024;

impl MlKem1024 {
    pub const PUBLIC_KEY_LEN: usize = 1568;
    pub const SECRET_KEY_LEN: usize = 3168;
    pub const CIPHERTEXT_LEN: usize = 1568;

    fn parse_public(public_key: &[u8]) -> Result<EncapsulationKey> {
        let encoded = public_key
            .try_into()
            .map_err(|_| SealError::KeyMaterial("kem public key size"))?;
        let ek = EncapsulationKey::from_bytes(&encoded);

        // FIPS 203 modulus check: every coefficient must already be reduced.
        if ek.as_bytes().as_slice() != public_key {
            return Err(SealError::KeyMaterial("kem public key encoding"));
        }
        Ok(ek)
    }
}

impl KemPrimitive for MlKem1024 {
    fn name(&self) -> &'static str {
        "ML-KEM-1024"
    }

    fn public_key_len(&self) -> usize {
        Self::PUBLIC_KEY_LEN
    }

    fn ciphertext_len(&self) -> usize {
        Self::CIPHERTEXT_LEN
    }

    fn generate(&self) -> Result<KemKeyPair> {
        let (dk, ek) = MlKem1024Params::generate(&mut OsRng);

        let mut dk_encoded = dk.as_bytes();
        let secret_key = SecretVec::new(dk_encoded.to_vec());
        let dk_slice: &mut [u8] = &mut dk_encoded;
        dk_slice.zeroize();

        Ok(KemKeyPair {
            public_key: ek.as_bytes().to_vec(),
            secret_key,
        })
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SecretBytes32)> {
        let ek = Self::parse_public(public_key)?;
        let (ct, mut shared) = ek
            .encapsulate(&mut OsRng)
            .map_err(|_| SealError::KeyMaterial("kem encapsulation"))?;

        let secret = SecretBytes32::from_slice(shared.as_slice());
        shared.as_mut_slice().zeroize();
        let secret = secret.ok_or(SealError::KeyMaterial("kem shared secret size"))?;
        Ok((ct.as_slice().to_vec(), secret))
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SecretBytes32> {
        if secret_key.len() != Self::SECRET_KEY_LEN {
            return Err(SealError::DecryptionFailed);
        }
        let ct: Ciphertext<MlKem1024Params> = ciphertext
            .try_into()
            .map_err(|_| SealError::DecryptionFailed)?;
        let mut encoded = secret_key
            .try_into()
            .map_err(|_| SealError::DecryptionFailed)?;
        let dk = DecapsulationKey::from_bytes(&encoded);
        let encoded_slice: &mut [u8] = &mut encoded;
        encoded_slice.zeroize();

        // Implicit rejection: a mismatched key yields an unrelated secret,
        // which the payload AEAD then refuses.
        let mut shared = dk
            .decapsulate(&ct)
            .map_err(|_| SealError::DecryptionFailed)?;
        let secret = SecretBytes32::from_slice(shared.as_slice());
        shared.as_mut_slice().zeroize();
        secret.ok_or(SealError::DecryptionFailed)
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<()> {
        Self::parse_public(public_key).map(|_| ())
    }
}
