use tracing::{debug, warn};

use crate::asymmetric::{AsymmetricWrap, RsaOaep};
use crate::errors::{Result, SealError};
use crate::kem::{KemPrimitive, MlKem1024};
use crate::secret::SecretBytes32;
use crate::symmetric;
use crate::types::*;

/* ---------------- Encrypt ---------------- */

/// Turns a plaintext blob into a [`HybridEnvelope`].
///
/// Holds no secrets; safe to share across threads.
#[derive(Clone, Debug, Default)]
pub struct HybridEncryptor<K = MlKem1024, A = RsaOaep> {
    kem: K,
    wrap: A,
}

impl<K: KemPrimitive, A: AsymmetricWrap> HybridEncryptor<K, A> {
    pub fn new(kem: K, wrap: A) -> Self {
        Self { kem, wrap }
    }

    /// Seal `plaintext` for the holders of the matching private keys.
    ///
    /// 1. fresh DEK and nonce
    /// 2. AES-256-GCM over the plaintext with the DEK
    /// 3. KEM encapsulation to the KEM public key
    /// 4. `protected = DEK XOR shared_secret`
    /// 5. asymmetric wrap of `protected`
    ///
    /// Recovering the DEK needs both the KEM secret key and the asymmetric
    /// private key. Do not change step 4 when swapping primitives.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        kem_public_key: &[u8],
        asymmetric_public_key: &[u8],
    ) -> Result<HybridEnvelope> {
        self.kem.validate_public_key(kem_public_key)?;
        self.wrap.validate_public_key(asymmetric_public_key)?;

        let dek = symmetric::generate_key();
        let nonce = symmetric::generate_nonce();
        let (payload_ciphertext, auth_tag) = symmetric::seal(dek.as_bytes(), &nonce, plaintext)?;

        let (kem_ciphertext, shared_secret) = self.kem.encapsulate(kem_public_key)?;
        let protected_key = dek.xor(&shared_secret);
        let wrapped_key = self.wrap.wrap(protected_key.as_bytes(), asymmetric_public_key)?;

        debug!(
            kem = self.kem.name(),
            wrap = self.wrap.name(),
            plaintext_len = plaintext.len(),
            "sealed registry blob"
        );

        Ok(HybridEnvelope {
            version: ENVELOPE_VERSION_V2.to_string(),
            kem_ciphertext,
            wrapped_key,
            nonce,
            auth_tag,
            payload_ciphertext,
        })
    }

    /// [`Self::encrypt`] followed by the wire encoding.
    pub fn encrypt_to_string(
        &self,
        plaintext: &[u8],
        kem_public_key: &[u8],
        asymmetric_public_key: &[u8],
    ) -> Result<String> {
        self.encrypt(plaintext, kem_public_key, asymmetric_public_key)?
            .to_wire()
    }

    /// Encrypt to a [`PublicKeys`] bundle.
    pub fn encrypt_for(&self, plaintext: &[u8], keys: &PublicKeys) -> Result<HybridEnvelope> {
        self.encrypt(plaintext, &keys.kem_public_key, &keys.asymmetric_public_key)
    }
}

/* ---------------- Decrypt ---------------- */

/// Opens [`HybridEnvelope`]s given both private keys.
#[derive(Clone, Debug, Default)]
pub struct HybridDecryptor<K = MlKem1024, A = RsaOaep> {
    kem: K,
    wrap: A,
}

impl<K: KemPrimitive, A: AsymmetricWrap> HybridDecryptor<K, A> {
    pub fn new(kem: K, wrap: A) -> Self {
        Self { kem, wrap }
    }

    /// Recover the plaintext.
    ///
    /// Fails with `UnsupportedVersion` before any cryptographic work when the
    /// version is unknown. Every later failure is `DecryptionFailed`, whichever
    /// step produced it.
    pub fn decrypt(
        &self,
        envelope: &HybridEnvelope,
        kem_secret_key: &[u8],
        asymmetric_private_key: &[u8],
    ) -> Result<Vec<u8>> {
        if !envelope.is_supported() {
            warn!(version = %envelope.version, "rejected envelope with unknown version");
            return Err(SealError::UnsupportedVersion(envelope.version.clone()));
        }

        self.open_v2(envelope, kem_secret_key, asymmetric_private_key)
            .map_err(|_| {
                warn!("envelope rejected");
                SealError::DecryptionFailed
            })
    }

    /// Parse a wire string and decrypt it.
    pub fn decrypt_str(
        &self,
        wire: &str,
        kem_secret_key: &[u8],
        asymmetric_private_key: &[u8],
    ) -> Result<Vec<u8>> {
        let envelope = HybridEnvelope::from_wire(wire)?;
        self.decrypt(&envelope, kem_secret_key, asymmetric_private_key)
    }

    /// Decrypt with a [`SecretKeys`] bundle.
    pub fn decrypt_with(&self, envelope: &HybridEnvelope, keys: &SecretKeys) -> Result<Vec<u8>> {
        self.decrypt(
            envelope,
            keys.kem_secret_key.as_bytes(),
            keys.asymmetric_private_key.as_bytes(),
        )
    }

    // Every step runs even after an earlier one fails, so a rejected
    // envelope costs the same work whichever field was bad. Sensitive
    // intermediates are zero-on-drop.
    fn open_v2(
        &self,
        envelope: &HybridEnvelope,
        kem_secret_key: &[u8],
        asymmetric_private_key: &[u8],
    ) -> Result<Vec<u8>> {
        let protected_key = self
            .wrap
            .unwrap(&envelope.wrapped_key, asymmetric_private_key)
            .ok()
            .and_then(|unwrapped| SecretBytes32::from_slice(unwrapped.as_bytes()));
        let shared_secret = self
            .kem
            .decapsulate(&envelope.kem_ciphertext, kem_secret_key)
            .ok();
        let keys_recovered = protected_key.is_some() && shared_secret.is_some();

        let protected_key = protected_key.unwrap_or_else(symmetric::generate_key);
        let shared_secret = shared_secret.unwrap_or_else(symmetric::generate_key);
        let dek = protected_key.xor(&shared_secret);

        let opened = symmetric::open(
            dek.as_bytes(),
            &envelope.nonce,
            &envelope.payload_ciphertext,
            &envelope.auth_tag,
        );

        match opened {
            Ok(plaintext) if keys_recovered => {
                debug!(plaintext_len = plaintext.len(), "opened registry blob");
                Ok(plaintext)
            }
            _ => Err(SealError::DecryptionFailed),
        }
    }
}

/* ---------------- Defaults ---------------- */

/// Encrypt with the `v2` suite (ML-KEM-1024 + RSA-OAEP + AES-256-GCM).
pub fn encrypt(
    plaintext: &[u8],
    kem_public_key: &[u8],
    asymmetric_public_key: &[u8],
) -> Result<HybridEnvelope> {
    let encryptor: HybridEncryptor = HybridEncryptor::default();
    encryptor.encrypt(plaintext, kem_public_key, asymmetric_public_key)
}

/// Decrypt a `v2` envelope.
pub fn decrypt(
    envelope: &HybridEnvelope,
    kem_secret_key: &[u8],
    asymmetric_private_key: &[u8],
) -> Result<Vec<u8>> {
    let decryptor: HybridDecryptor = HybridDecryptor::default();
    decryptor.decrypt(envelope, kem_secret_key, asymmetric_private_key)
}
