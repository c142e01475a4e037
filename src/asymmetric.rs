//! Classical public-key wrapping of the masked DEK.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::errors::{Result, SealError};
use crate::secret::SecretVec;
use crate::types::AsymmetricKeyPair;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// A public-key scheme that wraps short secrets.
pub trait AsymmetricWrap: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self) -> Result<AsymmetricKeyPair>;

    fn wrap(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>>;

    fn unwrap(&self, ciphertext: &[u8], private_key: &[u8]) -> Result<SecretVec>;

    /// Parse `public_key` without using it, so encrypt can fail fast.
    fn validate_public_key(&self, public_key: &[u8]) -> Result<()>;
}

/// RSA-OAEP with SHA-256 (and MGF1-SHA-256).
#[derive(Clone, Copy, Debug)]
pub struct RsaOaep {
    bits: usize,
}

impl RsaOaep {
    pub const MIN_BITS: usize = 2048;
    pub const DEFAULT_BITS: usize = 3072;

    /// Key generation modulus size; clamped up to [`Self::MIN_BITS`].
    pub fn new(bits: usize) -> Self {
        Self {
            bits: bits.max(Self::MIN_BITS),
        }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    fn parse_public(public_key: &[u8]) -> Result<RsaPublicKey> {
        let key = if public_key.starts_with(PEM_PREFIX) {
            let pem = std::str::from_utf8(public_key)
                .map_err(|_| SealError::KeyMaterial("rsa public key pem"))?;
            RsaPublicKey::from_public_key_pem(pem)
        } else {
            RsaPublicKey::from_public_key_der(public_key)
        }
        .map_err(|_| SealError::KeyMaterial("rsa public key encoding"))?;

        if key.size() * 8 < Self::MIN_BITS {
            return Err(SealError::KeyMaterial("rsa modulus too small"));
        }
        Ok(key)
    }

    fn parse_private(private_key: &[u8]) -> Result<RsaPrivateKey> {
        let key = if private_key.starts_with(PEM_PREFIX) {
            let pem = std::str::from_utf8(private_key).map_err(|_| SealError::DecryptionFailed)?;
            RsaPrivateKey::from_pkcs8_pem(pem)
        } else {
            RsaPrivateKey::from_pkcs8_der(private_key)
        };
        key.map_err(|_| SealError::DecryptionFailed)
    }
}

impl Default for RsaOaep {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BITS)
    }
}

impl AsymmetricWrap for RsaOaep {
    fn name(&self) -> &'static str {
        "RSA-OAEP-SHA256"
    }

    fn generate(&self) -> Result<AsymmetricKeyPair> {
        let private = RsaPrivateKey::new(&mut OsRng, self.bits)
            .map_err(|_| SealError::KeyMaterial("rsa key generation"))?;
        let public = RsaPublicKey::from(&private);

        let public_der = public
            .to_public_key_der()
            .map_err(|e| SealError::Encoding(e.to_string()))?;
        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| SealError::Encoding(e.to_string()))?;

        Ok(AsymmetricKeyPair {
            public_key: public_der.as_bytes().to_vec(),
            private_key: SecretVec::new(private_der.as_bytes().to_vec()),
        })
    }

    fn wrap(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>> {
        let key = Self::parse_public(public_key)?;
        key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|_| SealError::KeyMaterial("rsa-oaep wrap"))
    }

    fn unwrap(&self, ciphertext: &[u8], private_key: &[u8]) -> Result<SecretVec> {
        let key = Self::parse_private(private_key)?;
        key.decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map(SecretVec::new)
            .map_err(|_| SealError::DecryptionFailed)
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<()> {
        Self::parse_public(public_key).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::LineEnding;

    fn fast() -> RsaOaep {
        RsaOaep::new(RsaOaep::MIN_BITS)
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let rsa = fast();
        let kp = rsa.generate().unwrap();
        let secret = [0x42u8; 32];
        let wrapped = rsa.wrap(&secret, &kp.public_key).unwrap();
        assert_eq!(wrapped.len(), 256);
        let unwrapped = rsa.unwrap(&wrapped, kp.private_key.as_bytes()).unwrap();
        assert_eq!(unwrapped.as_bytes(), &secret);
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let rsa = fast();
        let kp1 = rsa.generate().unwrap();
        let kp2 = rsa.generate().unwrap();
        let wrapped = rsa.wrap(&[7u8; 32], &kp1.public_key).unwrap();
        assert_eq!(
            rsa.unwrap(&wrapped, kp2.private_key.as_bytes()),
            Err(SealError::DecryptionFailed)
        );
    }

    #[test]
    fn test_pem_public_key_accepted() {
        let rsa = fast();
        let kp = rsa.generate().unwrap();
        let public = RsaPublicKey::from_public_key_der(&kp.public_key).unwrap();
        let pem = public.to_public_key_pem(LineEnding::LF).unwrap();
        let wrapped = rsa.wrap(&[1u8; 32], pem.as_bytes()).unwrap();
        let unwrapped = rsa.unwrap(&wrapped, kp.private_key.as_bytes()).unwrap();
        assert_eq!(unwrapped.as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn test_malformed_public_key() {
        let rsa = fast();
        assert!(matches!(
            rsa.validate_public_key(b"not a key"),
            Err(SealError::KeyMaterial(_))
        ));
        assert!(matches!(
            rsa.wrap(&[0u8; 32], b"-----BEGIN PUBLIC KEY-----\ngarbage\n"),
            Err(SealError::KeyMaterial(_))
        ));
    }

    #[test]
    fn test_malformed_private_key() {
        let rsa = fast();
        let kp = rsa.generate().unwrap();
        let wrapped = rsa.wrap(&[0u8; 32], &kp.public_key).unwrap();
        assert_eq!(
            rsa.unwrap(&wrapped, b"junk"),
            Err(SealError::DecryptionFailed)
        );
    }

    #[test]
    fn test_bits_clamped() {
        assert_eq!(RsaOaep::new(512).bits(), RsaOaep::MIN_BITS);
        assert_eq!(RsaOaep::default().bits(), 3072);
    }
}
