//! AES-256-GCM with a detached tag and no associated data.
//!
//! Used directly for the envelope payload (keyed by the single-use DEK) and
//! for the private key vault (keyed by the master key).

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::errors::{Result, SealError};
use crate::secret::SecretBytes32;
use crate::types::{KEY_LEN, NONCE_LEN, TAG_LEN};

/// Largest plaintext AES-GCM can seal under one nonce (2^36 - 32 bytes).
pub const MAX_PLAINTEXT_LEN: u64 = (1 << 36) - 32;

/// Generate a random 256-bit symmetric key.
pub fn generate_key() -> SecretBytes32 {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    let out = SecretBytes32::new(key);
    key.zeroize();
    out
}

/// Generate a random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Seal `plaintext`, returning the ciphertext and its detached tag.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    if plaintext.len() as u64 > MAX_PLAINTEXT_LEN {
        return Err(SealError::PlaintextTooLarge);
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| SealError::KeyMaterial("aes-256-gcm key"))?;

    let mut buf = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buf) {
        Ok(tag) => tag,
        Err(_) => {
            buf.zeroize();
            return Err(SealError::PlaintextTooLarge);
        }
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buf, tag_bytes))
}

/// Open a sealed payload.
///
/// The tag is checked in constant time before any plaintext is produced; on
/// mismatch the working buffer is wiped and `Authentication` is returned.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| SealError::KeyMaterial("aes-256-gcm key"))?;

    let mut buf = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(
        Nonce::from_slice(nonce),
        b"",
        &mut buf,
        Tag::from_slice(tag),
    ) {
        Ok(()) => Ok(buf),
        Err(_) => {
            buf.zeroize();
            Err(SealError::Authentication)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = b"{\"members\":[{\"id\":1}]}";

        let (ct, tag) = seal(key.as_bytes(), &nonce, plaintext).unwrap();
        assert_eq!(ct.len(), plaintext.len());
        let pt = open(key.as_bytes(), &nonce, &ct, &tag).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = generate_nonce();
        let (ct, tag) = seal(generate_key().as_bytes(), &nonce, b"secret").unwrap();
        let result = open(generate_key().as_bytes(), &nonce, &ct, &tag);
        assert_eq!(result, Err(SealError::Authentication));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let key = generate_key();
        let (ct, tag) = seal(key.as_bytes(), &generate_nonce(), b"secret").unwrap();
        let result = open(key.as_bytes(), &generate_nonce(), &ct, &tag);
        assert_eq!(result, Err(SealError::Authentication));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = generate_key();
        let nonce = generate_nonce();
        let (mut ct, tag) = seal(key.as_bytes(), &nonce, b"secret").unwrap();
        ct[0] ^= 0x01;
        assert_eq!(
            open(key.as_bytes(), &nonce, &ct, &tag),
            Err(SealError::Authentication)
        );
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = generate_key();
        let nonce = generate_nonce();
        let (ct, mut tag) = seal(key.as_bytes(), &nonce, b"secret").unwrap();
        tag[TAG_LEN - 1] ^= 0x80;
        assert_eq!(
            open(key.as_bytes(), &nonce, &ct, &tag),
            Err(SealError::Authentication)
        );
    }

    #[test]
    fn test_empty_plaintext() {
        let key = generate_key();
        let nonce = generate_nonce();
        let (ct, tag) = seal(key.as_bytes(), &nonce, b"").unwrap();
        assert!(ct.is_empty());
        assert!(open(key.as_bytes(), &nonce, &ct, &tag).unwrap().is_empty());
    }

    #[test]
    fn test_large_plaintext() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = vec![0xAB; 1_000_000];
        let (ct, tag) = seal(key.as_bytes(), &nonce, &plaintext).unwrap();
        assert_eq!(open(key.as_bytes(), &nonce, &ct, &tag).unwrap(), plaintext);
    }

    #[test]
    fn test_nonces_are_fresh() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
