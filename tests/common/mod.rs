#![allow(dead_code)]

use std::sync::OnceLock;

use registry_seal::*;

/// A full key set for one epoch, generated with a 2048-bit modulus.
pub struct KeySet {
    pub public: PublicKeys,
    pub secret: SecretKeys,
}

fn generate() -> KeySet {
    let kem = MlKem1024.generate().unwrap();
    let rsa = RsaOaep::new(RsaOaep::MIN_BITS).generate().unwrap();
    KeySet {
        public: PublicKeys {
            kem_public_key: kem.public_key,
            asymmetric_public_key: rsa.public_key,
        },
        secret: SecretKeys {
            kem_secret_key: kem.secret_key,
            asymmetric_private_key: rsa.private_key,
        },
    }
}

/// Keys shared by every test in the binary.
pub fn keys() -> &'static KeySet {
    static KEYS: OnceLock<KeySet> = OnceLock::new();
    KEYS.get_or_init(generate)
}

/// A second, unrelated key set.
pub fn other_keys() -> &'static KeySet {
    static KEYS: OnceLock<KeySet> = OnceLock::new();
    KEYS.get_or_init(generate)
}

pub fn fast_keygen() -> KeyGenConfig {
    KeyGenConfig {
        rsa_bits: RsaOaep::MIN_BITS,
    }
}

pub fn seal(plaintext: &[u8], keys: &KeySet) -> HybridEnvelope {
    HybridEncryptor::<MlKem1024, RsaOaep>::default()
        .encrypt_for(plaintext, &keys.public)
        .unwrap()
}

pub fn open(envelope: &HybridEnvelope, keys: &KeySet) -> Result<Vec<u8>> {
    HybridDecryptor::<MlKem1024, RsaOaep>::default().decrypt_with(envelope, &keys.secret)
}

/// Fields covered by the authenticity invariant.
#[derive(Clone, Copy, Debug)]
pub enum Field {
    KemCiphertext,
    WrappedKey,
    Nonce,
    AuthTag,
    Payload,
}

pub const FIELDS: [Field; 5] = [
    Field::KemCiphertext,
    Field::WrappedKey,
    Field::Nonce,
    Field::AuthTag,
    Field::Payload,
];

pub fn field_mut(envelope: &mut HybridEnvelope, field: Field) -> &mut [u8] {
    match field {
        Field::KemCiphertext => &mut envelope.kem_ciphertext,
        Field::WrappedKey => &mut envelope.wrapped_key,
        Field::Nonce => &mut envelope.nonce,
        Field::AuthTag => &mut envelope.auth_tag,
        Field::Payload => &mut envelope.payload_ciphertext,
    }
}

/// Copy of `envelope` with bit `bit` (modulo the field size) flipped.
pub fn flip_bit(envelope: &HybridEnvelope, field: Field, bit: usize) -> HybridEnvelope {
    let mut out = envelope.clone();
    let bytes = field_mut(&mut out, field);
    let bit = bit % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
    out
}
