//! # registry-seal
//!
//! Hybrid post-quantum + classical encryption at rest for a serialized
//! membership registry, with a stable, versioned envelope format and a vault
//! that keeps the private keys sealed under a separately held master key.
//!
//! ## Algorithm Suite (`v2`)
//!
//! - **Key Encapsulation:** ML-KEM-1024 for the post-quantum share of the DEK
//! - **Key Wrapping:** RSA-OAEP (SHA-256) for the classical wrap
//! - **Symmetric Encryption:** AES-256-GCM for the payload and the vault
//! - **Wire Format:** `v2:<kem>:<wrapped>:<nonce>:<tag>:<payload>`, lower-case hex
//!
//! The DEK is XORed with the KEM shared secret before it is wrapped, so the
//! payload stays protected as long as either primitive holds.
//!
//! ## Example
//!
//! ```rust,no_run
//! use registry_seal::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! // One-time provisioning
//! let manager = KeyManager::default();
//! let provisioned = manager.generate(None)?;
//!
//! // Any process holding the public keys can seal
//! let wire = manager
//!     .encryptor()
//!     .encrypt_for(b"{\"members\":[]}", &provisioned.public_keys)?
//!     .to_wire()?;
//!
//! // A process holding the master key unlocks the vault and opens it
//! let secrets = PrivateKeyVault::unwrap(&provisioned.master_key, &provisioned.vault_record)?;
//! let envelope: HybridEnvelope = wire.parse()?;
//! let plaintext = manager.decryptor().decrypt_with(&envelope, &secrets)?;
//! assert_eq!(plaintext, b"{\"members\":[]}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Considerations
//!
//! - DEKs are single-use and nonces are drawn fresh from the OS RNG per call
//! - Every post-parse decryption failure is the same `DecryptionFailed` error
//! - Sensitive intermediates are zeroized on every exit path
//! - The master key and the vault record must travel through separate channels
//! - A new `generate` orphans envelopes sealed under the previous epoch
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0.

mod asymmetric;
mod config;
mod crypto;
mod envelope;
mod errors;
mod kem;
mod keys;
mod secret;
mod store;
mod symmetric;
mod types;
mod vault;

pub use asymmetric::{AsymmetricWrap, RsaOaep};
pub use config::*;
pub use crypto::*;
pub use envelope::{
    decode as decode_envelope, encode as encode_envelope, SEPARATOR, SUPPORTED_VERSIONS,
};
pub use errors::{Result, SealError};
pub use kem::{KemPrimitive, MlKem1024};
pub use keys::{KeyEpoch, KeyManager, Provisioned};
pub use secret::{SecretBytes32, SecretVec};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, RegistryStore};
pub use symmetric::{
    generate_key as generate_symmetric_key, generate_nonce, open as symmetric_open,
    seal as symmetric_seal, MAX_PLAINTEXT_LEN,
};
pub use types::*;
pub use vault::PrivateKeyVault;
