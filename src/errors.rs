//! Error types for registry-seal operations.

use thiserror::Error;

/// Errors that can occur while sealing, opening, or provisioning key material.
///
/// Every error is terminal for the operation that produced it. Nothing in this
/// crate retries a cryptographic failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SealError {
    /// A key is malformed or has the wrong size. Raised at encrypt or
    /// provisioning time; the caller fixes its configuration.
    #[error("invalid key material: {0}")]
    KeyMaterial(&'static str),

    /// The plaintext exceeds what the symmetric cipher can seal in one message.
    #[error("plaintext too large")]
    PlaintextTooLarge,

    /// The envelope carries a version tag this build does not implement.
    #[error("unsupported envelope version: {0:?}")]
    UnsupportedVersion(String),

    /// Decryption failed. Deliberately undifferentiated: tag mismatch, KEM
    /// mismatch, unwrap failure and malformed fields all land here.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Wrong master key or corrupted vault record.
    #[error("vault unlock failed")]
    VaultUnlock,

    /// Raw AEAD authentication failure from the symmetric layer.
    #[error("authentication failed")]
    Authentication,

    /// `KeyManager::generate` was already run for this key epoch.
    #[error("key material already generated for this epoch")]
    AlreadyInitialized,

    /// Key material was requested before `KeyManager::generate` ran.
    #[error("key material not generated yet")]
    NotInitialized,

    /// Serialization or encoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A configuration value is missing or unreadable.
    #[error("configuration value missing or invalid: {0}")]
    Config(String),

    /// The blob store backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// No blob stored under the requested key.
    #[error("no blob stored under {0:?}")]
    NotFound(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SealError>;
