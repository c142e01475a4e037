//! Configuration-level key distribution.
//!
//! Public keys are published as plain configuration values. The master key
//! travels through its own channel; this module only reads it.

use std::collections::HashMap;

use tracing::debug;

use crate::asymmetric::RsaOaep;
use crate::errors::{Result, SealError};
use crate::types::{MasterKey, PublicKeys};

pub const KEM_PUBLIC_KEY: &str = "KEM_PUBLIC_KEY";
pub const ASYMMETRIC_PUBLIC_KEY: &str = "ASYMMETRIC_PUBLIC_KEY";
pub const MASTER_KEY: &str = "MASTER_KEY";
pub const RSA_BITS: &str = "RSA_BITS";

/// Read-only name/value lookup.
pub trait ConfigSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Process environment, optionally namespaced (`PREFIX_NAME`).
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    prefix: Option<String>,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn key(&self, name: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}_{name}"),
            None => name.to_string(),
        }
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(self.key(name)).ok()
    }
}

/// In-memory configuration.
#[derive(Clone, Debug, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

fn required(source: &dyn ConfigSource, name: &str) -> Result<String> {
    source
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SealError::Config(name.to_string()))
}

/// Read the distributed public keys.
///
/// The KEM key is hex. The asymmetric key is either hex-encoded DER or PEM
/// text.
pub fn load_public_keys(source: &dyn ConfigSource) -> Result<PublicKeys> {
    let kem_public_key = hex::decode(required(source, KEM_PUBLIC_KEY)?)
        .map_err(|_| SealError::Config(KEM_PUBLIC_KEY.to_string()))?;

    let asym = required(source, ASYMMETRIC_PUBLIC_KEY)?;
    let asymmetric_public_key = if asym.starts_with("-----BEGIN") {
        asym.into_bytes()
    } else {
        hex::decode(&asym)
            .map_err(|_| SealError::Config(ASYMMETRIC_PUBLIC_KEY.to_string()))?
    };

    debug!(
        kem_len = kem_public_key.len(),
        asym_len = asymmetric_public_key.len(),
        "loaded public keys from configuration"
    );
    Ok(PublicKeys {
        kem_public_key,
        asymmetric_public_key,
    })
}

/// Read the master key (64 hex characters).
pub fn load_master_key(source: &dyn ConfigSource) -> Result<MasterKey> {
    MasterKey::from_hex(&required(source, MASTER_KEY)?)
}

/// Render public keys as the name/value pairs [`load_public_keys`] reads.
pub fn publish_public_keys(keys: &PublicKeys) -> Vec<(String, String)> {
    let asym = match std::str::from_utf8(&keys.asymmetric_public_key) {
        Ok(pem) if pem.starts_with("-----BEGIN") => pem.to_string(),
        _ => hex::encode(&keys.asymmetric_public_key),
    };
    vec![
        (KEM_PUBLIC_KEY.to_string(), hex::encode(&keys.kem_public_key)),
        (ASYMMETRIC_PUBLIC_KEY.to_string(), asym),
    ]
}

/// Key generation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyGenConfig {
    /// RSA modulus size in bits.
    pub rsa_bits: usize,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            rsa_bits: RsaOaep::DEFAULT_BITS,
        }
    }
}

impl KeyGenConfig {
    /// Read `RSA_BITS`, falling back to the default when unset.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(raw) = source.get(RSA_BITS) {
            let bits: usize = raw
                .trim()
                .parse()
                .map_err(|_| SealError::Config(RSA_BITS.to_string()))?;
            if bits < RsaOaep::MIN_BITS {
                return Err(SealError::KeyMaterial("rsa modulus too small"));
            }
            cfg.rsa_bits = bits;
        }
        Ok(cfg)
    }
}
