//! Wire format for [`HybridEnvelope`].
//!
//! ```text
//! <version>:<hex kem_ciphertext>:<hex wrapped_key>:<hex nonce>:<hex auth_tag>:<hex payload_ciphertext>
//! ```
//!
//! All binary fields are lower-case hex, so the `:` separator can never occur
//! inside a field. The encoder asserts this and the decoder enforces it.

use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, SealError};
use crate::types::{HybridEnvelope, ENVELOPE_VERSION_V2, NONCE_LEN, TAG_LEN};

/// Field separator.
pub const SEPARATOR: char = ':';

/// Fields after the version tag in a `v2` envelope.
const V2_FIELD_COUNT: usize = 5;

/// Envelope versions this build can open.
pub const SUPPORTED_VERSIONS: &[&str] = &[ENVELOPE_VERSION_V2];

/// Serialize an envelope to its wire string.
pub fn encode(envelope: &HybridEnvelope) -> Result<String> {
    if envelope.version.is_empty()
        || !envelope
            .version
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        let version = &envelope.version;
        return Err(SealError::Encoding(format!("invalid version tag {version:?}")));
    }

    let fields = [
        hex::encode(&envelope.kem_ciphertext),
        hex::encode(&envelope.wrapped_key),
        hex::encode(envelope.nonce),
        hex::encode(envelope.auth_tag),
        hex::encode(&envelope.payload_ciphertext),
    ];
    debug_assert!(fields.iter().all(|f| is_lower_hex(f)));

    let mut out = String::with_capacity(
        envelope.version.len() + fields.iter().map(|f| f.len() + 1).sum::<usize>(),
    );
    out.push_str(&envelope.version);
    for field in &fields {
        out.push(SEPARATOR);
        out.push_str(field);
    }
    Ok(out)
}

/// Parse a wire string.
///
/// The version tag is checked before any other field is looked at. Every
/// structural problem after that is reported as `DecryptionFailed`.
pub fn decode(wire: &str) -> Result<HybridEnvelope> {
    let mut parts = wire.split(SEPARATOR);
    let version = parts.next().unwrap_or_default();
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(SealError::UnsupportedVersion(version.to_string()));
    }

    let fields: Vec<&str> = parts.collect();
    if fields.len() != V2_FIELD_COUNT {
        return Err(SealError::DecryptionFailed);
    }

    let kem_ciphertext = decode_field(fields[0])?;
    let wrapped_key = decode_field(fields[1])?;
    let nonce: [u8; NONCE_LEN] = decode_field(fields[2])?
        .try_into()
        .map_err(|_| SealError::DecryptionFailed)?;
    let auth_tag: [u8; TAG_LEN] = decode_field(fields[3])?
        .try_into()
        .map_err(|_| SealError::DecryptionFailed)?;
    let payload_ciphertext = decode_field(fields[4])?;

    if kem_ciphertext.is_empty() || wrapped_key.is_empty() {
        return Err(SealError::DecryptionFailed);
    }

    Ok(HybridEnvelope {
        version: version.to_string(),
        kem_ciphertext,
        wrapped_key,
        nonce,
        auth_tag,
        payload_ciphertext,
    })
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn decode_field(field: &str) -> Result<Vec<u8>> {
    if !is_lower_hex(field) {
        return Err(SealError::DecryptionFailed);
    }
    hex::decode(field).map_err(|_| SealError::DecryptionFailed)
}

impl HybridEnvelope {
    /// Whether this build implements the envelope's version.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(&self.version.as_str())
    }

    pub fn to_wire(&self) -> Result<String> {
        encode(self)
    }

    pub fn from_wire(wire: &str) -> Result<Self> {
        decode(wire)
    }
}

impl fmt::Display for HybridEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wire = encode(self).map_err(|_| fmt::Error)?;
        f.write_str(&wire)
    }
}

impl FromStr for HybridEnvelope {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}
