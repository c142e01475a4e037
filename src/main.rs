//! registry-seal demo main.rs
//! Walks one key epoch end to end:
//! - provisioning (ML-KEM-1024 + RSA-OAEP key pairs, master key, vault record)
//! - sealing a registry blob into a `v2` envelope and storing it
//! - unlocking the vault and opening the blob
//! - rejection with keys from an unrelated epoch
//!
//! Log level follows `RUST_LOG` (default `info`). Set `RSA_BITS` to change the
//! modulus size.

use registry_seal::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let env = EnvConfig::new();
    let keygen = KeyGenConfig::from_source(&env)?;

    // --- Provision one key epoch ---
    let manager = KeyManager::new(&keygen);
    let provisioned = manager.generate(None)?;
    info!(
        epoch = %provisioned.epoch.id,
        kem_pk_len = provisioned.public_keys.kem_public_key.len(),
        rsa_pk_len = provisioned.public_keys.asymmetric_public_key.len(),
        "provisioned key material"
    );

    // Public keys go out as configuration; the master key through its own channel.
    let published: MapConfig = publish_public_keys(&provisioned.public_keys)
        .into_iter()
        .collect();
    let public_keys = load_public_keys(&published)?;

    // --- Seal and store the registry ---
    let registry = RegistryStore::with_primitives(
        MemoryBlobStore::new(),
        MlKem1024,
        RsaOaep::new(keygen.rsa_bits),
    );
    let blob = br#"{"members":[{"id":1,"name":"Ada"}],"settings":{"dues":12}}"#;
    registry.save_registry("registry", blob, &public_keys)?;
    registry.save_vault_record("vault", &provisioned.vault_record)?;

    // --- Unlock and open ---
    let record = registry.load_vault_record("vault")?;
    let secrets = PrivateKeyVault::unwrap(&provisioned.master_key, &record)?;
    let opened = registry.load_registry("registry", &secrets)?;
    assert_eq!(opened, blob);
    info!(plaintext = %String::from_utf8_lossy(&opened), "opened registry");

    // --- Keys from another epoch must fail ---
    let other = KeyManager::new(&keygen).generate(None)?;
    let other_secrets = PrivateKeyVault::unwrap(&other.master_key, &other.vault_record)?;
    match registry.load_registry("registry", &other_secrets) {
        Err(SealError::DecryptionFailed) => info!("foreign epoch keys rejected as expected"),
        unexpected => {
            warn!(?unexpected, "foreign epoch keys were not rejected");
            return Err("foreign epoch keys were not rejected".into());
        }
    }

    Ok(())
}
