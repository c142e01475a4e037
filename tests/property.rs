#![allow(clippy::unwrap_used)] // unwrap() is idiomatic in property tests

mod common;

use common::{flip_bit, Field, FIELDS};
use proptest::prelude::*;
use registry_seal::*;

fn field_strategy() -> impl Strategy<Value = Field> {
    prop::sample::select(FIELDS.to_vec())
}

// ============================================================================
// Property: Round-trip encryption/decryption
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        message in prop::collection::vec(any::<u8>(), 0..10000),
    ) {
        let keys = common::keys();
        let envelope = encrypt(
            &message,
            &keys.public.kem_public_key,
            &keys.public.asymmetric_public_key,
        )?;
        let decrypted = decrypt(
            &envelope,
            keys.secret.kem_secret_key.as_bytes(),
            keys.secret.asymmetric_private_key.as_bytes(),
        )?;
        prop_assert_eq!(decrypted, message);
    }
}

// ============================================================================
// Property: Wire string round-trips through the codec
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_wire_roundtrip(
        message in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let keys = common::keys();
        let envelope = common::seal(&message, keys);
        let wire = envelope.to_wire()?;
        prop_assert!(wire.starts_with("v2:"));
        prop_assert_eq!(wire.matches(':').count(), 5);

        let parsed: HybridEnvelope = wire.parse()?;
        prop_assert_eq!(&parsed, &envelope);
        prop_assert_eq!(common::open(&parsed, keys)?, message);
    }
}

// ============================================================================
// Property: Any single-bit mutation is detected
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_single_bit_flip_detected(
        message in prop::collection::vec(any::<u8>(), 1..512),
        field in field_strategy(),
        bit in any::<usize>(),
    ) {
        let keys = common::keys();
        let envelope = common::seal(&message, keys);
        let tampered = flip_bit(&envelope, field, bit);
        prop_assert_ne!(&tampered, &envelope);
        prop_assert_eq!(common::open(&tampered, keys), Err(SealError::DecryptionFailed));
    }
}

// ============================================================================
// Property: Unknown versions are rejected before any crypto
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unknown_version_rejected(version in "[A-Za-z0-9.-]{0,8}") {
        prop_assume!(version != "v2");
        let keys = common::keys();
        let mut envelope = common::seal(b"registry", keys);
        envelope.version = version.clone();

        // Empty secret keys: only the version check can produce this result.
        prop_assert_eq!(
            decrypt(&envelope, b"", b""),
            Err(SealError::UnsupportedVersion(version.clone()))
        );

        let mut wire = common::seal(b"registry", keys).to_wire()?;
        wire.replace_range(0..2, &version);
        prop_assert_eq!(
            decode_envelope(&wire),
            Err(SealError::UnsupportedVersion(version))
        );
    }
}

// ============================================================================
// Property: Decoding arbitrary text never panics
// ============================================================================

proptest! {
    #[test]
    fn prop_decode_arbitrary_input(wire in "v2(:[0-9a-fA-F]{0,40}){0,7}|.{0,120}") {
        match decode_envelope(&wire) {
            Ok(env) => prop_assert_eq!(env.version, "v2"),
            Err(SealError::DecryptionFailed) | Err(SealError::UnsupportedVersion(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}

// ============================================================================
// Property: Fresh randomness per encryption
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_encryptions_are_unique(
        message in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let keys = common::keys();
        let a = common::seal(&message, keys);
        let b = common::seal(&message, keys);
        prop_assert_ne!(a.nonce, b.nonce);
        prop_assert_ne!(&a.kem_ciphertext, &b.kem_ciphertext);
        prop_assert_ne!(&a.wrapped_key, &b.wrapped_key);
        prop_assert_ne!(a.to_wire()?, b.to_wire()?);
    }
}

// ============================================================================
// Property: Vault round-trip, wrong master key fails
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_vault_roundtrip(
        kem_sk in prop::collection::vec(any::<u8>(), 0..4096),
        rsa_sk in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let master = MasterKey::generate();
        let record = PrivateKeyVault::wrap(&master, &kem_sk, &rsa_sk)?;

        let json = record.to_json()?;
        let restored = VaultRecord::from_json(&json)?;
        let keys = PrivateKeyVault::unwrap(&master, &restored)?;
        prop_assert_eq!(keys.kem_secret_key.as_bytes(), kem_sk.as_slice());
        prop_assert_eq!(keys.asymmetric_private_key.as_bytes(), rsa_sk.as_slice());

        prop_assert_eq!(
            PrivateKeyVault::unwrap(&MasterKey::generate(), &restored),
            Err(SealError::VaultUnlock)
        );
    }
}
