use bytelock_crypto::{
    derive_artifact_key, derive_master_key, KeyDerivationError, MasterKey, Salt, KEY_SIZE,
    PBKDF2_ITERATIONS,
};

fn fixed_salt() -> [u8; 32] {
    [7u8; 32]
}

// ── derive_master_key ────────────────────────────────────────────

#[test]
fn master_key_is_deterministic() {
    let key1 = derive_master_key("test_password_123", &fixed_salt()).unwrap();
    let key2 = derive_master_key("test_password_123", &fixed_salt()).unwrap();
    assert_eq!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn master_key_matches_known_vector() {
    let key = derive_master_key("correct-horse", &fixed_salt()).unwrap();
    assert_eq!(
        hex::encode(key.as_bytes()),
        "b1974b2c34fa19b9c3c78102610df3e2355499858be038215fded3ce5798897c"
    );
}

#[test]
fn different_passwords_produce_different_master_keys() {
    let key1 = derive_master_key("password1", &fixed_salt()).unwrap();
    let key2 = derive_master_key("password2", &fixed_salt()).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn different_salts_produce_different_master_keys() {
    let key1 = derive_master_key("same_password", &[1u8; 16]).unwrap();
    let key2 = derive_master_key("same_password", &[2u8; 16]).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn iteration_count_is_at_least_100k() {
    assert!(PBKDF2_ITERATIONS >= 100_000);
}

#[test]
fn empty_password_is_rejected() {
    assert_eq!(
        derive_master_key("", &fixed_salt()).unwrap_err(),
        KeyDerivationError::EmptyPassword
    );
}

#[test]
fn short_salt_is_rejected() {
    assert_eq!(
        derive_master_key("pw", &[0u8; 8]).unwrap_err(),
        KeyDerivationError::SaltTooShort { min: 16, actual: 8 }
    );
}

#[test]
fn master_key_from_generated_salt() {
    let salt = Salt::generate();
    let key = derive_master_key("pw", salt.as_bytes()).unwrap();
    assert_eq!(key.as_bytes().len(), KEY_SIZE);
}

// ── derive_artifact_key ──────────────────────────────────────────

#[test]
fn artifact_key_matches_known_vector() {
    let key = derive_artifact_key(&[0x42; 32], "com.example.Main").unwrap();
    assert_eq!(
        hex::encode(key.as_bytes()),
        "f51d42cc557f2c4c97731f5f7bdb850873ee878475db690503a1407984645b74"
    );
}

#[test]
fn artifact_key_is_deterministic() {
    let master = MasterKey::from_bytes([5; KEY_SIZE]);
    let a = master.derive_artifact_key("com.example.Foo").unwrap();
    let b = master.derive_artifact_key("com.example.Foo").unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn artifact_keys_are_independent() {
    let master = MasterKey::from_bytes([5; KEY_SIZE]);
    let a = master.derive_artifact_key("com.example.Foo").unwrap();
    let b = master.derive_artifact_key("com.example.Bar").unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
    assert_ne!(a.as_bytes(), master.as_bytes());
}

#[test]
fn artifact_key_depends_on_master_key() {
    let a = derive_artifact_key(&[1; 32], "com.example.Foo").unwrap();
    let b = derive_artifact_key(&[2; 32], "com.example.Foo").unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn artifact_key_rejects_bad_master_length() {
    assert_eq!(
        derive_artifact_key(&[0u8; 16], "A").unwrap_err(),
        KeyDerivationError::InvalidMasterKeyLength {
            expected: 32,
            actual: 16
        }
    );
}

#[test]
fn artifact_key_rejects_empty_id() {
    assert_eq!(
        derive_artifact_key(&[0u8; 32], "").unwrap_err(),
        KeyDerivationError::EmptyArtifactId
    );
}

#[test]
fn artifact_key_debug_is_redacted() {
    let key = derive_artifact_key(&[0u8; 32], "A").unwrap();
    assert!(format!("{key:?}").contains("REDACTED"));
}

// ── Salt ─────────────────────────────────────────────────────────

#[test]
fn salt_roundtrips_bytes() {
    let salt = Salt::from_bytes(vec![9u8; 20]).unwrap();
    assert_eq!(salt.as_bytes(), &[9u8; 20]);
    assert_eq!(salt.len(), 20);
    assert!(!salt.is_empty());
}
