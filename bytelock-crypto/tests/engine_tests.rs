use bytelock_crypto::{
    derive_artifact_key, seal, seal_with, CipherError, CipherSuite, DecryptionEngine,
    DecryptionError, KeyDerivationError, MasterKey, DEFAULT_CACHE_CAPACITY, KEY_SIZE,
};
use std::sync::Arc;
use std::thread;

const MASTER: [u8; KEY_SIZE] = [0x11; KEY_SIZE];

fn sealed_for(id: &str, plaintext: &[u8]) -> Vec<u8> {
    let key = derive_artifact_key(&MASTER, id).unwrap();
    seal(plaintext, key.as_bytes()).unwrap().into_bytes()
}

fn engine(capacity: usize) -> DecryptionEngine {
    DecryptionEngine::with_capacity(MasterKey::from_bytes(MASTER), capacity)
}

// ── decrypt ──────────────────────────────────────────────────────

#[test]
fn decrypts_and_caches() {
    let engine = engine(10);
    let blob = sealed_for("com.example.A", b"class A");

    let first = engine.decrypt("com.example.A", &blob).unwrap();
    assert_eq!(&*first, b"class A");
    assert!(engine.is_cached("com.example.A"));
    assert_eq!(engine.cache_size(), 1);
}

#[test]
fn cache_hit_skips_unsealing() {
    let engine = engine(10);
    let blob = sealed_for("com.example.A", b"class A");
    engine.decrypt("com.example.A", &blob).unwrap();

    // Garbage input is never looked at on a hit.
    let again = engine.decrypt("com.example.A", b"garbage").unwrap();
    assert_eq!(&*again, b"class A");
}

#[test]
fn default_capacity_is_1000() {
    let engine = DecryptionEngine::new(MasterKey::from_bytes(MASTER));
    assert_eq!(engine.capacity(), DEFAULT_CACHE_CAPACITY);
    assert_eq!(DEFAULT_CACHE_CAPACITY, 1000);
}

#[test]
fn clear_cache_empties() {
    let engine = engine(10);
    engine
        .decrypt("com.example.A", &sealed_for("com.example.A", b"a"))
        .unwrap();
    engine.clear_cache();
    assert_eq!(engine.cache_size(), 0);
    assert!(!engine.is_cached("com.example.A"));
}

#[test]
fn evicts_least_recently_used() {
    let engine = engine(2);
    let a = sealed_for("A", b"a");
    let b = sealed_for("B", b"b");
    let c = sealed_for("C", b"c");

    engine.decrypt("A", &a).unwrap();
    engine.decrypt("B", &b).unwrap();
    engine.decrypt("A", &a).unwrap();
    engine.decrypt("C", &c).unwrap();

    assert_eq!(engine.cache_size(), 2);
    assert!(engine.is_cached("A"));
    assert!(!engine.is_cached("B"));
    assert!(engine.is_cached("C"));
}

#[test]
fn zero_capacity_still_decrypts() {
    let engine = engine(0);
    let blob = sealed_for("A", b"a");
    assert_eq!(&*engine.decrypt("A", &blob).unwrap(), b"a");
    assert_eq!(engine.cache_size(), 0);
}

#[test]
fn chacha_engine_decrypts_chacha_blobs() {
    let engine = engine(4).with_suite(CipherSuite::ChaCha20Poly1305);
    assert_eq!(engine.suite(), CipherSuite::ChaCha20Poly1305);

    let key = derive_artifact_key(&MASTER, "A").unwrap();
    let blob = seal_with(CipherSuite::ChaCha20Poly1305, b"a", key.as_bytes()).unwrap();
    assert_eq!(&*engine.decrypt("A", blob.as_bytes()).unwrap(), b"a");
}

#[test]
fn from_password_matches_explicit_master_key() {
    let salt = [4u8; 16];
    let engine = DecryptionEngine::from_password("correct-horse", &salt).unwrap();
    let master = bytelock_crypto::derive_master_key("correct-horse", &salt).unwrap();

    let key = master.derive_artifact_key("A").unwrap();
    let blob = seal(b"a", key.as_bytes()).unwrap();
    assert_eq!(&*engine.decrypt("A", blob.as_bytes()).unwrap(), b"a");
}

// ── Errors ───────────────────────────────────────────────────────

#[test]
fn wrong_artifact_id_fails_with_id_attached() {
    let engine = engine(10);
    let blob = sealed_for("A", b"a");
    let err = engine.decrypt("B", &blob).unwrap_err();
    assert_eq!(
        err,
        DecryptionError::Cipher {
            artifact_id: "B".into(),
            source: CipherError::Authentication,
        }
    );
    assert!(!engine.is_cached("B"));
}

#[test]
fn short_blob_fails_as_malformed() {
    let engine = engine(10);
    let err = engine.decrypt("A", &[0u8; 5]).unwrap_err();
    assert!(matches!(
        err,
        DecryptionError::Cipher {
            source: CipherError::Malformed { .. },
            ..
        }
    ));
}

#[test]
fn empty_artifact_id_fails_in_derivation() {
    let engine = engine(10);
    let err = engine.decrypt("", &[0u8; 40]).unwrap_err();
    assert_eq!(err.artifact_id(), "");
    assert!(matches!(
        err,
        DecryptionError::KeyDerivation {
            source: KeyDerivationError::EmptyArtifactId,
            ..
        }
    ));
}

#[test]
fn debug_does_not_leak_master_key() {
    let dbg = format!("{:?}", engine(1));
    assert!(dbg.contains("DecryptionEngine"));
    assert!(!dbg.contains("17, 17"));
}

// ── Concurrency ──────────────────────────────────────────────────

#[test]
fn concurrent_decrypts_agree() {
    let engine = Arc::new(engine(8));
    let ids: Vec<String> = (0..16).map(|i| format!("com.example.C{i}")).collect();
    let blobs: Arc<Vec<(String, Vec<u8>)>> = Arc::new(
        ids.iter()
            .map(|id| (id.clone(), sealed_for(id, id.as_bytes())))
            .collect(),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let blobs = Arc::clone(&blobs);
            thread::spawn(move || {
                for round in 0..50 {
                    let (id, blob) = &blobs[(t + round) % blobs.len()];
                    let plaintext = engine.decrypt(id, blob).unwrap();
                    assert_eq!(&*plaintext, id.as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(engine.cache_size() <= 8);
}
