//! Load-time decryption of sealed artifacts with a bounded plaintext cache.
//!
//! The engine owns the master key. Each miss derives the artifact key,
//! unseals, and caches the plaintext under the artifact id. The cache lock is
//! held only for lookups and inserts, never across derivation or unsealing,
//! so loads of different artifacts proceed in parallel. Two threads missing
//! on the same id both compute; the later insert wins and both callers get
//! identical bytes.

use crate::cipher::{self, CipherSuite};
use crate::error::DecryptionError;
use crate::key::{derive_master_key, MasterKey};
use crate::KeyDerivationResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Default number of decrypted artifacts kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Decrypts sealed artifacts for one bundle.
pub struct DecryptionEngine {
    master_key: MasterKey,
    suite: CipherSuite,
    cache: Mutex<PlaintextCache>,
}

impl DecryptionEngine {
    /// Creates an engine with the default suite and cache capacity.
    pub fn new(master_key: MasterKey) -> Self {
        Self::with_capacity(master_key, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates an engine caching at most `capacity` artifacts. Zero disables caching.
    pub fn with_capacity(master_key: MasterKey, capacity: usize) -> Self {
        Self {
            master_key,
            suite: CipherSuite::default(),
            cache: Mutex::new(PlaintextCache::new(capacity)),
        }
    }

    /// Derives the master key from a password and salt, then builds an engine.
    pub fn from_password(password: &str, salt: &[u8]) -> KeyDerivationResult<Self> {
        Ok(Self::new(derive_master_key(password, salt)?))
    }

    /// Selects the cipher suite the artifacts were sealed with.
    #[must_use]
    pub fn with_suite(mut self, suite: CipherSuite) -> Self {
        self.suite = suite;
        self
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Returns the plaintext of `artifact_id`, unsealing `sealed` on a cache miss.
    ///
    /// On a hit `sealed` is not inspected.
    pub fn decrypt(&self, artifact_id: &str, sealed: &[u8]) -> Result<Arc<[u8]>, DecryptionError> {
        let cached = self.lock_cache().get(artifact_id);
        if let Some(plaintext) = cached {
            trace!(artifact = %artifact_id, "decrypt cache hit");
            return Ok(plaintext);
        }

        let key = self
            .master_key
            .derive_artifact_key(artifact_id)
            .map_err(|source| DecryptionError::KeyDerivation {
                artifact_id: artifact_id.to_string(),
                source,
            })?;

        let plaintext: Arc<[u8]> = cipher::unseal_with(self.suite, sealed, key.as_bytes())
            .map_err(|source| DecryptionError::Cipher {
                artifact_id: artifact_id.to_string(),
                source,
            })?
            .into();

        let evicted = self
            .lock_cache()
            .insert(artifact_id.to_string(), Arc::clone(&plaintext));
        if let Some(evicted) = evicted {
            debug!(artifact = %artifact_id, evicted = %evicted, "decrypt cache full, evicted least recently used");
        }

        Ok(plaintext)
    }

    /// Drops every cached plaintext.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Number of cached plaintexts.
    pub fn cache_size(&self) -> usize {
        self.lock_cache().len()
    }

    /// Maximum number of cached plaintexts.
    pub fn capacity(&self) -> usize {
        self.lock_cache().capacity
    }

    /// Whether `artifact_id` is currently cached.
    pub fn is_cached(&self, artifact_id: &str) -> bool {
        self.lock_cache().entries.contains_key(artifact_id)
    }

    // A panic while holding the lock cannot leave a half-written slot behind,
    // so a poisoned cache is still consistent.
    fn lock_cache(&self) -> MutexGuard<'_, PlaintextCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DecryptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionEngine")
            .field("suite", &self.suite)
            .field("cache_size", &self.cache_size())
            .finish_non_exhaustive()
    }
}

struct CacheSlot {
    plaintext: Arc<[u8]>,
    last_used: u64,
}

/// Least-recently-used map from artifact id to plaintext.
///
/// Recency is a monotonically increasing tick; eviction scans for the oldest
/// slot, which is linear in the capacity and only happens on an insert at
/// capacity.
struct PlaintextCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, CacheSlot>,
}

impl PlaintextCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tick: 0,
            entries: HashMap::new(),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn get(&mut self, id: &str) -> Option<Arc<[u8]>> {
        let tick = self.next_tick();
        let slot = self.entries.get_mut(id)?;
        slot.last_used = tick;
        Some(Arc::clone(&slot.plaintext))
    }

    /// Inserts `plaintext`, returning the id evicted to make room, if any.
    fn insert(&mut self, id: String, plaintext: Arc<[u8]>) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }

        let mut evicted = None;
        if !self.entries.contains_key(&id) && self.entries.len() >= self.capacity {
            evicted = self
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(oldest, _)| oldest.clone());
            if let Some(oldest) = &evicted {
                self.entries.remove(oldest);
            }
        }

        let last_used = self.next_tick();
        self.entries.insert(id, CacheSlot { plaintext, last_used });
        evicted
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = PlaintextCache::new(2);
        assert_eq!(cache.insert("a".into(), bytes("A")), None);
        assert_eq!(cache.insert("b".into(), bytes("B")), None);

        // Touch "a" so "b" becomes the oldest.
        assert!(cache.get("a").is_some());

        assert_eq!(cache.insert("c".into(), bytes("C")), Some("b".to_string()));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn reinserting_existing_id_does_not_evict() {
        let mut cache = PlaintextCache::new(2);
        cache.insert("a".into(), bytes("A"));
        cache.insert("b".into(), bytes("B"));
        assert_eq!(cache.insert("a".into(), bytes("A2")), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(&*cache.get("a").unwrap(), b"A2");
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut cache = PlaintextCache::new(0);
        assert_eq!(cache.insert("a".into(), bytes("A")), None);
        assert_eq!(cache.len(), 0);
    }
}
