//! Response memoization cache
//!
//! Complete responses keyed by a digest of the normalized question and the
//! request flags. Entries expire lazily at lookup; when the store grows past
//! its capacity the oldest insertions are evicted. Lookups never reorder
//! entries, so this is insertion-order eviction rather than LRU.

use crate::text::normalize_question;
use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoFlags {
    pub execute: bool,
    pub debug: bool,
}

/// SHA-256 hex of `"{normalized}|execute={0|1}|debug={0|1}"`.
pub fn memo_key(question: &str, flags: MemoFlags) -> String {
    let raw = format!(
        "{}|execute={}|debug={}",
        normalize_question(question),
        u8::from(flags.execute),
        u8::from(flags.debug)
    );
    let digest = Sha256::digest(raw.as_bytes());
    format!("{:x}", digest)
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoLookup<V> {
    Hit { key: String, value: V, age: Duration },
    Miss { key: String },
}

impl<V> MemoLookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, MemoLookup::Hit { .. })
    }

    pub fn key(&self) -> &str {
        match self {
            MemoLookup::Hit { key, .. } | MemoLookup::Miss { key } => key,
        }
    }

    pub fn age_ms(&self) -> Option<u64> {
        match self {
            MemoLookup::Hit { age, .. } => Some(age.as_millis() as u64),
            MemoLookup::Miss { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct MemoEntry<V> {
    value: V,
    created_at: Instant,
}

pub struct ResponseCache<V> {
    entries: Mutex<LinkedHashMap<String, MemoEntry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<V> std::fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LinkedHashMap::new()),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, question: &str, flags: MemoFlags) -> MemoLookup<V> {
        self.get_at(question, flags, Instant::now())
    }

    pub fn put(&self, question: &str, flags: MemoFlags, value: V) {
        self.put_at(question, flags, value, Instant::now())
    }

    /// Lookup as of `now`. An entry older than the TTL is removed and
    /// reported as a miss.
    pub fn get_at(&self, question: &str, flags: MemoFlags, now: Instant) -> MemoLookup<V> {
        let key = memo_key(question, flags);
        let mut entries = self.lock();

        let age = match entries.get(&key) {
            Some(entry) => now.saturating_duration_since(entry.created_at),
            None => return MemoLookup::Miss { key },
        };

        if age > self.ttl {
            entries.remove(&key);
            return MemoLookup::Miss { key };
        }

        match entries.get(&key) {
            Some(entry) => MemoLookup::Hit {
                value: entry.value.clone(),
                key,
                age,
            },
            None => MemoLookup::Miss { key },
        }
    }

    /// Insert or overwrite as of `now`. An overwrite replaces the value and
    /// timestamp but keeps the key's original slot in eviction order.
    pub fn put_at(&self, question: &str, flags: MemoFlags, value: V, now: Instant) {
        let key = memo_key(question, flags);
        let mut entries = self.lock();

        match entries.get_mut(&key) {
            Some(entry) => {
                entry.value = value;
                entry.created_at = now;
            }
            None => {
                entries.insert(key, MemoEntry { value, created_at: now });
            }
        }

        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> ResponseCache<V> {
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LinkedHashMap<String, MemoEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXEC: MemoFlags = MemoFlags { execute: true, debug: false };
    const DRY: MemoFlags = MemoFlags { execute: false, debug: false };

    #[test]
    fn test_key_is_deterministic_and_flag_sensitive() {
        let q = "Quais os melhores vendedores?";
        assert_eq!(memo_key(q, EXEC), memo_key(q, EXEC));
        assert_ne!(memo_key(q, EXEC), memo_key(q, DRY));
        assert_ne!(
            memo_key(q, EXEC),
            memo_key(q, MemoFlags { execute: true, debug: true })
        );
        assert_eq!(memo_key(q, EXEC).len(), 64);
    }

    #[test]
    fn test_key_uses_normalized_question() {
        assert_eq!(
            memo_key("  Qual o TICKET médio? ", EXEC),
            memo_key("qual o ticket medio?", EXEC)
        );
    }

    #[test]
    fn test_hit_then_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(300), 10);
        let t0 = Instant::now();
        cache.put_at("q", EXEC, 42, t0);

        let before = cache.get_at("q", EXEC, t0 + Duration::from_millis(299_990));
        assert!(before.is_hit());
        assert_eq!(before.age_ms(), Some(299_990));

        let exactly = cache.get_at("q", EXEC, t0 + Duration::from_secs(300));
        assert!(exactly.is_hit());

        let after = cache.get_at("q", EXEC, t0 + Duration::from_millis(300_001));
        assert!(!after.is_hit());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_on_other_flags() {
        let cache = ResponseCache::default();
        cache.put("q", EXEC, "rows");
        assert!(!cache.get("q", DRY).is_hit());
        match cache.get("q", EXEC) {
            MemoLookup::Hit { value, .. } => assert_eq!(value, "rows"),
            MemoLookup::Miss { .. } => panic!("expected hit"),
        }
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", EXEC, 1);
        cache.put("b", EXEC, 2);
        // a lookup does not protect "a"
        assert!(cache.get("a", EXEC).is_hit());
        cache.put("c", EXEC, 3);

        assert_eq!(cache.len(), 2);
        assert!(!cache.get("a", EXEC).is_hit());
        assert!(cache.get("b", EXEC).is_hit());
        assert!(cache.get("c", EXEC).is_hit());
    }

    #[test]
    fn test_overwrite_keeps_insertion_slot() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", EXEC, 1);
        cache.put("b", EXEC, 2);
        cache.put("a", EXEC, 10);
        match cache.get("a", EXEC) {
            MemoLookup::Hit { key, value, .. } => {
                assert_eq!(key, memo_key("a", EXEC));
                assert_eq!(value, 10);
            }
            MemoLookup::Miss { .. } => panic!("expected hit"),
        }

        // "a" was inserted first, so it is still first out.
        cache.put("c", EXEC, 3);
        assert_eq!(cache.len(), 2);
        assert!(!cache.get("a", EXEC).is_hit());
        assert!(cache.get("b", EXEC).is_hit());
        assert!(cache.get("c", EXEC).is_hit());
    }

    #[test]
    fn test_overwrite_restarts_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        cache.put_at("a", EXEC, 1, t0);
        cache.put_at("a", EXEC, 2, t0 + Duration::from_secs(50));

        let lookup = cache.get_at("a", EXEC, t0 + Duration::from_secs(100));
        assert_eq!(lookup.age_ms(), Some(50_000));
    }
}
