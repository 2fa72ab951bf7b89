use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::analysis::AnalysisContent;
use crate::job::JobKey;
use crate::AnalyzerError;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
struct CacheEntry {
    content: AnalysisContent,
    /// Insertion sequence number; overwrites keep the original one
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<JobKey, CacheEntry>,
    /// Keys in insertion order with the sequence number they were inserted with
    order: VecDeque<(u64, JobKey)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe bounded cache of rendered analysis content, shared by all
/// batch workers.
///
/// Entries are evicted in insertion order once the capacity is reached and
/// reads never change that order. Entries, eviction order and counters sit
/// behind one mutex, so every operation is atomic with respect to the others.
#[derive(Debug)]
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                ..CacheInner::default()
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up cached content, counting a hit or a miss
    pub fn get(&self, key: &JobKey) -> Option<AnalysisContent> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key).map(|entry| entry.content.clone()) {
            Some(content) => {
                inner.hits += 1;
                Some(content)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Look up cached content without touching the hit/miss counters
    pub fn peek(&self, key: &JobKey) -> Option<AnalysisContent> {
        self.inner.lock().entries.get(key).map(|entry| entry.content.clone())
    }

    /// Check for a key without touching the hit/miss counters
    pub fn contains(&self, key: &JobKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Insert or overwrite an entry.
    ///
    /// A new key arriving at a full cache evicts the oldest-inserted entry
    /// first. Overwriting keeps the entry's place in the eviction order.
    pub fn put(&self, key: JobKey, content: AnalysisContent) -> Result<(), AnalyzerError> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.content = content;
            return Ok(());
        }

        if inner.entries.len() >= self.capacity {
            Self::evict_oldest(&mut inner)?;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((seq, key.clone()));
        inner.entries.insert(key, CacheEntry { content, seq });

        if inner.entries.len() != inner.order.len() {
            return Err(AnalyzerError::CacheCorruption(format!(
                "{} entries but {} keys in eviction order",
                inner.entries.len(),
                inner.order.len()
            )));
        }

        Ok(())
    }

    fn evict_oldest(inner: &mut CacheInner) -> Result<(), AnalyzerError> {
        let (seq, oldest) = inner.order.pop_front().ok_or_else(|| {
            AnalyzerError::CacheCorruption("cache is full but eviction order is empty".to_string())
        })?;

        match inner.entries.remove(&oldest) {
            Some(entry) if entry.seq == seq => {
                tracing::debug!(key = %oldest.fingerprint(), "Evicted oldest cache entry");
                Ok(())
            }
            Some(entry) => Err(AnalyzerError::CacheCorruption(format!(
                "entry {} has sequence {} but eviction order recorded {}",
                oldest.fingerprint(),
                entry.seq,
                seq
            ))),
            None => Err(AnalyzerError::CacheCorruption(format!(
                "eviction order references missing entry {}",
                oldest.fingerprint()
            ))),
        }
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisType;
    use std::sync::Arc;

    fn key(id: &str) -> JobKey {
        JobKey::new(id, AnalysisType::Summary)
    }

    fn text(content: Option<AnalysisContent>) -> Option<String> {
        content.map(|content| content.text)
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let cache = ResultCache::new(3);
        for i in 0..10 {
            cache.put(key(&format!("v{i}")), format!("t{i}").into()).unwrap();
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_first_inserted_is_evicted() {
        let cache = ResultCache::new(3);
        for id in ["a", "b", "c", "d"] {
            cache.put(key(id), id.to_uppercase().into()).unwrap();
        }
        assert!(!cache.contains(&key("a")));
        assert_eq!(text(cache.get(&key("b"))), Some("B".to_string()));
        assert_eq!(text(cache.get(&key("d"))), Some("D".to_string()));
    }

    #[test]
    fn test_get_does_not_refresh_eviction_order() {
        let cache = ResultCache::new(2);
        cache.put(key("a"), "A".into()).unwrap();
        cache.put(key("b"), "B".into()).unwrap();
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), "C".into()).unwrap();

        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
    }

    #[test]
    fn test_overwrite_keeps_size_and_position() {
        let cache = ResultCache::new(2);
        cache.put(key("a"), "v1".into()).unwrap();
        cache.put(key("b"), "B".into()).unwrap();
        cache.put(key("a"), "v2".into()).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(text(cache.get(&key("a"))), Some("v2".to_string()));

        // "a" is still the oldest insertion
        cache.put(key("c"), "C".into()).unwrap();
        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
    }

    #[test]
    fn test_same_video_different_analysis_are_distinct() {
        let cache = ResultCache::new(4);
        cache.put(JobKey::new("v", AnalysisType::Summary), "s".into()).unwrap();
        cache.put(JobKey::new("v", AnalysisType::FactCheck), "f".into()).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(text(cache.get(&JobKey::new("v", AnalysisType::FactCheck))), Some("f".into()));
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = ResultCache::new(5);
        cache.put(key("a"), "A".into()).unwrap();
        cache.get(&key("a"));
        cache.get(&key("a"));
        cache.get(&key("missing"));

        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 1,
                capacity: 5,
                hits: 2,
                misses: 1
            }
        );

        cache.clear();
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 0,
                capacity: 5,
                hits: 0,
                misses: 0
            }
        );
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = ResultCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(key("a"), "A".into()).unwrap();
        cache.put(key("b"), "B".into()).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key("b")));
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let cache = Arc::new(ResultCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let k = key(&format!("t{t}-{}", i % 40));
                        cache.put(k.clone(), format!("{t}:{i}").into()).unwrap();
                        cache.get(&k);
                        assert!(cache.len() <= 16);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.size, 16);
        assert_eq!(stats.hits + stats.misses, 8 * 200);
    }
}
