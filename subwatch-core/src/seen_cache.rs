use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Default number of post identifiers remembered.
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct SeenEntries {
    members: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded set of recently seen post identifiers with FIFO eviction.
///
/// Deduplication is best effort: an identifier that reappears after
/// `capacity` newer distinct identifiers is treated as new again.
#[derive(Debug)]
pub struct SeenPostCache {
    capacity: usize,
    entries: Mutex<SeenEntries>,
}

impl SeenPostCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(SeenEntries {
                members: HashSet::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Returns `true` if `id` was already seen. Otherwise records it and returns `false`.
    pub fn check_and_add(&self, id: &str) -> bool {
        let mut entries = self.lock();
        if entries.members.contains(id) {
            return true;
        }

        entries.members.insert(id.to_string());
        entries.order.push_back(id.to_string());
        if entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.members.remove(&oldest);
            }
        }
        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, SeenEntries> {
        self.entries.lock().expect("seen post cache mutex poisoned")
    }
}

impl Default for SeenPostCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_first_sighting_is_new() {
        let cache = SeenPostCache::new(4);
        assert!(!cache.check_and_add("abc"));
        assert!(cache.check_and_add("abc"));
        assert!(cache.check_and_add("abc"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oldest_is_evicted_past_capacity() {
        let cache = SeenPostCache::new(3);
        for id in ["a", "b", "c", "d"] {
            assert!(!cache.check_and_add(id));
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        // Evicted, so it counts as new again and pushes out "b".
        assert!(!cache.check_and_add("a"));
        assert!(!cache.contains("b"));
        assert!(cache.check_and_add("d"));
    }

    #[test]
    fn test_repeat_hit_does_not_refresh_position() {
        let cache = SeenPostCache::new(2);
        cache.check_and_add("a");
        cache.check_and_add("b");
        assert!(cache.check_and_add("a"));
        cache.check_and_add("c");
        // Strict insertion order: "a" goes first even though it was hit last.
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = SeenPostCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(!cache.check_and_add("a"));
        assert!(cache.check_and_add("a"));
    }

    #[test]
    fn test_default_capacity() {
        let cache = SeenPostCache::default();
        assert_eq!(cache.capacity(), DEFAULT_SEEN_CAPACITY);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_one() {
        let cache = Arc::new(SeenPostCache::new(100));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if !cache.check_and_add("same-post") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
