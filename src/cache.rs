//! Concurrent memoization of frequently rebuilt handle shapes.
//!
//! A [`ShapeCache`] maps a structural key (usually a [`Type`](crate::signature::Type)
//! or a [`Signature`](crate::signature::Signature)) to a value built on
//! first use. It is safe to share between threads:
//!
//! - lookups take a read lock and never observe a partially built entry,
//!   because entries are only published once fully constructed;
//! - a miss builds the value outside the lock, then inserts it only if the
//!   key is still absent, so racing builders agree on the first value.
//!
//! Entries are never invalidated.
//!
//! # Examples
//!
//! ```rust
//! use callgraft::cache::ShapeCache;
//!
//! let cache: ShapeCache<u32, String> = ShapeCache::new();
//! let first = cache.get_or_insert_with(1, || "one".to_string());
//! let second = cache.get_or_insert_with(1, || "uno".to_string());
//! assert_eq!(first, "one");
//! assert_eq!(second, "one");
//! assert_eq!(cache.len(), 1);
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// A thread-safe insert-if-absent table.
pub struct ShapeCache<K, V> {
    entries: RwLock<FxHashMap<K, V>>,
}

impl<K, V> ShapeCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the cached value for `key`, building and publishing it with
    /// `build` on a miss.
    ///
    /// If another thread publishes a value for `key` while `build` runs,
    /// that value wins and the freshly built one is discarded.
    pub fn get_or_insert_with<F>(&self, key: K, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        let built = build();
        self.entries.write().entry(key).or_insert(built).clone()
    }

    /// Like [`ShapeCache::get_or_insert_with`], for builders that may fail.
    /// Failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns the error of `build`.
    pub fn try_get_or_insert_with<F, E>(&self, key: K, build: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(existing) = self.get(&key) {
            return Ok(existing);
        }
        let built = build()?;
        Ok(self.entries.write().entry(key).or_insert(built).clone())
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> Default for ShapeCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ShapeCache<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ShapeCache")
            .field("len", &self.entries.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_failure_is_not_cached() {
        let cache: ShapeCache<&str, i32> = ShapeCache::new();
        let failed: Result<i32, &str> = cache.try_get_or_insert_with("key", || Err("nope"));
        assert_eq!(failed, Err("nope"));
        assert!(cache.is_empty());
        assert_eq!(cache.try_get_or_insert_with::<_, &str>("key", || Ok(3)), Ok(3));
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let cache: Arc<ShapeCache<u8, usize>> = Arc::new(ShapeCache::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    cache.get_or_insert_with(0, || counter.fetch_add(1, Ordering::SeqCst))
                })
            })
            .collect();
        let results: Vec<usize> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        let published = cache.get(&0).unwrap();
        assert!(results.iter().all(|result| *result == published));
        assert_eq!(cache.len(), 1);
    }
}
