//! Bounded least-recently-used result cache.

use std::collections::HashMap;
use std::hash::Hash;

/// Bounded LRU map.
///
/// Recency is a monotonic touch counter per entry; eviction scans for the
/// smallest counter. The scan is O(capacity), which is fine at the
/// capacities used here (default 50) and keeps the structure a plain map.
#[derive(Debug)]
pub struct LruCache<K, V> {
  entries: HashMap<K, Entry<V>>,
  capacity: usize,
  clock: u64,
}

#[derive(Debug)]
struct Entry<V> {
  value: V,
  touched: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
  /// Panics if `capacity` is zero — a zero-capacity cache is a programming
  /// error, not a runtime condition.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "cache capacity must be greater than 0");
    Self { entries: HashMap::with_capacity(capacity), capacity, clock: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Existence check. Does not touch recency.
  pub fn contains(&self, key: &K) -> bool {
    self.entries.contains_key(key)
  }

  /// Fetch a value and promote its key to most-recently-used.
  pub fn get(&mut self, key: &K) -> Option<&V> {
    self.clock += 1;
    let clock = self.clock;
    match self.entries.get_mut(key) {
      Some(entry) => {
        entry.touched = clock;
        Some(&entry.value)
      }
      None => None,
    }
  }

  /// Insert or replace a value. Inserting past capacity evicts exactly one
  /// entry: the one touched longest ago.
  pub fn insert(&mut self, key: K, value: V) {
    self.clock += 1;
    if let Some(entry) = self.entries.get_mut(&key) {
      entry.value = value;
      entry.touched = self.clock;
      return;
    }
    if self.entries.len() >= self.capacity
      && let Some(oldest) = self.entries.iter().min_by_key(|(_, e)| e.touched).map(|(k, _)| k.clone())
    {
      self.entries.remove(&oldest);
    }
    self.entries.insert(key, Entry { value, touched: self.clock });
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
