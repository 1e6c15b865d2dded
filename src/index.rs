//! The in-memory access index: one entry per cached blueprint, tracking
//! size, hit count, and insertion time, with the priority ordering GC walks
//! to decide what to evict.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

/// A single cache entry's bookkeeping. Unique by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    pub size: i64,
    pub hits: u64,
    pub inserted_at: SystemTime,
}

/// Thread-safe map from id to [`IndexEntry`], plus the eviction-priority
/// ordering GC consumes. Internal synchronization is a plain `Mutex`: every
/// operation here is O(1) or a full-table sort, never held across I/O.
#[derive(Default)]
pub struct Index {
    entries: Mutex<HashMap<String, IndexEntry>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `id`.
    pub fn add(&self, id: &str, size: i64, now: SystemTime) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            id.to_string(),
            IndexEntry {
                id: id.to_string(),
                size,
                hits: 0,
                inserted_at: now,
            },
        );
    }

    /// Increments `hits` for `id`. No-op if absent.
    pub fn hit(&self, id: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.hits += 1;
        }
    }

    /// Removes the entry for `id`, returning it if present.
    pub fn remove(&self, id: &str) -> Option<IndexEntry> {
        self.entries.lock().unwrap().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    /// Zeroes every entry's `hits`, leaving `size` and `inserted_at` intact.
    pub fn reset(&self) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.values_mut() {
            entry.hits = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An independent copy of every entry, usable without holding the
    /// index's lock.
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    /// Entries in eviction order: least-hit first, then oldest, then by id,
    /// the last criterion purely for determinism.
    pub fn priority_list(&self) -> Vec<IndexEntry> {
        let mut entries = self.snapshot();
        entries.sort_by(|a, b| {
            a.hits
                .cmp(&b.hits)
                .then(a.inserted_at.cmp(&b.inserted_at))
                .then(a.id.cmp(&b.id))
        });
        entries
    }

    /// Sum of every entry's recorded `size`.
    pub fn total_size(&self) -> i64 {
        self.entries.lock().unwrap().values().map(|e| e.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn add_then_hit_then_remove() {
        let index = Index::new();
        let now = SystemTime::now();
        index.add("a", 100, now);
        assert!(index.contains("a"));

        index.hit("a");
        index.hit("a");
        let snapshot = index.snapshot();
        assert_eq!(snapshot[0].hits, 2);

        let removed = index.remove("a").unwrap();
        assert_eq!(removed.size, 100);
        assert!(!index.contains("a"));
    }

    #[test]
    fn hit_on_missing_id_is_a_no_op() {
        let index = Index::new();
        index.hit("missing");
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn reset_zeroes_hits_but_keeps_size_and_insertion_time() {
        let index = Index::new();
        let now = SystemTime::now();
        index.add("a", 100, now);
        index.hit("a");
        index.reset();

        let entry = &index.snapshot()[0];
        assert_eq!(entry.hits, 0);
        assert_eq!(entry.size, 100);
        assert_eq!(entry.inserted_at, now);
    }

    #[test]
    fn priority_list_orders_by_hits_then_age_then_id() {
        let index = Index::new();
        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(1);

        index.add("B", 400, t0);
        index.hit("B");
        index.hit("B");
        index.add("A", 400, t0);
        index.add("C", 400, t1);

        let order: Vec<String> = index.priority_list().into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec!["A".to_string(), "C".to_string(), "B".to_string()]);
    }

    #[test]
    fn priority_list_is_stable_without_intervening_mutation() {
        let index = Index::new();
        let now = SystemTime::now();
        index.add("a", 1, now);
        index.add("b", 2, now);

        let first = index.priority_list();
        let second = index.priority_list();
        assert_eq!(first, second);
    }

    #[test]
    fn total_size_sums_every_entry() {
        let index = Index::new();
        let now = SystemTime::now();
        index.add("a", 100, now);
        index.add("b", 250, now);
        assert_eq!(index.total_size(), 350);
    }
}
