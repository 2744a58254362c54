//! Key/value record storage for catalog, delivery, cart and purchase records.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Keyed record store.
///
/// `update` runs its closure under the write lock, which is what makes
/// check-then-set sequences (e.g. approving a delivery) atomic.
pub trait Repository<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn upsert(&self, key: K, value: V);
    /// Insert only if `key` is vacant. Returns `false` when it was taken.
    fn insert_if_absent(&self, key: K, value: V) -> bool;
    /// Insert unless `key` is taken or an existing record `clashes` with
    /// `value`, checked and written under one write lock. Returns the first
    /// clashing record; a poisoned store hands `value` back.
    fn insert_unless(&self, key: K, value: V, clashes: &mut dyn FnMut(&V) -> bool) -> Result<(), V>;
    /// All values, ordered by key.
    fn list(&self) -> Vec<V>;
    fn remove(&self, key: &K) -> Option<V>;
    /// Mutate a record in place. Returns `false` when `key` is absent.
    fn update(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> bool;
    /// Like `update`, but starts from `init()` when `key` is absent.
    fn upsert_with(&self, key: K, init: &mut dyn FnMut() -> V, f: &mut dyn FnMut(&mut V));
}

impl<K, V, S> Repository<K, V> for Arc<S>
where
    S: Repository<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn upsert(&self, key: K, value: V) {
        (**self).upsert(key, value)
    }

    fn insert_if_absent(&self, key: K, value: V) -> bool {
        (**self).insert_if_absent(key, value)
    }

    fn insert_unless(&self, key: K, value: V, clashes: &mut dyn FnMut(&V) -> bool) -> Result<(), V> {
        (**self).insert_unless(key, value, clashes)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }

    fn remove(&self, key: &K) -> Option<V> {
        (**self).remove(key)
    }

    fn update(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> bool {
        (**self).update(key, f)
    }

    fn upsert_with(&self, key: K, init: &mut dyn FnMut() -> V, f: &mut dyn FnMut(&mut V)) {
        (**self).upsert_with(key, init, f)
    }
}

/// In-memory store for tests/dev and the default backend for non-ledger records.
#[derive(Debug)]
pub struct InMemoryRepository<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> InMemoryRepository<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRepository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Repository<K, V> for InMemoryRepository<K, V>
where
    K: Clone + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    fn upsert(&self, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key, value);
        }
    }

    fn insert_if_absent(&self, key: K, value: V) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value);
        true
    }

    fn insert_unless(&self, key: K, value: V, clashes: &mut dyn FnMut(&V) -> bool) -> Result<(), V> {
        let Ok(mut map) = self.inner.write() else {
            return Err(value);
        };
        if let Some(existing) = map.get(&key).or_else(|| map.values().find(|v| clashes(v))) {
            return Err(existing.clone());
        }
        map.insert(key, value);
        Ok(())
    }

    fn list(&self) -> Vec<V> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().ok()?.remove(key)
    }

    fn update(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        match map.get_mut(key) {
            Some(v) => {
                f(v);
                true
            }
            None => false,
        }
    }

    fn upsert_with(&self, key: K, init: &mut dyn FnMut() -> V, f: &mut dyn FnMut(&mut V)) {
        if let Ok(mut map) = self.inner.write() {
            f(map.entry(key).or_insert_with(|| init()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let repo: InMemoryRepository<u32, &'static str> = InMemoryRepository::new();
        assert!(repo.insert_if_absent(1, "a"));
        assert!(!repo.insert_if_absent(1, "b"));
        assert_eq!(repo.get(&1), Some("a"));
    }

    #[test]
    fn insert_unless_reports_the_clashing_record() {
        let repo: InMemoryRepository<u32, &'static str> = InMemoryRepository::new();
        assert_eq!(repo.insert_unless(1, "ana", &mut |v| *v == "ana"), Ok(()));
        assert_eq!(repo.insert_unless(2, "ana", &mut |v| *v == "ana"), Err("ana"));
        assert_eq!(repo.list(), vec!["ana"]);
    }

    #[test]
    fn update_and_upsert_with() {
        let repo: InMemoryRepository<u32, u32> = InMemoryRepository::new();
        assert!(!repo.update(&7, &mut |v| *v += 1));

        repo.upsert_with(7, &mut || 10, &mut |v| *v += 1);
        repo.upsert_with(7, &mut || 10, &mut |v| *v += 1);
        assert_eq!(repo.get(&7), Some(12));

        assert!(repo.update(&7, &mut |v| *v = 0));
        assert_eq!(repo.list(), vec![0]);
        assert_eq!(repo.remove(&7), Some(0));
        assert!(repo.list().is_empty());
    }
}
