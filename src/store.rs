//! Keyed in-memory entity stores.
//!
//! Each entity kind (member, group, round, transaction) lives in its own
//! [`Store`], keyed by primary id. Mutations go through [`Store::update`],
//! which runs the closure while holding the entry's shard guard: concurrent
//! writers targeting the same key are serialized, so a read-modify-write on
//! one round can neither double-count nor lose the completion edge.
//!
//! Update closures must be synchronous and must not touch another store
//! (lock ordering is caller responsibility; services mutate one entity per
//! closure and sequence cross-entity effects after the guard drops).

use std::fmt::Display;
use std::hash::Hash;

use dashmap::DashMap;

use crate::error::{CoreError, CoreResult};

pub struct Store<K, V> {
    entity: &'static str,
    map: DashMap<K, V>,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    /// `entity` names the record kind for NotFound/Conflict messages.
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            map: DashMap::new(),
        }
    }

    /// Insert a new record. Rejects duplicate keys.
    pub fn insert(&self, key: K, value: V) -> CoreResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.map.entry(key) {
            Entry::Occupied(e) => Err(CoreError::conflict(format!(
                "{} {} already exists",
                self.entity,
                e.key()
            ))),
            Entry::Vacant(e) => {
                e.insert(value);
                Ok(())
            }
        }
    }

    /// Fetch a snapshot of a record.
    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|r| r.value().clone())
    }

    /// Fetch a snapshot or fail with NotFound.
    pub fn require(&self, key: &K) -> CoreResult<V> {
        self.get(key)
            .ok_or_else(|| CoreError::not_found(format!("{} {}", self.entity, key)))
    }

    /// Serialized read-modify-write on one record.
    ///
    /// The closure runs under the entry guard and must not await or take
    /// other store locks. An Err return leaves whatever the closure already
    /// wrote, so closures validate before mutating.
    pub fn update<T>(&self, key: &K, f: impl FnOnce(&mut V) -> CoreResult<T>) -> CoreResult<T> {
        let mut entry = self
            .map
            .get_mut(key)
            .ok_or_else(|| CoreError::not_found(format!("{} {}", self.entity, key)))?;
        f(entry.value_mut())
    }

    /// Snapshot every record matching the predicate.
    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.map
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
