#![forbid(unsafe_code)]

//! Observable key-value map.
//!
//! [`ObservableMap<K, V>`] owns a `HashMap<K, V>`. Item events carry
//! `(key, value)` pairs.
//!
//! # Add vs. upsert
//!
//! | Call                 | Key absent          | Key present                  |
//! |----------------------|---------------------|------------------------------|
//! | `add(k, v)`          | insert, `Added`     | `Err(DuplicateKey)`, no event |
//! | `set(k, v)`          | insert, `Added`     | replace, `Updated`           |
//! | `remove(&k)`         | `false`, no event   | remove, `Removed`            |
//! | `try_get(&k)`        | `Err(KeyNotFound)`  | `Ok(v)`                      |
//!
//! `set` is the upsert path and never fails. It reports `Updated` whenever
//! the key was present, even if the new value equals the old one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use tracing::debug;

use crate::error::{ObservableError, Result};
use crate::event::{ChangeKind, CollectionChangeEvent, ItemChangeEvent};
use crate::listener::{ChangeChannels, Subscription};

const SOURCE: &str = "map";

struct MapInner<K, V> {
    entries: HashMap<K, V>,
    version: u64,
    channels: ChangeChannels<(K, V), CollectionChangeEvent<ObservableMap<K, V>>>,
}

/// A shared, change-notifying map.
///
/// Cloning creates another handle to the same storage and listeners.
pub struct ObservableMap<K, V> {
    inner: Rc<RefCell<MapInner<K, V>>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableMap")
            .field("entries", &inner.entries)
            .field("version", &inner.version)
            .field("item_listeners", &inner.channels.items.len())
            .field("collection_listeners", &inner.channels.collection.len())
            .finish()
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// Later pairs overwrite earlier ones with the same key.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(HashMap::with_capacity(capacity))
    }

    /// Take ownership of `entries` as the backing storage.
    #[must_use]
    pub fn from_map(entries: HashMap<K, V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapInner {
                entries,
                version: 0,
                channels: ChangeChannels::default(),
            })),
        }
    }

    // --- reads -------------------------------------------------------------

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Clone of the value for `key`, if present.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Clone of the value for `key`; [`ObservableError::KeyNotFound`] if
    /// absent.
    pub fn try_get<Q>(&self, key: &Q) -> Result<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or_else(|| {
            debug!(container = SOURCE, "try_get: key not found");
            ObservableError::KeyNotFound
        })
    }

    /// Keys in the map's current enumeration order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Values in the map's current enumeration order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.inner.borrow().entries.values().cloned().collect()
    }

    /// `(key, value)` pairs in the map's current enumeration order.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Read the backing storage without copying.
    ///
    /// Do not mutate this map from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        f(&self.inner.borrow().entries)
    }

    /// Increments once per state-changing call.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    // --- mutations ---------------------------------------------------------

    /// Insert a new entry. Fails with [`ObservableError::DuplicateKey`],
    /// leaving the existing entry untouched, if `key` is already present.
    pub fn add(&self, key: K, value: V) -> Result<()> {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.contains_key(&key) {
                debug!(container = SOURCE, "add: duplicate key");
                return Err(ObservableError::DuplicateKey);
            }
            inner.entries.insert(key.clone(), value.clone());
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::new(ChangeKind::Added, (key, value))])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        Ok(())
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Emits `Updated` if the key was present and `Added` otherwise, then one
    /// collection event. Returns the kind that was emitted.
    pub fn set(&self, key: K, value: V) -> ChangeKind {
        let (pending, kind) = {
            let mut inner = self.inner.borrow_mut();
            let kind = match inner.entries.insert(key.clone(), value.clone()) {
                Some(_) => ChangeKind::Updated,
                None => ChangeKind::Added,
            };
            inner.version += 1;
            let pending = inner
                .channels
                .prepare(vec![ItemChangeEvent::new(kind, (key, value))]);
            (pending, kind)
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        kind
    }

    /// Remove the entry for `key`. Returns `false`, emitting nothing, if it
    /// was absent. The `Removed` event carries the removed pair.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let Some(pair) = inner.entries.remove_entry(key) else {
                return false;
            };
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::new(ChangeKind::Removed, pair)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        true
    }

    /// Remove every entry.
    ///
    /// Emits one `Removed` event per former entry, in the pre-clear
    /// enumeration order, then one collection event. Clearing an empty map
    /// emits nothing.
    pub fn clear(&self) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.is_empty() {
                return;
            }
            let removed = std::mem::take(&mut inner.entries);
            inner.version += 1;
            let events = removed
                .into_iter()
                .map(|pair| ItemChangeEvent::new(ChangeKind::Removed, pair))
                .collect();
            inner.channels.prepare(events)
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
    }

    /// Emit a collection event without changing anything.
    pub fn refresh(&self) {
        let pending = self.inner.borrow_mut().channels.prepare(Vec::new());
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
    }

    // --- subscriptions -----------------------------------------------------

    /// Listen for per-entry changes.
    pub fn subscribe_items(
        &self,
        callback: impl Fn(&ItemChangeEvent<(K, V)>) + 'static,
    ) -> Subscription {
        self.inner.borrow_mut().channels.items.subscribe(callback)
    }

    /// Listen for whole-map changes.
    pub fn subscribe_collection(
        &self,
        callback: impl Fn(&CollectionChangeEvent<ObservableMap<K, V>>) + 'static,
    ) -> Subscription {
        self.inner.borrow_mut().channels.collection.subscribe(callback)
    }

    /// Registered item listeners (including dead ones not yet pruned).
    #[must_use]
    pub fn item_subscriber_count(&self) -> usize {
        self.inner.borrow().channels.items.len()
    }

    /// Registered collection listeners (including dead ones not yet pruned).
    #[must_use]
    pub fn collection_subscriber_count(&self) -> usize {
        self.inner.borrow().channels.collection.len()
    }
}
