#![forbid(unsafe_code)]

//! Observable unique-element set.
//!
//! [`ObservableSet<T>`] owns a `HashSet<T>`. Membership uses `T`'s
//! `Eq + Hash`. Sets have no positional or key identity, so there is no
//! update operation: replacing an element is a `remove` followed by an
//! `add`, and emits both events.
//!
//! Enumeration order is unspecified and may change across mutations, but a
//! single read (`to_vec`, `with`, an encode) sees one consistent order.
//!
//! # Invariants
//!
//! 1. No two members are equal.
//! 2. `add` of a present element and `remove` of an absent one return
//!    `false` and emit nothing.
//! 3. Batch calls emit one item event per affected element and one
//!    collection event.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::event::{ChangeKind, CollectionChangeEvent, ItemChangeEvent};
use crate::listener::{ChangeChannels, Subscription};

const SOURCE: &str = "set";

struct SetInner<T> {
    items: HashSet<T>,
    version: u64,
    channels: ChangeChannels<T, CollectionChangeEvent<ObservableSet<T>>>,
}

/// A shared, change-notifying set.
///
/// Cloning creates another handle to the same storage and listeners.
pub struct ObservableSet<T> {
    inner: Rc<RefCell<SetInner<T>>>,
}

impl<T> Clone for ObservableSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableSet")
            .field("items", &inner.items)
            .field("version", &inner.version)
            .field("item_listeners", &inner.channels.items.len())
            .field("collection_listeners", &inner.channels.collection.len())
            .finish()
    }
}

impl<T: Eq + Hash + Clone + 'static> Default for ObservableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone + 'static> FromIterator<T> for ObservableSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}

impl<T: Eq + Hash + Clone + 'static> ObservableSet<T> {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_set(HashSet::new())
    }

    /// Empty set with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_set(HashSet::with_capacity(capacity))
    }

    /// Take ownership of `items` as the backing storage.
    #[must_use]
    pub fn from_set(items: HashSet<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SetInner {
                items,
                version: 0,
                channels: ChangeChannels::default(),
            })),
        }
    }

    // --- reads -------------------------------------------------------------

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Whether `item` is a member.
    #[must_use]
    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.borrow().items.contains(item)
    }

    /// Members in the set's current enumeration order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().items.iter().cloned().collect()
    }

    /// Read the backing storage without copying.
    ///
    /// Do not mutate this set from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&HashSet<T>) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Increments once per state-changing call.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    // --- mutations ---------------------------------------------------------

    /// Insert `item`. Returns `false`, emitting nothing, if it was already a
    /// member.
    pub fn add(&self, item: T) -> bool {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if !inner.items.insert(item.clone()) {
                return false;
            }
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::new(ChangeKind::Added, item)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        true
    }

    /// Insert every element of `items` that is not yet a member.
    ///
    /// Emits one `Added` event per newly inserted element, in iteration
    /// order, then one collection event. Returns how many were inserted;
    /// zero means nothing was emitted.
    pub fn add_range(&self, items: impl IntoIterator<Item = T>) -> usize {
        // Drain the input before borrowing: it may read this set.
        let items: Vec<T> = items.into_iter().collect();
        let (pending, inserted) = {
            let mut inner = self.inner.borrow_mut();
            let events: Vec<_> = items
                .into_iter()
                .filter(|item| inner.items.insert(item.clone()))
                .map(|item| ItemChangeEvent::new(ChangeKind::Added, item))
                .collect();
            if events.is_empty() {
                return 0;
            }
            inner.version += 1;
            let inserted = events.len();
            (inner.channels.prepare(events), inserted)
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        inserted
    }

    /// Remove `item`. Returns `false`, emitting nothing, if it was absent.
    pub fn remove<Q>(&self, item: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let Some(removed) = inner.items.take(item) else {
                return false;
            };
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::new(ChangeKind::Removed, removed)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        true
    }

    /// Remove every member.
    ///
    /// Emits one `Removed` event per former member, in the pre-clear
    /// enumeration order, then one collection event. Clearing an empty set
    /// emits nothing.
    pub fn clear(&self) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.items.is_empty() {
                return;
            }
            let removed = std::mem::take(&mut inner.items);
            inner.version += 1;
            let events = removed
                .into_iter()
                .map(|item| ItemChangeEvent::new(ChangeKind::Removed, item))
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

    /// Listen for per-element changes.
    pub fn subscribe_items(
        &self,
        callback: impl Fn(&ItemChangeEvent<T>) + 'static,
    ) -> Subscription {
        self.inner.borrow_mut().channels.items.subscribe(callback)
    }

    /// Listen for whole-set changes.
    pub fn subscribe_collection(
        &self,
        callback: impl Fn(&CollectionChangeEvent<ObservableSet<T>>) + 'static,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Log<T> = Rc<RefCell<Vec<(ChangeKind, T)>>>;

    fn record<T: Eq + Hash + Clone + 'static>(
        set: &ObservableSet<T>,
    ) -> (Log<T>, Rc<Cell<u32>>, Vec<Subscription>) {
        let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
        let collections = Rc::new(Cell::new(0u32));
        let l = Rc::clone(&log);
        let c = Rc::clone(&collections);
        let subs = vec![
            set.subscribe_items(move |e| {
                assert_eq!(e.index, None);
                l.borrow_mut().push((e.kind, e.element.clone()));
            }),
            set.subscribe_collection(move |_| c.set(c.get() + 1)),
        ];
        (log, collections, subs)
    }

    #[test]
    fn add_remove_scenario() {
        let set = ObservableSet::<i32>::new();
        let (log, collections, _subs) = record(&set);

        assert!(set.add(5));
        assert_eq!(*log.borrow(), vec![(ChangeKind::Added, 5)]);
        assert_eq!(collections.get(), 1);

        assert!(!set.add(5));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(collections.get(), 1);

        assert!(set.remove(&5));
        assert_eq!(log.borrow()[1], (ChangeKind::Removed, 5));
        assert_eq!(collections.get(), 2);

        assert!(!set.remove(&5));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(collections.get(), 2);
        assert_eq!(set.version(), 2);
    }

    #[test]
    fn replace_is_remove_then_add() {
        let set: ObservableSet<String> = ["old".to_string()].into_iter().collect();
        let (log, collections, _subs) = record(&set);

        assert!(set.remove("old"));
        assert!(set.add("new".to_string()));
        assert_eq!(
            *log.borrow(),
            vec![
                (ChangeKind::Removed, "old".to_string()),
                (ChangeKind::Added, "new".to_string()),
            ]
        );
        assert_eq!(collections.get(), 2);
    }

    #[test]
    fn add_range_skips_members() {
        let set: ObservableSet<u8> = [1, 2].into_iter().collect();
        let (log, collections, _subs) = record(&set);

        assert_eq!(set.add_range([2, 3, 3, 4]), 2);
        assert_eq!(
            *log.borrow(),
            vec![(ChangeKind::Added, 3), (ChangeKind::Added, 4)]
        );
        assert_eq!(collections.get(), 1);

        assert_eq!(set.add_range([1, 4]), 0);
        assert_eq!(collections.get(), 1);
    }

    #[test]
    fn add_range_filtered_by_own_membership() {
        let set: ObservableSet<u8> = [1, 3].into_iter().collect();
        let (log, collections, _subs) = record(&set);
        let members = set.clone();

        let inserted = set.add_range((0..5).filter(|v| !members.contains(v)));
        assert_eq!(inserted, 3);
        assert_eq!(
            *log.borrow(),
            vec![
                (ChangeKind::Added, 0),
                (ChangeKind::Added, 2),
                (ChangeKind::Added, 4),
            ]
        );
        assert_eq!(collections.get(), 1);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn clear_batches_and_empty_clear_is_silent() {
        let set: ObservableSet<u8> = [1, 2, 3].into_iter().collect();
        let before = set.to_vec();
        let (log, collections, _subs) = record(&set);

        set.clear();
        let removed: Vec<u8> = log.borrow().iter().map(|(_, v)| *v).collect();
        assert_eq!(removed, before);
        assert!(log.borrow().iter().all(|(k, _)| *k == ChangeKind::Removed));
        assert_eq!(collections.get(), 1);

        set.clear();
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(collections.get(), 1);
    }

    #[test]
    fn enumeration_is_stable_without_mutation() {
        let set: ObservableSet<u32> = (0..64).collect();
        assert_eq!(set.to_vec(), set.to_vec());
    }

    #[test]
    fn collection_event_reads_live_set() {
        let set = ObservableSet::new();
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sc = Rc::clone(&sizes);
        let _sub =
            set.subscribe_collection(move |e: &CollectionChangeEvent<ObservableSet<u8>>| {
                sc.borrow_mut().push(e.container().len());
            });

        set.add(1);
        set.add(2);
        assert_eq!(*sizes.borrow(), vec![1, 2]);
        assert!(set.contains(&2));
        assert_eq!(set.with(HashSet::len), 2);
    }

    #[test]
    fn refresh_emits_collection_only() {
        let set: ObservableSet<u8> = [1].into_iter().collect();
        let (log, collections, _subs) = record(&set);
        set.refresh();
        assert!(log.borrow().is_empty());
        assert_eq!(collections.get(), 1);
    }
}
