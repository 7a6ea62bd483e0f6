#![forbid(unsafe_code)]

//! Observable ordered sequence.
//!
//! [`ObservableSequence<T>`] owns a `Vec<T>` and reports every change to two
//! channels: per-element [`ItemChangeEvent`]s (with the element's index) and
//! one [`CollectionChangeEvent`] per state-changing call.
//!
//! # Invariants
//!
//! 1. Valid indices are `0..len` (`0..=len` for `insert`). Anything else is
//!    [`ObservableError::OutOfRange`]; nothing is clamped, and nothing is
//!    emitted.
//! 2. Batch calls (`add_range`, `clear`) emit one item event per element and
//!    exactly one collection event.
//! 3. Calls that change nothing (`set` to an equal value, `remove` of an
//!    absent element, `clear` on an empty sequence, `add_range` of nothing)
//!    emit nothing and leave the version alone.
//! 4. The storage borrow is released before listeners run; listeners may
//!    read or mutate the sequence through the event's handle.
//!
//! # Example
//!
//! ```
//! use ftui_observable::{ChangeKind, ObservableSequence};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let seq = ObservableSequence::<&str>::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&log);
//! let _sub = seq.subscribe_items(move |e| sink.borrow_mut().push((e.kind, e.element)));
//!
//! seq.add_range(["a", "b"]);
//! assert_eq!(
//!     *log.borrow(),
//!     vec![(ChangeKind::Added, "a"), (ChangeKind::Added, "b")]
//! );
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::equality::Comparer;
use crate::error::{ObservableError, Result};
use crate::event::{ChangeKind, CollectionChangeEvent, ItemChangeEvent};
use crate::listener::{ChangeChannels, Subscription};

const SOURCE: &str = "sequence";

struct SequenceInner<T> {
    items: Vec<T>,
    version: u64,
    comparer: Comparer<T>,
    channels: ChangeChannels<T, CollectionChangeEvent<ObservableSequence<T>>>,
}

/// A shared, change-notifying ordered sequence.
///
/// Cloning creates another handle to the same storage and listeners.
pub struct ObservableSequence<T> {
    inner: Rc<RefCell<SequenceInner<T>>>,
}

impl<T> Clone for ObservableSequence<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableSequence")
            .field("items", &inner.items)
            .field("version", &inner.version)
            .field("item_listeners", &inner.channels.items.len())
            .field("collection_listeners", &inner.channels.collection.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> FromIterator<T> for ObservableSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone + PartialEq + 'static> ObservableSequence<T> {
    /// Empty sequence compared by `T`'s `PartialEq`.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Empty sequence with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Take ownership of `items` as the backing storage.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::with_comparer(items, Comparer::natural())
    }
}

impl<T: Clone + 'static> ObservableSequence<T> {
    /// Take ownership of `items`, comparing elements with `comparer`.
    #[must_use]
    pub fn with_comparer(items: Vec<T>, comparer: Comparer<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SequenceInner {
                items,
                version: 0,
                comparer,
                channels: ChangeChannels::default(),
            })),
        }
    }

    // --- reads -------------------------------------------------------------

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Clone of the element at `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        let inner = self.inner.borrow();
        inner.items.get(index).cloned().ok_or_else(|| {
            debug!(container = SOURCE, index, len = inner.items.len(), "get out of range");
            ObservableError::OutOfRange {
                index,
                len: inner.items.len(),
            }
        })
    }

    /// Index of the first element equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        let inner = self.inner.borrow();
        inner
            .items
            .iter()
            .position(|x| inner.comparer.equals(x, item))
    }

    /// Whether some element equals `item`.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Copy of the current contents, in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    /// Read the backing storage without copying.
    ///
    /// Do not mutate this sequence from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Increments once per state-changing call.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    // --- mutations ---------------------------------------------------------

    /// Append `item`.
    pub fn add(&self, item: T) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let index = inner.items.len();
            inner.items.push(item.clone());
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::at(ChangeKind::Added, item, index)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
    }

    /// Append every element of `items`, in iteration order.
    ///
    /// Emits one `Added` item event per element, then a single collection
    /// event. Appending nothing emits nothing.
    pub fn add_range(&self, items: impl IntoIterator<Item = T>) {
        // Drain the input before borrowing: it may read this sequence.
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let start = inner.items.len();
            let events = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    ItemChangeEvent::at(ChangeKind::Added, item.clone(), start + i)
                })
                .collect();
            inner.items.extend(items);
            inner.version += 1;
            inner.channels.prepare(events)
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
    }

    /// Insert `item` before position `index` (`index == len` appends).
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index > len {
                debug!(container = SOURCE, index, len, "insert out of range");
                return Err(ObservableError::OutOfRange { index, len });
            }
            inner.items.insert(index, item.clone());
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::at(ChangeKind::Added, item, index)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        Ok(())
    }

    /// Remove the first element equal to `item`.
    ///
    /// Returns `false`, emitting nothing, when no element matches.
    pub fn remove(&self, item: &T) -> bool {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let Some(index) = inner
                .items
                .iter()
                .position(|x| inner.comparer.equals(x, item))
            else {
                return false;
            };
            let removed = inner.items.remove(index);
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::at(ChangeKind::Removed, removed, index)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        true
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let (pending, removed) = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index >= len {
                debug!(container = SOURCE, index, len, "remove_at out of range");
                return Err(ObservableError::OutOfRange { index, len });
            }
            let removed = inner.items.remove(index);
            inner.version += 1;
            let pending = inner.channels.prepare(vec![ItemChangeEvent::at(
                ChangeKind::Removed,
                removed.clone(),
                index,
            )]);
            (pending, removed)
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        Ok(removed)
    }

    /// Replace the element at `index` with `value`.
    ///
    /// If the current element equals `value` this is a no-op. Otherwise one
    /// `Updated` event carrying the new value and its index is emitted.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index >= len {
                debug!(container = SOURCE, index, len, "set out of range");
                return Err(ObservableError::OutOfRange { index, len });
            }
            if inner.comparer.equals(&inner.items[index], &value) {
                return Ok(());
            }
            inner.items[index] = value.clone();
            inner.version += 1;
            inner
                .channels
                .prepare(vec![ItemChangeEvent::at(ChangeKind::Updated, value, index)])
        };
        pending.dispatch(SOURCE, CollectionChangeEvent::new(self.clone()));
        Ok(())
    }

    /// Remove every element.
    ///
    /// Emits one `Removed` event per former element, in former order, then
    /// one collection event. Clearing an empty sequence emits nothing.
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
                .enumerate()
                .map(|(i, item)| ItemChangeEvent::at(ChangeKind::Removed, item, i))
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

    /// Listen for whole-sequence changes.
    pub fn subscribe_collection(
        &self,
        callback: impl Fn(&CollectionChangeEvent<ObservableSequence<T>>) + 'static,
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
