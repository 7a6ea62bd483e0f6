#![forbid(unsafe_code)]

//! Observable scalar value with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). When the value changes, as decided by the
//! observable's [`Comparer`], every live subscriber receives one
//! [`ValueChange`] carrying the previous and the current value.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone               |
//! | `set()`       | O(S) where S = subscribers |
//! | `subscribe()` | O(1) amortized             |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: the storage borrow is released before subscribers
//!   run, so a subscriber may call `set()` on the same observable. The
//!   nested call notifies everyone before the outer delivery continues, so
//!   later subscribers of the outer call see a `ValueChange` whose `current`
//!   is already stale. Avoid feedback loops that never settle.
//! - **Subscriber leak**: undropped [`Subscription`] guards accumulate.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::equality::Comparer;
use crate::event::ValueChange;
use crate::listener::{ListenerRegistry, Subscription, deliver};

/// Listener snapshot plus the change to deliver to it.
type PendingValue<T> = (Vec<Rc<dyn Fn(&ValueChange<T>)>>, ValueChange<T>);

struct ObservableInner<T> {
    value: T,
    version: u64,
    comparer: Comparer<T>,
    listeners: ListenerRegistry<ValueChange<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** inner state:
/// both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v` equals the current value is a no-op: no version
///    bump and no notification.
/// 3. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable compared by `T`'s `PartialEq`.
    ///
    /// The initial version is 0 and no subscribers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_comparer(value, Comparer::natural())
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create an observable that decides "unchanged" with `comparer`.
    #[must_use]
    pub fn with_comparer(value: T, comparer: Comparer<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                comparer,
                listeners: ListenerRegistry::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// Do not mutate this observable from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value. If it differs from the current value, the version is
    /// incremented and subscribers receive `(previous, current)`.
    pub fn set(&self, value: T) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.comparer.equals(&inner.value, &value) {
                return;
            }
            let previous = std::mem::replace(&mut inner.value, value);
            inner.version += 1;
            let change = ValueChange {
                previous,
                current: inner.value.clone(),
            };
            (inner.listeners.snapshot(), change)
        };
        self.dispatch(pending);
    }

    /// Modify the value in place via a closure. If the value changes
    /// (compared against a snapshot taken before `f` runs), the version is
    /// incremented and subscribers are notified.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.value.clone();
            f(&mut inner.value);
            if inner.comparer.equals(&previous, &inner.value) {
                return;
            }
            inner.version += 1;
            let change = ValueChange {
                previous,
                current: inner.value.clone(),
            };
            (inner.listeners.snapshot(), change)
        };
        self.dispatch(pending);
    }

    /// Notify subscribers without changing the value.
    ///
    /// The delivered change has `previous == current`. The version is not
    /// bumped.
    pub fn refresh(&self) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let change = ValueChange {
                previous: inner.value.clone(),
                current: inner.value.clone(),
            };
            (inner.listeners.snapshot(), change)
        };
        self.dispatch(pending);
    }

    /// Subscribe to value changes.
    ///
    /// Returns a [`Subscription`] guard; dropping it unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&ValueChange<T>) + 'static) -> Subscription {
        self.inner.borrow_mut().listeners.subscribe(callback)
    }

    /// Current version number. Increments by 1 on each value-changing
    /// mutation. Useful for dirty-checking in render loops.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered subscribers (including dead ones not yet
    /// pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn dispatch(&self, (callbacks, change): PendingValue<T>) {
        trace!(
            container = "observable",
            subscribers = callbacks.len(),
            "dispatching value change"
        );
        deliver(&callbacks, &change);
    }
}
