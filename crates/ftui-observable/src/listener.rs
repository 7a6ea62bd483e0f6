#![forbid(unsafe_code)]

//! Ordered listener registries and RAII subscriptions.
//!
//! # Design
//!
//! A [`ListenerRegistry<E>`] is one event channel: an ordered list of
//! callbacks taking `&E`. The registry stores callbacks as `Weak` references;
//! the strong `Rc` lives in the [`Subscription`] guard returned by
//! [`ListenerRegistry::subscribe`]. Dropping the guard removes exactly that
//! listener, leaving the others untouched.
//!
//! # Invariants
//!
//! 1. Listeners run in registration order.
//! 2. Each emission works on a snapshot of the live listeners taken before
//!    the first callback runs. A listener added during delivery is first
//!    called on the next emission; one removed during delivery still
//!    receives the emission already in progress.
//! 3. Dead entries are pruned lazily, when the next snapshot is taken.
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: guards that are never dropped keep their callbacks
//!   registered for the lifetime of the container.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::event::ItemChangeEvent;

type CallbackRc<E> = Rc<dyn Fn(&E)>;
type CallbackWeak<E> = Weak<dyn Fn(&E)>;

/// One event channel.
pub struct ListenerRegistry<E> {
    listeners: Vec<CallbackWeak<E>>,
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> ListenerRegistry<E> {
    /// Registered listeners, including dropped ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E: 'static> ListenerRegistry<E> {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` at the end of the channel.
    ///
    /// The callback stays registered until the returned guard is dropped.
    pub fn subscribe(&mut self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: CallbackRc<E> = Rc::new(callback);
        self.listeners.push(Rc::downgrade(&strong));
        // `Rc<dyn Fn(&E)>` cannot coerce to `Rc<dyn Any>` directly, so the
        // guard owns it boxed.
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Prune dead listeners and return strong handles to the live ones, in
    /// registration order.
    pub fn snapshot(&mut self) -> Vec<CallbackRc<E>> {
        self.listeners.retain(|w| w.strong_count() > 0);
        self.listeners.iter().filter_map(Weak::upgrade).collect()
    }

    /// Snapshot and invoke every live listener with `event`.
    ///
    /// Only usable when the registry is not behind a borrow that listeners
    /// may need. The containers snapshot under their borrow and deliver
    /// after releasing it.
    pub fn emit(&mut self, event: &E) {
        deliver(&self.snapshot(), event);
    }
}

/// Invoke `callbacks` in order with `event`.
pub(crate) fn deliver<E>(callbacks: &[CallbackRc<E>], event: &E) {
    for cb in callbacks {
        cb(event);
    }
}

/// Item and collection channels of one container.
pub(crate) struct ChangeChannels<E, C> {
    pub(crate) items: ListenerRegistry<ItemChangeEvent<E>>,
    pub(crate) collection: ListenerRegistry<C>,
}

impl<E, C> Default for ChangeChannels<E, C> {
    fn default() -> Self {
        Self {
            items: ListenerRegistry::default(),
            collection: ListenerRegistry::default(),
        }
    }
}

impl<E: 'static, C: 'static> ChangeChannels<E, C> {
    /// Capture listeners for a change made up of `items`.
    ///
    /// Call while the container is still borrowed, then drop the borrow and
    /// [`PendingChange::dispatch`].
    pub(crate) fn prepare(&mut self, items: Vec<ItemChangeEvent<E>>) -> PendingChange<E, C> {
        PendingChange {
            items,
            item_listeners: self.items.snapshot(),
            collection_listeners: self.collection.snapshot(),
        }
    }
}

/// A change whose events have not been delivered yet.
pub(crate) struct PendingChange<E, C> {
    items: Vec<ItemChangeEvent<E>>,
    item_listeners: Vec<CallbackRc<ItemChangeEvent<E>>>,
    collection_listeners: Vec<CallbackRc<C>>,
}

impl<E, C> PendingChange<E, C> {
    /// Log name for the batch: the shared kind of its item events, `mixed`
    /// when they differ, `refresh` when there are none.
    fn kind_label(&self) -> &'static str {
        let mut kinds = self.items.iter().map(|e| e.kind);
        let Some(first) = kinds.next() else {
            return "refresh";
        };
        if kinds.all(|k| k == first) {
            first.as_str()
        } else {
            "mixed"
        }
    }

    /// Deliver every item event, then one collection event.
    pub(crate) fn dispatch(self, source: &'static str, collection: C) {
        trace!(
            container = source,
            kind = self.kind_label(),
            items = self.items.len(),
            item_listeners = self.item_listeners.len(),
            collection_listeners = self.collection_listeners.len(),
            "dispatching change"
        );
        for item in &self.items {
            deliver(&self.item_listeners, item);
        }
        deliver(&self.collection_listeners, &collection);
    }
}

/// RAII guard for one registered listener.
///
/// Dropping the guard (or calling [`Subscription::unsubscribe`]) makes the
/// listener unreachable: its `Weak` entry fails to upgrade on the next
/// emission and is pruned.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback alive.
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Remove the listener. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
