#![forbid(unsafe_code)]

//! Observable values and collections for FrankenTUI data binding.
//!
//! # Role in FrankenTUI
//! `ftui-observable` holds model state that views bind to. Each container
//! wraps a backing store it exclusively owns and reports every change, so a
//! view can react without polling.
//!
//! - [`Observable`]: a single value; notifies `(previous, current)`.
//! - [`ObservableSequence`]: ordered, index-addressed `Vec<T>`.
//! - [`ObservableSet`]: unique-element `HashSet<T>`.
//! - [`ObservableMap`]: key-value `HashMap<K, V>` with add vs. upsert.
//! - [`SnapshotCodec`]: flat, order-preserving encode/decode for persistence.
//!
//! # Event contract
//!
//! A call that changes state emits one [`ItemChangeEvent`] per affected
//! element, then exactly one [`CollectionChangeEvent`]. A call that changes
//! nothing emits nothing. Listeners run synchronously, in registration
//! order, on the caller's thread, before the mutating call returns.
//!
//! # Architecture
//!
//! Containers are `Rc<RefCell<..>>` handles: single-threaded, cheap to
//! clone, all clones sharing one store and one set of listeners. Listeners
//! are stored as `Weak` callbacks; the [`Subscription`] guard owns the
//! callback and unsubscribes on drop.
//!
//! # Re-entrancy
//!
//! The store is never borrowed while listeners run, so a listener may mutate
//! the container it is observing. The nested call delivers all of its
//! events before the outer call continues delivering its own; listeners of
//! the outer call may therefore observe state newer than their event.
//! Reading the store from inside a `with` closure and mutating in the same
//! closure panics (`RefCell` borrow rules).

pub mod codec;
pub mod equality;
pub mod error;
pub mod event;
pub mod listener;
pub mod map;
pub mod observable;
pub mod sequence;
pub mod set;

pub use codec::{ListEncoding, MapEncoding, SetEncoding, SnapshotCodec};
pub use equality::Comparer;
pub use error::{ObservableError, Result};
pub use event::{ChangeKind, CollectionChangeEvent, ItemChangeEvent, ValueChange};
pub use listener::{ListenerRegistry, Subscription};
pub use map::ObservableMap;
pub use observable::Observable;
pub use sequence::ObservableSequence;
pub use set::ObservableSet;
