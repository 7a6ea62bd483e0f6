#![forbid(unsafe_code)]

//! Change-notification vocabulary shared by every observable container.
//!
//! A state-changing call emits, in order:
//!
//! 1. one [`ItemChangeEvent`] per affected element, in the container's
//!    enumeration order at the time of the call, then
//! 2. exactly one [`CollectionChangeEvent`] for the whole call.
//!
//! A call that changes nothing emits nothing.
//!
//! # Live references
//!
//! [`CollectionChangeEvent`] holds a handle to the container, not a copy of
//! its contents. Reading through it shows the state at read time: if a
//! listener mutates the container while the event is being delivered, later
//! listeners see the mutated state.

/// What happened to a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    Added,
    Removed,
    Updated,
}

impl ChangeKind {
    /// Stable lowercase name, used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Updated => "updated",
        }
    }
}

/// Notification for one affected element.
///
/// `E` is the element type for sequences and sets, and a `(key, value)` pair
/// for maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemChangeEvent<E> {
    /// Kind of change.
    pub kind: ChangeKind,
    /// The added or removed element, or the new value for an update.
    pub element: E,
    /// Position of the element, for index-addressed containers.
    ///
    /// Sequences report the index inserted at, removed from, or updated.
    /// Sets and maps report `None`.
    pub index: Option<usize>,
}

impl<E> ItemChangeEvent<E> {
    /// An event without positional information.
    #[must_use]
    pub fn new(kind: ChangeKind, element: E) -> Self {
        Self {
            kind,
            element,
            index: None,
        }
    }

    /// An event for the element at `index`.
    #[must_use]
    pub fn at(kind: ChangeKind, element: E, index: usize) -> Self {
        Self {
            kind,
            element,
            index: Some(index),
        }
    }
}

/// Notification that a container changed as a whole.
///
/// Carries a handle to the live container `C` (containers are cheap,
/// shared-state handles). See the module docs for the aliasing caveat.
#[derive(Debug, Clone)]
pub struct CollectionChangeEvent<C> {
    container: C,
}

impl<C> CollectionChangeEvent<C> {
    pub(crate) fn new(container: C) -> Self {
        Self { container }
    }

    /// The container that changed, as it is now.
    #[must_use]
    pub fn container(&self) -> &C {
        &self.container
    }
}

/// Notification that a scalar observable changed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange<T> {
    /// Value before the change.
    pub previous: T,
    /// Value after the change.
    pub current: T,
}
