#![forbid(unsafe_code)]

//! Explicit equality definitions for equality-gated operations.
//!
//! Scalar assignment, sequence index assignment and sequence
//! remove-by-value all decide "is this the same element?" through a
//! [`Comparer`]. The default is the type's `PartialEq`; a custom comparer is
//! supplied at construction and stays fixed for the container's lifetime.
//!
//! Sets and maps hash their elements, so they use the element (or key)
//! type's `Eq + Hash`. Wrap the element in a newtype to change it.

use std::fmt;
use std::rc::Rc;

/// Shared equality predicate over `T`.
pub struct Comparer<T> {
    eq: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T> Clone for Comparer<T> {
    fn clone(&self) -> Self {
        Self {
            eq: Rc::clone(&self.eq),
        }
    }
}

impl<T> fmt::Debug for Comparer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparer").finish_non_exhaustive()
    }
}

impl<T: PartialEq + 'static> Default for Comparer<T> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<T: PartialEq + 'static> Comparer<T> {
    /// Structural equality from `T`'s `PartialEq`.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(|a: &T, b: &T| a == b)
    }
}

impl<T: 'static> Comparer<T> {
    /// Equality from an arbitrary predicate.
    ///
    /// The predicate should be an equivalence relation; the containers do
    /// not check this.
    #[must_use]
    pub fn new(eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self { eq: Rc::new(eq) }
    }

    /// Two values are equal when their projected keys are equal.
    #[must_use]
    pub fn by_key<K: PartialEq>(key: impl Fn(&T) -> K + 'static) -> Self {
        Self::new(move |a, b| key(a) == key(b))
    }
}

impl<T> Comparer<T> {
    /// Compare two values.
    #[inline]
    #[must_use]
    pub fn equals(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }
}
