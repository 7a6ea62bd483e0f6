#![forbid(unsafe_code)]

//! Error type shared by every observable container.
//!
//! All failures are reported synchronously at the call site, before the
//! backing storage is touched and before any listener runs. No-op outcomes
//! (removing an absent element, clearing an empty container, re-adding a set
//! member, assigning an equal value) are not errors; they surface through
//! `bool` return values instead.

use std::fmt;

/// Errors from observable container operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservableError {
    /// An index-addressed operation used an index outside the valid range.
    ///
    /// `len` is the container length at the time of the call. For
    /// `insert` the valid range is `0..=len`, otherwise `0..len`.
    OutOfRange { index: usize, len: usize },
    /// A map read addressed a key that is not present.
    KeyNotFound,
    /// `ObservableMap::add` (or a map decode) met a key that already exists.
    DuplicateKey,
    /// An argument could not describe a valid container (for example a map
    /// encoding whose key and value sequences differ in length).
    InvalidArgument(String),
}

impl fmt::Display for ObservableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::KeyNotFound => write!(f, "key not found"),
            Self::DuplicateKey => write!(f, "an entry with the same key already exists"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for ObservableError {}

/// Result alias for observable container operations.
pub type Result<T> = std::result::Result<T, ObservableError>;
