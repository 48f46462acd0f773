#![forbid(unsafe_code)]

//! Contract-violation errors.
//!
//! The panicking accessors (`Dynamic::value`, `DynamicArray::set`, ...) format
//! one of these variants into their panic message. The `try_*` variants return
//! them instead, for callers that prefer to check first.

use std::fmt;

/// Errors from reading cells or indexing collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BondError {
    /// A cell was read before any value was assigned.
    ValueNotSet,
    /// An index fell outside the range accepted by `operation`.
    IndexOutOfBounds {
        index: usize,
        len: usize,
        operation: &'static str,
    },
    /// `operation` requires at least one element.
    EmptyCollection { operation: &'static str },
}

impl fmt::Display for BondError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueNotSet => write!(f, "value not set"),
            Self::IndexOutOfBounds {
                index,
                len,
                operation,
            } => write!(
                f,
                "index out of bounds: {operation} at {index} with length {len}"
            ),
            Self::EmptyCollection { operation } => {
                write!(f, "cannot {operation} on an empty collection")
            }
        }
    }
}

impl std::error::Error for BondError {}
