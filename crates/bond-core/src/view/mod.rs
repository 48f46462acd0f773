#![forbid(unsafe_code)]

//! Read-only views derived from an [`ArrayView`](crate::ArrayView).
//!
//! Views never own elements. They hold their source, re-derive what they
//! expose on every source event, and re-emit the result on their own event
//! cell. Observers bind to a view exactly as they bind to a
//! [`DynamicArray`](crate::DynamicArray).
//!
//! Views carry structural events only. Their event cell never holds a value,
//! so plain value listeners bound to a view are not called.

mod filter;
mod map;
pub mod pointers;

pub use filter::FilteredArray;
pub use map::MappedArray;
