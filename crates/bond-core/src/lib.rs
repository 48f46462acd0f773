#![forbid(unsafe_code)]

//! Synchronous observable cells and incrementally maintained collection
//! views.
//!
//! - [`Dynamic`]: a shared, optionally-set value. Assigning it notifies every
//!   bound [`Bond`] inline, in registration order.
//! - [`Bond`]: an observer that can be bound to many cells, owning them
//!   (`strong`) or not.
//! - [`DynamicArray`]: an observable sequence whose mutations emit paired
//!   `will`/`did` [`ArrayEvent`]s with the exact affected indices.
//! - [`MappedArray`] and [`FilteredArray`]: read-only views that translate a
//!   source's events into their own. The filtered view patches a sorted index
//!   map instead of rescanning.
//! - [`functional`]: `map`, `filter`, `zip`, `reduce`, `skip` and friends over
//!   single-value cells.
//!
//! # Example
//!
//! ```
//! use bond_core::{ArrayView, ArrayViewExt, Bond, DynamicArray};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let numbers = DynamicArray::new(vec![1, 2, 3, 4]);
//! let evens = numbers.filter(|n| n % 2 == 0);
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&log);
//! let bond = Bond::detached()
//!     .with_array_listener(move |ev| sink.borrow_mut().push(ev.to_string()));
//! bond.bind(&evens, false, false);
//!
//! numbers.insert(10, 0);
//! assert_eq!(evens.to_vec(), vec![10, 2, 4]);
//! assert_eq!(*log.borrow(), vec!["will-insert [0]", "did-insert [0]"]);
//! ```
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); none of the handle
//! types are `Send`.

pub mod array;
pub mod bond;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod event;
pub mod functional;
pub mod view;

pub use array::{ArrayView, ArrayViewExt, DynamicArray};
pub use bond::Bond;
pub use config::{BondConfig, BondConfigError, BondConfigParse, PointerSearch};
pub use dynamic::{Bindable, Dynamic, WeakDynamic};
pub use error::BondError;
pub use event::{ArrayChange, ArrayEvent, ChangeKind, Phase};
pub use functional::{any, reduce, reduce3};
pub use view::{FilteredArray, MappedArray};
