#![forbid(unsafe_code)]

//! Observable collections.
//!
//! [`DynamicArray<T>`] is a `Dynamic<Vec<T>>` whose mutations go through a
//! fixed protocol:
//!
//! 1. compute the affected indices,
//! 2. dispatch the `will` event,
//! 3. apply the mutation,
//! 4. store the new length in the `count` cell if it changed,
//! 5. dispatch the `did` event,
//! 6. notify plain value listeners with the whole new vector, then the
//!    `count` listeners.
//!
//! Value listeners run last, so anything they read through a derived view
//! already reflects the mutation.
//!
//! Precondition checks run before step 2, so a rejected operation emits
//! nothing.
//!
//! The read side is the [`ArrayView`] trait, which derived views implement as
//! well. Views only implement `ArrayView`, so there is no way to call a
//! mutator on one.

use std::fmt;
use std::rc::Rc;

use crate::config::BondConfig;
use crate::dynamic::{Bindable, Dynamic};
use crate::error::BondError;
use crate::event::{ArrayChange, ArrayEvent};
use crate::view::{FilteredArray, MappedArray};

/// Read-only access to an observable sequence.
pub trait ArrayView {
    type Item: Clone + 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    fn get(&self, index: usize) -> Self::Item;

    fn first(&self) -> Option<Self::Item> {
        (!self.is_empty()).then(|| self.get(0))
    }

    fn last(&self) -> Option<Self::Item> {
        let len = self.len();
        (len > 0).then(|| self.get(len - 1))
    }

    fn to_vec(&self) -> Vec<Self::Item> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Cell tracking `len()`, updated before each `did` event.
    fn count(&self) -> Dynamic<usize>;

    /// Cell that carries this sequence's structural events.
    fn events(&self) -> &Dynamic<Vec<Self::Item>>;
}

/// Derived views over any [`ArrayView`].
pub trait ArrayViewExt: ArrayView + Clone + 'static {
    /// Lazily transformed view; `f` receives each element and its index.
    fn map<U, F>(&self, f: F) -> MappedArray<Self::Item, U>
    where
        U: Clone + 'static,
        F: Fn(&Self::Item, usize) -> U + 'static,
    {
        MappedArray::new(Rc::new(self.clone()), f)
    }

    /// Like [`ArrayViewExt::map`] without the index.
    fn map_values<U, F>(&self, f: F) -> MappedArray<Self::Item, U>
    where
        U: Clone + 'static,
        F: Fn(&Self::Item) -> U + 'static,
    {
        self.map(move |item, _| f(item))
    }

    /// Incrementally maintained view of the elements passing `predicate`,
    /// using [`BondConfig::global`].
    fn filter<F>(&self, predicate: F) -> FilteredArray<Self::Item>
    where
        F: Fn(&Self::Item) -> bool + 'static,
    {
        self.filter_with(predicate, BondConfig::global().clone())
    }

    fn filter_with<F>(&self, predicate: F, config: BondConfig) -> FilteredArray<Self::Item>
    where
        F: Fn(&Self::Item) -> bool + 'static,
    {
        FilteredArray::new(Rc::new(self.clone()), predicate, config)
    }
}

impl<A: ArrayView + Clone + 'static> ArrayViewExt for A {}

/// An observable, mutable sequence.
///
/// Cloning shares the same storage and bonds.
///
/// # Invariants
///
/// 1. `count().value() == len()` whenever an observer can run.
/// 2. Every mutation emits a `will` event before and a `did` event after it.
pub struct DynamicArray<T> {
    dynamic: Dynamic<Vec<T>>,
    count: Dynamic<usize>,
}

impl<T> Clone for DynamicArray<T> {
    fn clone(&self) -> Self {
        Self {
            dynamic: self.dynamic.clone(),
            count: self.count.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicArray")
            .field("items", &self.dynamic)
            .finish()
    }
}

impl<T: Clone + 'static> Default for DynamicArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + 'static> From<Vec<T>> for DynamicArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: Clone + 'static> DynamicArray<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        let count = Dynamic::new(items.len());
        Self {
            dynamic: Dynamic::new(items),
            count,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dynamic.with(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        match self.try_get(index) {
            Ok(item) => item,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get(&self, index: usize) -> Result<T, BondError> {
        self.dynamic.with(|items| {
            items
                .get(index)
                .cloned()
                .ok_or(BondError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                    operation: "get",
                })
        })
    }

    /// Borrow the elements. `f` must not mutate this array.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.dynamic.with(|items| f(items))
    }

    #[must_use]
    pub fn count(&self) -> Dynamic<usize> {
        self.count.clone()
    }

    /// Replace every element, emitting a reset.
    pub fn set_array(&self, items: Vec<T>) {
        self.apply(ArrayChange::Reset, move |current| *current = items);
    }

    pub fn append(&self, item: T) {
        let index = self.len();
        self.apply(ArrayChange::Insert(vec![index]), move |items| {
            items.push(item);
        });
    }

    /// Append every element of `items` as one contiguous insert.
    pub fn extend(&self, items: Vec<T>) {
        let len = self.len();
        self.splice(items, len);
    }

    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, item: T, index: usize) {
        if let Err(err) = self.try_insert(item, index) {
            panic!("{err}");
        }
    }

    pub fn try_insert(&self, item: T, index: usize) -> Result<(), BondError> {
        self.check_insert_position(index, "insert")?;
        self.apply(ArrayChange::Insert(vec![index]), move |items| {
            items.insert(index, item);
        });
        Ok(())
    }

    /// Insert `items` as a contiguous block starting at `index`. An empty
    /// block is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn splice(&self, items: Vec<T>, index: usize) {
        if let Err(err) = self.try_splice(items, index) {
            panic!("{err}");
        }
    }

    pub fn try_splice(&self, items: Vec<T>, index: usize) -> Result<(), BondError> {
        self.check_insert_position(index, "splice")?;
        if items.is_empty() {
            return Ok(());
        }
        let indices = (index..index + items.len()).collect();
        self.apply(ArrayChange::Insert(indices), move |current| {
            let tail = current.split_off(index);
            current.extend(items);
            current.extend(tail);
        });
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove_at(&self, index: usize) -> T {
        match self.try_remove_at(index) {
            Ok(item) => item,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_remove_at(&self, index: usize) -> Result<T, BondError> {
        let len = self.len();
        if index >= len {
            return Err(BondError::IndexOutOfBounds {
                index,
                len,
                operation: "remove_at",
            });
        }
        Ok(self.apply(ArrayChange::Remove(vec![index]), move |items| {
            items.remove(index)
        }))
    }

    /// Remove and return the last element.
    ///
    /// # Panics
    ///
    /// Panics on an empty array; check [`DynamicArray::is_empty`] first.
    pub fn remove_last(&self) -> T {
        match self.try_remove_last() {
            Ok(item) => item,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_remove_last(&self) -> Result<T, BondError> {
        let len = self.len();
        if len == 0 {
            return Err(BondError::EmptyCollection {
                operation: "remove_last",
            });
        }
        self.try_remove_at(len - 1)
    }

    /// Remove every element as one combined remove event. A no-op when empty.
    pub fn remove_all(&self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.apply(ArrayChange::Remove((0..len).collect()), Vec::clear);
    }

    /// Index assignment: an update for `index < len()`, an insert for
    /// `index == len()`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn set(&self, index: usize, item: T) {
        if let Err(err) = self.try_set(index, item) {
            panic!("{err}");
        }
    }

    pub fn try_set(&self, index: usize, item: T) -> Result<(), BondError> {
        let len = self.len();
        if index == len {
            self.apply(ArrayChange::Insert(vec![index]), move |items| {
                items.push(item);
            });
            Ok(())
        } else if index < len {
            self.apply(ArrayChange::Update(vec![index]), move |items| {
                items[index] = item;
            });
            Ok(())
        } else {
            Err(BondError::IndexOutOfBounds {
                index,
                len,
                operation: "set",
            })
        }
    }

    fn check_insert_position(
        &self,
        index: usize,
        operation: &'static str,
    ) -> Result<(), BondError> {
        let len = self.len();
        if index > len {
            return Err(BondError::IndexOutOfBounds {
                index,
                len,
                operation,
            });
        }
        Ok(())
    }

    /// The mutation protocol shared by every operation.
    ///
    /// The backing vector and `count` are written quietly. Their value
    /// listeners only run after `did` has reached every array bond, so
    /// derived views have patched themselves by then.
    fn apply<R>(&self, change: ArrayChange, mutate: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let changes_len = change.changes_len();
        let will = ArrayEvent::will(change);
        tracing::trace!(event = %will, "array mutation");
        self.dynamic.dispatch_array_event(&will);

        let result = self.dynamic.mutate_quietly(mutate);
        if changes_len {
            self.count.store_quietly(self.len());
        }

        self.dynamic
            .dispatch_array_event(&ArrayEvent::did(will.change));
        self.dynamic.notify();
        if changes_len {
            self.count.notify();
        }
        result
    }
}

impl<T: Clone + 'static> Bindable<Vec<T>> for DynamicArray<T> {
    fn dynamic(&self) -> &Dynamic<Vec<T>> {
        &self.dynamic
    }
}

impl<T: Clone + 'static> ArrayView for DynamicArray<T> {
    type Item = T;

    fn len(&self) -> usize {
        DynamicArray::len(self)
    }

    fn get(&self, index: usize) -> T {
        DynamicArray::get(self, index)
    }

    fn to_vec(&self) -> Vec<T> {
        self.dynamic.value()
    }

    fn count(&self) -> Dynamic<usize> {
        DynamicArray::count(self)
    }

    fn events(&self) -> &Dynamic<Vec<T>> {
        &self.dynamic
    }
}
