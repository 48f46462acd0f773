#![forbid(unsafe_code)]

//! Incrementally maintained filtered view.
//!
//! # Design
//!
//! The view keeps `pointers`, the ascending source indices whose elements
//! pass the predicate. Each source event patches that list through
//! [`pointers`](super::pointers) instead of rescanning, so the cost of an
//! update is proportional to the change, not to the source.
//!
//! | Source event  | Handled on | View emits                              |
//! |---------------|------------|-----------------------------------------|
//! | insert        | did        | insert at admitted filtered positions   |
//! | remove        | will + did | remove at dropped positions, descending |
//! | update        | did        | update, remove or insert per index      |
//! | reset         | will + did | reset, after a full rescan              |
//!
//! Removals need the intact source to compute their filtered positions, so
//! the patch is computed on the source's `will` and committed on its `did`.
//! Every view event is only emitted when at least one filtered position is
//! affected.
//!
//! # Invariants
//!
//! 1. `pointers` is strictly increasing and within source bounds while any
//!    observer can run.
//! 2. `count().value() == len()` before each `did` event. Count listeners
//!    are notified after it.
//! 3. During a view `will` event, reads return the pre-change contents.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::array::ArrayView;
use crate::bond::Bond;
use crate::config::BondConfig;
use crate::dynamic::{Bindable, Dynamic, WeakDynamic};
use crate::error::BondError;
use crate::event::{ArrayChange, ArrayEvent, Phase};
use crate::view::pointers::{self, RemovePatch};

/// A view of the source elements that pass a predicate.
pub struct FilteredArray<T> {
    hub: Dynamic<Vec<T>>,
    state: Rc<FilterState<T>>,
}

struct FilterState<T> {
    source: Rc<dyn ArrayView<Item = T>>,
    predicate: Box<dyn Fn(&T) -> bool>,
    pointers: RefCell<Vec<usize>>,
    /// Remove patch computed on the source's `will`, awaiting its `did`.
    pending_removal: RefCell<Option<RemovePatch>>,
    count: Dynamic<usize>,
    hub: WeakDynamic<Vec<T>>,
    config: BondConfig,
    bond: Bond<Vec<T>>,
}

impl<T> Clone for FilteredArray<T> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for FilteredArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredArray")
            .field("pointers", &*self.state.pointers.borrow())
            .field("source_len", &self.state.source.len())
            .field("search", &self.state.config.pointer_search)
            .finish()
    }
}

impl<T: Clone + 'static> FilteredArray<T> {
    pub(crate) fn new(
        source: Rc<dyn ArrayView<Item = T>>,
        predicate: impl Fn(&T) -> bool + 'static,
        config: BondConfig,
    ) -> Self {
        let hub = Dynamic::unset();
        let initial = pointers::scan(source.len(), |i| predicate(&source.get(i)));
        let count = Dynamic::new(initial.len());

        let state = Rc::new_cyclic(|this: &Weak<FilterState<T>>| {
            let this = Weak::clone(this);
            let bond = Bond::detached().with_array_listener(move |event| {
                if let Some(state) = this.upgrade() {
                    state.on_source_event(event);
                }
            });
            FilterState {
                source,
                predicate: Box::new(predicate),
                pointers: RefCell::new(initial),
                pending_removal: RefCell::new(None),
                count,
                hub: hub.downgrade(),
                config,
                bond,
            }
        });
        state.bond.bind(state.source.events(), false, true);
        state.verify();

        hub.retain(Rc::clone(&state));
        Self { hub, state }
    }

    /// Snapshot of the admitted source indices, ascending.
    #[must_use]
    pub fn pointers(&self) -> Vec<usize> {
        self.state.pointers.borrow().clone()
    }

    /// The source index behind filtered position `index`.
    #[must_use]
    pub fn source_index(&self, index: usize) -> Option<usize> {
        self.state.pointers.borrow().get(index).copied()
    }

    pub fn try_get(&self, index: usize) -> Result<T, BondError> {
        match self.source_index(index) {
            Some(source_index) => Ok(self.state.source.get(source_index)),
            None => Err(BondError::IndexOutOfBounds {
                index,
                len: self.state.pointers.borrow().len(),
                operation: "get",
            }),
        }
    }
}

impl<T: Clone + 'static> FilterState<T> {
    fn passes(&self, source_index: usize) -> bool {
        (self.predicate)(&self.source.get(source_index))
    }

    fn emit(&self, event: ArrayEvent) {
        if let Some(hub) = self.hub.upgrade() {
            hub.dispatch_array_event(&event);
        }
    }

    /// Store the new length without notifying; see [`FilterState::announce_count`].
    fn sync_count(&self) {
        let len = self.pointers.borrow().len();
        self.count.store_quietly(len);
    }

    /// Count listeners run after the view's `did`, so views stacked on this
    /// one have patched themselves by then.
    fn announce_count(&self) {
        self.count.notify();
    }

    fn verify(&self) {
        if !self.config.verify_pointers {
            return;
        }
        let pointers = self.pointers.borrow();
        let source_len = self.source.len();
        assert!(
            pointers::is_consistent(&pointers, source_len),
            "filtered index map inconsistent: {pointers:?} over {source_len} source elements"
        );
    }

    fn on_source_event(&self, event: &ArrayEvent) {
        match (event.phase, &event.change) {
            (Phase::Will, ArrayChange::Insert(_) | ArrayChange::Update(_)) => {}
            (Phase::Did, ArrayChange::Insert(indices)) => self.on_inserted(indices),
            (Phase::Will, ArrayChange::Remove(indices)) => self.on_will_remove(indices),
            (Phase::Did, ArrayChange::Remove(indices)) => self.on_did_remove(indices),
            (Phase::Did, ArrayChange::Update(indices)) => {
                for &index in indices {
                    self.on_updated(index);
                }
            }
            (Phase::Will, ArrayChange::Reset) => self.emit(ArrayEvent::will(ArrayChange::Reset)),
            (Phase::Did, ArrayChange::Reset) => self.rebuild(),
        }
    }

    fn on_inserted(&self, indices: &[usize]) {
        let patch = {
            let pointers = self.pointers.borrow();
            pointers::patch_insert(
                &pointers,
                indices,
                |i| self.passes(i),
                self.config.pointer_search,
            )
        };
        tracing::trace!(positions = ?patch.positions, "filtered insert");

        if patch.positions.is_empty() {
            *self.pointers.borrow_mut() = patch.pointers;
            self.verify();
            return;
        }

        // The shifted map still describes the old elements.
        *self.pointers.borrow_mut() = patch.shifted;
        self.emit(ArrayEvent::will(ArrayChange::Insert(patch.positions.clone())));
        *self.pointers.borrow_mut() = patch.pointers;
        self.verify();
        self.sync_count();
        self.emit(ArrayEvent::did(ArrayChange::Insert(patch.positions)));
        self.announce_count();
    }

    fn on_will_remove(&self, indices: &[usize]) {
        let patch = pointers::patch_remove(
            &self.pointers.borrow(),
            indices,
            self.config.pointer_search,
        );
        tracing::trace!(positions = ?patch.positions, "filtered remove");
        let positions = patch.positions.clone();
        *self.pending_removal.borrow_mut() = Some(patch);
        if !positions.is_empty() {
            self.emit(ArrayEvent::will(ArrayChange::Remove(positions)));
        }
    }

    fn on_did_remove(&self, indices: &[usize]) {
        let pending = self.pending_removal.borrow_mut().take();
        let patch = match pending {
            Some(patch) => patch,
            None => {
                // Source emitted `did` without `will`; nothing was announced.
                let patch = pointers::patch_remove(
                    &self.pointers.borrow(),
                    indices,
                    self.config.pointer_search,
                );
                if !patch.positions.is_empty() {
                    self.emit(ArrayEvent::will(ArrayChange::Remove(
                        patch.positions.clone(),
                    )));
                }
                patch
            }
        };

        *self.pointers.borrow_mut() = patch.pointers;
        self.verify();
        if patch.positions.is_empty() {
            return;
        }
        self.sync_count();
        self.emit(ArrayEvent::did(ArrayChange::Remove(patch.positions)));
        self.announce_count();
    }

    fn on_updated(&self, source_index: usize) {
        let (position, tracked) = {
            let pointers = self.pointers.borrow();
            let position =
                pointers::first_index_ge(&pointers, source_index, self.config.pointer_search);
            (position, pointers.get(position) == Some(&source_index))
        };
        let plan = UpdatePlan::classify(position, tracked, self.passes(source_index));
        let Some(plan) = plan else {
            return;
        };
        tracing::trace!(source_index, position, ?plan, "filtered update");

        // will: insert, remove, update.
        if let UpdatePlan::Insert(pos) = plan {
            self.emit(ArrayEvent::will(ArrayChange::Insert(vec![pos])));
        }
        if let UpdatePlan::Remove(pos) = plan {
            self.emit(ArrayEvent::will(ArrayChange::Remove(vec![pos])));
        }
        if let UpdatePlan::Update(pos) = plan {
            self.emit(ArrayEvent::will(ArrayChange::Update(vec![pos])));
        }

        match plan {
            UpdatePlan::Insert(pos) => self.pointers.borrow_mut().insert(pos, source_index),
            UpdatePlan::Remove(pos) => {
                self.pointers.borrow_mut().remove(pos);
            }
            UpdatePlan::Update(_) => {}
        }
        self.verify();
        if plan.changes_len() {
            self.sync_count();
        }

        // did: update, remove, insert.
        if let UpdatePlan::Update(pos) = plan {
            self.emit(ArrayEvent::did(ArrayChange::Update(vec![pos])));
        }
        if let UpdatePlan::Remove(pos) = plan {
            self.emit(ArrayEvent::did(ArrayChange::Remove(vec![pos])));
        }
        if let UpdatePlan::Insert(pos) = plan {
            self.emit(ArrayEvent::did(ArrayChange::Insert(vec![pos])));
        }
        if plan.changes_len() {
            self.announce_count();
        }
    }

    fn rebuild(&self) {
        let rebuilt = pointers::scan(self.source.len(), |i| self.passes(i));
        tracing::debug!(
            source_len = self.source.len(),
            admitted = rebuilt.len(),
            "filtered view rebuilt"
        );
        *self.pointers.borrow_mut() = rebuilt;
        self.pending_removal.borrow_mut().take();
        self.verify();
        self.sync_count();
        self.emit(ArrayEvent::did(ArrayChange::Reset));
        self.announce_count();
    }
}

/// What a single source update does to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdatePlan {
    /// Tracked and still passing.
    Update(usize),
    /// Tracked and now failing.
    Remove(usize),
    /// Untracked and now passing.
    Insert(usize),
}

impl UpdatePlan {
    fn classify(position: usize, tracked: bool, passes: bool) -> Option<Self> {
        match (tracked, passes) {
            (true, true) => Some(Self::Update(position)),
            (true, false) => Some(Self::Remove(position)),
            (false, true) => Some(Self::Insert(position)),
            (false, false) => None,
        }
    }

    fn changes_len(self) -> bool {
        !matches!(self, Self::Update(_))
    }
}

impl<T: Clone + 'static> Bindable<Vec<T>> for FilteredArray<T> {
    fn dynamic(&self) -> &Dynamic<Vec<T>> {
        &self.hub
    }
}

impl<T: Clone + 'static> ArrayView for FilteredArray<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.state.pointers.borrow().len()
    }

    fn get(&self, index: usize) -> T {
        match self.try_get(index) {
            Ok(item) => item,
            Err(err) => panic!("{err}"),
        }
    }

    fn count(&self) -> Dynamic<usize> {
        self.state.count.clone()
    }

    fn events(&self) -> &Dynamic<Vec<T>> {
        &self.hub
    }
}
