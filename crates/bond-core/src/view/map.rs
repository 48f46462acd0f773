#![forbid(unsafe_code)]

//! Lazily projected view.
//!
//! A projection keeps every index where it was, so the view forwards its
//! source's events unchanged and shares the source's `count` cell.

use std::fmt;
use std::rc::Rc;

use crate::array::ArrayView;
use crate::bond::Bond;
use crate::dynamic::{Bindable, Dynamic};
use crate::error::BondError;

/// A lazily transformed view of a source sequence.
///
/// `get(i)` evaluates `transform(&source[i], i)` on every call; nothing is
/// cached. Source events are re-emitted unchanged since a 1:1 projection
/// never moves indices.
pub struct MappedArray<S, U> {
    hub: Dynamic<Vec<U>>,
    state: Rc<MapState<S, U>>,
}

struct MapState<S, U> {
    source: Rc<dyn ArrayView<Item = S>>,
    transform: Box<dyn Fn(&S, usize) -> U>,
    _forward: Bond<Vec<S>>,
}

impl<S, U> Clone for MappedArray<S, U> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: Clone + 'static, U: Clone + 'static> fmt::Debug for MappedArray<S, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedArray")
            .field("len", &self.state.source.len())
            .field("bonds", &self.hub.bond_count())
            .finish()
    }
}

impl<S: Clone + 'static, U: Clone + 'static> MappedArray<S, U> {
    pub(crate) fn new(
        source: Rc<dyn ArrayView<Item = S>>,
        transform: impl Fn(&S, usize) -> U + 'static,
    ) -> Self {
        let hub = Dynamic::unset();
        let target = hub.downgrade();
        let forward = Bond::detached().with_array_listener(move |event| {
            if let Some(hub) = target.upgrade() {
                hub.dispatch_array_event(event);
            }
        });
        forward.bind(source.events(), false, true);

        let state = Rc::new(MapState {
            source,
            transform: Box::new(transform),
            _forward: forward,
        });
        hub.retain(Rc::clone(&state));
        Self { hub, state }
    }

    pub fn try_get(&self, index: usize) -> Result<U, BondError> {
        let len = self.state.source.len();
        if index >= len {
            return Err(BondError::IndexOutOfBounds {
                index,
                len,
                operation: "get",
            });
        }
        Ok((self.state.transform)(&self.state.source.get(index), index))
    }
}

impl<S: Clone + 'static, U: Clone + 'static> Bindable<Vec<U>> for MappedArray<S, U> {
    fn dynamic(&self) -> &Dynamic<Vec<U>> {
        &self.hub
    }
}

impl<S: Clone + 'static, U: Clone + 'static> ArrayView for MappedArray<S, U> {
    type Item = U;

    fn len(&self) -> usize {
        self.state.source.len()
    }

    fn get(&self, index: usize) -> U {
        match self.try_get(index) {
            Ok(item) => item,
            Err(err) => panic!("{err}"),
        }
    }

    fn count(&self) -> Dynamic<usize> {
        self.state.source.count()
    }

    fn events(&self) -> &Dynamic<Vec<U>> {
        &self.hub
    }
}
