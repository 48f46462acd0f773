#![forbid(unsafe_code)]

//! Observers ("bonds") and the binding edge.
//!
//! A [`Bond<T>`] carries an optional value listener and an optional array
//! listener. The array listener is the structural-event capability: a bond
//! watching a plain cell simply leaves it empty, and collections only deliver
//! [`ArrayEvent`]s to bonds that set one.
//!
//! Binding registers a weak back-reference on the cell and records the cell on
//! the bond, either owned (`strong = true`) or merely referenced. Dropping the
//! last handle to a bond releases the cells it owns; the cells prune the dead
//! back-reference on their next dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dynamic::{Bindable, Dynamic, WeakDynamic};
use crate::event::ArrayEvent;

pub(crate) type Listener<T> = Rc<dyn Fn(&T)>;
pub(crate) type ArrayListener = Rc<dyn Fn(&ArrayEvent)>;

pub(crate) struct BondInner<T> {
    listener: RefCell<Option<Listener<T>>>,
    array_listener: RefCell<Option<ArrayListener>>,
    /// Cells this bond keeps alive.
    strong: RefCell<Vec<Dynamic<T>>>,
    /// Cells this bond observes without owning.
    weak: RefCell<Vec<WeakDynamic<T>>>,
}

impl<T> BondInner<T> {
    pub(crate) fn listener(&self) -> Option<Listener<T>> {
        self.listener.borrow().clone()
    }

    pub(crate) fn has_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }

    pub(crate) fn array_listener(&self) -> Option<ArrayListener> {
        self.array_listener.borrow().clone()
    }
}

/// An observer that can be bound to any number of cells.
///
/// Cloning a `Bond` creates a new handle to the same observer. The observer
/// stays registered on its cells until [`Bond::unbind_all`] is called or the
/// last handle is dropped.
pub struct Bond<T> {
    inner: Rc<BondInner<T>>,
}

impl<T> Clone for Bond<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Bond<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bond")
            .field("has_listener", &self.inner.has_listener())
            .field(
                "has_array_listener",
                &self.inner.array_listener.borrow().is_some(),
            )
            .field("strong", &self.inner.strong.borrow().len())
            .field("weak", &self.inner.weak.borrow().len())
            .finish()
    }
}

impl<T: Clone + 'static> Default for Bond<T> {
    fn default() -> Self {
        Self::detached()
    }
}

impl<T: Clone + 'static> Bond<T> {
    /// Create a bond with a value listener.
    pub fn new(listener: impl Fn(&T) + 'static) -> Self {
        let bond = Self::detached();
        bond.set_listener(listener);
        bond
    }

    /// Create a bond with no listeners.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(BondInner {
                listener: RefCell::new(None),
                array_listener: RefCell::new(None),
                strong: RefCell::new(Vec::new()),
                weak: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn set_listener(&self, listener: impl Fn(&T) + 'static) {
        *self.inner.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn clear_listener(&self) {
        self.inner.listener.borrow_mut().take();
    }

    /// Install the structural-event listener.
    pub fn set_array_listener(&self, listener: impl Fn(&ArrayEvent) + 'static) {
        *self.inner.array_listener.borrow_mut() = Some(Rc::new(listener));
    }

    #[must_use]
    pub fn with_array_listener(self, listener: impl Fn(&ArrayEvent) + 'static) -> Self {
        self.set_array_listener(listener);
        self
    }

    /// Bind this bond to `source`.
    ///
    /// The source always holds only a weak reference to the bond. With
    /// `strong`, the bond keeps the source's cell alive; otherwise the cell's
    /// lifetime is independent. With `fire` and a set value, the listener
    /// runs once, synchronously, before `bind` returns.
    pub fn bind(&self, source: &impl Bindable<T>, fire: bool, strong: bool) {
        let cell = source.dynamic();
        cell.attach(Rc::downgrade(&self.inner));
        if strong {
            self.inner.strong.borrow_mut().push(cell.clone());
        } else {
            self.inner.weak.borrow_mut().push(cell.downgrade());
        }

        if !fire {
            return;
        }
        let Ok(value) = cell.try_value() else {
            return;
        };
        if let Some(listener) = self.inner.listener() {
            listener(&value);
        }
    }

    /// Remove this bond from every cell it is bound to and forget them.
    /// Calling it again is a no-op.
    pub fn unbind_all(&self) {
        let me = Rc::downgrade(&self.inner);
        let strong = std::mem::take(&mut *self.inner.strong.borrow_mut());
        let weak = std::mem::take(&mut *self.inner.weak.borrow_mut());
        if strong.is_empty() && weak.is_empty() {
            return;
        }
        tracing::debug!(strong = strong.len(), weak = weak.len(), "unbinding bond");

        for cell in strong
            .into_iter()
            .chain(weak.iter().filter_map(WeakDynamic::upgrade))
        {
            cell.detach(&me);
        }
    }

    /// Number of cells this bond is bound to and that are still alive.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        let weak_alive = self
            .inner
            .weak
            .borrow()
            .iter()
            .filter(|w| w.is_alive())
            .count();
        self.inner.strong.borrow().len() + weak_alive
    }

    /// Whether `cell` is among this bond's bound cells.
    #[must_use]
    pub fn is_bound_to(&self, cell: &Dynamic<T>) -> bool {
        self.inner.strong.borrow().iter().any(|c| c.ptr_eq(cell))
            || self
                .inner
                .weak
                .borrow()
                .iter()
                .filter_map(WeakDynamic::upgrade)
                .any(|c| c.ptr_eq(cell))
    }
}
