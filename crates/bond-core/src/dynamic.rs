#![forbid(unsafe_code)]

//! Single-value observable cells.
//!
//! # Design
//!
//! [`Dynamic<T>`] holds an optional value in shared, reference-counted storage
//! (`Rc<..>` with `RefCell` fields). Assigning a value synchronously notifies
//! every live [`Bond`] bound to the cell, in registration order. The cell only
//! keeps weak references to its bonds; whether a bond keeps the cell alive is
//! decided on the bond side (see [`Bond::bind`]).
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `value()`     | O(1) + clone               |
//! | `set()`       | O(B) where B = bonds       |
//! | `bind()`      | O(1) amortized             |
//!
//! # Re-entrancy
//!
//! While a cell is dispatching, further writes to that same cell store the
//! value but do not notify. Nothing is queued or replayed: the last write
//! wins, and listeners that already ran never see it. This single guard is
//! what stops a feedback binding (A drives B drives A) from recursing.
//!
//! # Failure Modes
//!
//! - **Unset read**: `value()` on a cell that was never assigned panics with
//!   "value not set". Check with `is_set()` or use `try_value()`.
//! - **Listener panic**: the dispatch flag is released by a drop guard, so the
//!   cell keeps dispatching normally once the panic has unwound.
//! - **Write inside `with`**: calling `set()` from the closure passed to
//!   `with()` panics (RefCell borrow rules).
//! - **Dead bonds**: dropped bonds stay in the list until the next dispatch
//!   prunes them.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bond::{Bond, BondInner};
use crate::config::BondConfig;
use crate::error::BondError;
use crate::event::ArrayEvent;

thread_local! {
    /// Number of cell dispatches currently on this thread's stack.
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Shared interior for [`Dynamic<T>`].
pub(crate) struct DynamicInner<T> {
    value: RefCell<Option<T>>,
    /// Back-references to bound bonds. Dead entries are pruned on dispatch.
    bonds: RefCell<Vec<Weak<BondInner<T>>>>,
    dispatching: Cell<bool>,
    /// Bond whose listener writes into this cell.
    value_bond: Bond<T>,
    /// Auxiliary objects kept alive for as long as the cell is.
    retained: RefCell<Vec<Box<dyn Any>>>,
}

/// A shared, optionally-set value with synchronous change notification.
///
/// Cloning a `Dynamic` creates a new handle to the **same** cell.
///
/// # Invariants
///
/// 1. Bonds are notified in registration order.
/// 2. A write issued while this cell is dispatching is stored but not
///    dispatched.
/// 3. The dispatch flag is cleared on every exit path, including unwinding.
pub struct Dynamic<T> {
    pub(crate) inner: Rc<DynamicInner<T>>,
}

/// Non-owning handle to a [`Dynamic`].
pub struct WeakDynamic<T> {
    inner: Weak<DynamicInner<T>>,
}

/// Anything a [`Bond`] can bind to.
pub trait Bindable<T> {
    /// The cell that carries this source's notifications.
    fn dynamic(&self) -> &Dynamic<T>;
}

impl<T> Bindable<T> for Dynamic<T> {
    fn dynamic(&self) -> &Dynamic<T> {
        self
    }
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Clone for WeakDynamic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("value", &*self.inner.value.borrow())
            .field("bond_count", &self.inner.bonds.borrow().len())
            .field("dispatching", &self.inner.dispatching.get())
            .finish()
    }
}

impl<T> fmt::Debug for WeakDynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDynamic")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> WeakDynamic<T> {
    /// Upgrade to a strong handle if the cell still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<Dynamic<T>> {
        self.inner.upgrade().map(|inner| Dynamic { inner })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T: Clone + 'static> Dynamic<T> {
    /// Create a cell holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_initial(Some(value))
    }

    /// Create a cell with no value. Reading it before the first `set` is a
    /// contract violation.
    #[must_use]
    pub fn unset() -> Self {
        Self::with_initial(None)
    }

    fn with_initial(value: Option<T>) -> Self {
        let inner = Rc::new_cyclic(|this: &Weak<DynamicInner<T>>| {
            let this = WeakDynamic {
                inner: Weak::clone(this),
            };
            let value_bond = Bond::new(move |v: &T| {
                if let Some(cell) = this.upgrade() {
                    cell.set(v.clone());
                }
            });
            DynamicInner {
                value: RefCell::new(value),
                bonds: RefCell::new(Vec::new()),
                dispatching: Cell::new(false),
                value_bond,
                retained: RefCell::new(Vec::new()),
            }
        });
        Self { inner }
    }

    /// Whether the cell currently holds a value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// A clone of the current value.
    ///
    /// # Panics
    ///
    /// Panics with "value not set" if the cell was never assigned.
    #[must_use]
    pub fn value(&self) -> T {
        match self.try_value() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// A clone of the current value, or [`BondError::ValueNotSet`].
    pub fn try_value(&self) -> Result<T, BondError> {
        self.inner
            .value
            .borrow()
            .clone()
            .ok_or(BondError::ValueNotSet)
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the cell is unset, or if `f` writes to this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let slot = self.inner.value.borrow();
        match slot.as_ref() {
            Some(value) => f(value),
            None => panic!("{}", BondError::ValueNotSet),
        }
    }

    /// Store `value` and notify bound listeners, unless this cell is already
    /// dispatching.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value);
        self.dispatch();
    }

    /// Mutate the stored value in place without notifying. Pair with
    /// [`Dynamic::notify`] once dependents are consistent again.
    pub(crate) fn mutate_quietly<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slot = self.inner.value.borrow_mut();
        match slot.as_mut() {
            Some(value) => f(value),
            None => panic!("{}", BondError::ValueNotSet),
        }
    }

    pub(crate) fn store_quietly(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value);
    }

    /// Dispatch the stored value as `set` would.
    pub(crate) fn notify(&self) {
        self.dispatch();
    }

    /// Whether a dispatch is in progress on this cell.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    /// Number of live bonds registered on this cell.
    #[must_use]
    pub fn bond_count(&self) -> usize {
        self.inner
            .bonds
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Cell-side spelling of [`Bond::bind`].
    pub fn bind_to(&self, bond: &Bond<T>, fire: bool, strong: bool) {
        bond.bind(self, fire, strong);
    }

    /// The bond that writes incoming values into this cell.
    #[must_use]
    pub fn value_bond(&self) -> Bond<T> {
        self.inner.value_bond.clone()
    }

    /// Make `target` follow this cell. `target` takes the current value
    /// immediately (if set) and every later one. The binding is weak: neither
    /// cell keeps the other alive.
    pub fn drive(&self, target: &Dynamic<T>) {
        target.value_bond().bind(self, true, false);
    }

    /// Keep `object` alive for as long as this cell exists.
    pub fn retain(&self, object: impl Any) {
        self.inner.retained.borrow_mut().push(Box::new(object));
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakDynamic<T> {
        WeakDynamic {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Dynamic<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn attach(&self, bond: Weak<BondInner<T>>) {
        self.inner.bonds.borrow_mut().push(bond);
    }

    pub(crate) fn detach(&self, bond: &Weak<BondInner<T>>) {
        self.inner
            .bonds
            .borrow_mut()
            .retain(|w| w.strong_count() > 0 && !Weak::ptr_eq(w, bond));
    }

    /// Deliver a structural event to every bond with an array listener.
    pub(crate) fn dispatch_array_event(&self, event: &ArrayEvent) {
        for weak in self.snapshot_bonds() {
            let Some(bond) = weak.upgrade() else {
                continue;
            };
            if let Some(listener) = bond.array_listener() {
                listener(event);
            }
        }
    }

    /// Prune dead bonds and return the live set, in registration order.
    fn snapshot_bonds(&self) -> Vec<Weak<BondInner<T>>> {
        let mut bonds = self.inner.bonds.borrow_mut();
        bonds.retain(|w| w.strong_count() > 0);
        bonds.clone()
    }

    fn dispatch(&self) {
        if self.inner.dispatching.get() {
            tracing::trace!("re-entrant write suppressed; notification coalesced");
            return;
        }
        let _guard = DispatchGuard::enter(&self.inner.dispatching);

        let bonds = self.snapshot_bonds();
        tracing::trace!(bonds = bonds.len(), "dispatching value");

        // Clone the value only if some listener will receive it.
        let wanted = bonds
            .iter()
            .any(|w| w.upgrade().is_some_and(|b| b.has_listener()));
        if !wanted {
            return;
        }
        let value = self.inner.value.borrow().clone();
        let Some(value) = value else {
            return;
        };

        // Bonds dropped by an earlier listener in this loop are skipped.
        for weak in &bonds {
            let Some(bond) = weak.upgrade() else {
                continue;
            };
            if let Some(listener) = bond.listener() {
                listener(&value);
            }
        }
    }
}

/// Holds a cell's dispatch flag for the duration of one dispatch.
struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        let depth = DISPATCH_DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        if depth == BondConfig::global().cascade_warn_depth {
            tracing::warn!(depth, "dispatch cascade reached warning depth");
        }
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
        DISPATCH_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
