#![forbid(unsafe_code)]

//! Derived single-value cells.
//!
//! Every combinator returns a fresh [`Dynamic`] that retains the bonds feeding
//! it. Those bonds own their sources, so a derived cell keeps its inputs
//! alive; the bonds only reach the derived cell weakly.

use std::cell::Cell;
use std::rc::Rc;

use crate::bond::Bond;
use crate::dynamic::{Dynamic, WeakDynamic};

/// Build a cell fed by one bond on `source`.
fn derive<T, U>(
    source: &Dynamic<T>,
    initial: Option<U>,
    on_value: impl Fn(&Dynamic<U>, &T) + 'static,
) -> Dynamic<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let derived = match initial {
        Some(value) => Dynamic::new(value),
        None => Dynamic::unset(),
    };
    feed(&derived, source, on_value);
    derived
}

/// Bind a new bond on `source` whose values are handed to `on_value` along
/// with `target`, and make `target` retain it.
fn feed<T, U>(
    target: &Dynamic<U>,
    source: &Dynamic<T>,
    on_value: impl Fn(&Dynamic<U>, &T) + 'static,
) where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let weak = target.downgrade();
    let bond = Bond::new(move |value: &T| {
        if let Some(target) = weak.upgrade() {
            on_value(&target, value);
        }
    });
    bond.bind(source, false, true);
    target.retain(bond);
}

impl<T: Clone + 'static> Dynamic<T> {
    /// A cell holding `f` of this cell's value.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Dynamic<U> {
        let initial = self.try_value().ok().map(|v| f(&v));
        derive(self, initial, move |out, value| out.set(f(value)))
    }

    /// A cell that only takes values passing `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Dynamic<T> {
        let initial = self.try_value().ok().filter(|v| predicate(v));
        derive(self, initial, move |out, value| {
            if predicate(value) {
                out.set(value.clone());
            }
        })
    }

    /// A cell that only takes values `v` for which `f(v, &reference)` holds.
    pub fn filter_against(
        &self,
        f: impl Fn(&T, &T) -> bool + 'static,
        reference: T,
    ) -> Dynamic<T> {
        self.filter(move |v| f(v, &reference))
    }

    /// A cell that becomes `value` whenever this cell changes.
    pub fn rewrite<U: Clone + 'static>(&self, value: U) -> Dynamic<U> {
        self.map(move |_| value.clone())
    }

    /// Pair every value with a fixed `value`.
    pub fn zip_value<U: Clone + 'static>(&self, value: U) -> Dynamic<(T, U)> {
        self.map(move |v| (v.clone(), value.clone()))
    }

    /// Pair this cell with `other`; see [`reduce`].
    pub fn zip<U: Clone + 'static>(&self, other: &Dynamic<U>) -> Dynamic<(T, U)> {
        reduce(self, other, |a, b| (a.clone(), b.clone()))
    }

    /// Ignore the first `count` notifications. With `count == 0` the current
    /// value is copied as well.
    pub fn skip(&self, count: usize) -> Dynamic<T> {
        let initial = if count == 0 {
            self.try_value().ok()
        } else {
            None
        };
        let remaining = Cell::new(count);
        derive(self, initial, move |out, value| {
            let left = remaining.get();
            if left == 0 {
                out.set(value.clone());
            } else {
                remaining.set(left - 1);
            }
        })
    }
}

/// A cell holding `f(a, b)`, recomputed whenever either input changes while
/// both are set.
pub fn reduce<A, B, R>(
    a: &Dynamic<A>,
    b: &Dynamic<B>,
    f: impl Fn(&A, &B) -> R + 'static,
) -> Dynamic<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + 'static,
{
    let initial = match (a.try_value(), b.try_value()) {
        (Ok(va), Ok(vb)) => Some(f(&va, &vb)),
        _ => None,
    };
    let derived = match initial {
        Some(value) => Dynamic::new(value),
        None => Dynamic::unset(),
    };

    let f = Rc::new(f);
    let (other_b, f_a) = (b.downgrade(), Rc::clone(&f));
    feed(&derived, a, move |out, va| {
        if let Some(vb) = current(&other_b) {
            out.set(f_a(va, &vb));
        }
    });
    let other_a = a.downgrade();
    feed(&derived, b, move |out, vb| {
        if let Some(va) = current(&other_a) {
            out.set(f(&va, vb));
        }
    });
    derived
}

/// Three-input [`reduce`].
pub fn reduce3<A, B, C, R>(
    a: &Dynamic<A>,
    b: &Dynamic<B>,
    c: &Dynamic<C>,
    f: impl Fn(&A, &B, &C) -> R + 'static,
) -> Dynamic<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    R: Clone + 'static,
{
    let initial = match (a.try_value(), b.try_value(), c.try_value()) {
        (Ok(va), Ok(vb), Ok(vc)) => Some(f(&va, &vb, &vc)),
        _ => None,
    };
    let derived = match initial {
        Some(value) => Dynamic::new(value),
        None => Dynamic::unset(),
    };

    let f = Rc::new(f);
    let (wa, wb, wc) = (a.downgrade(), b.downgrade(), c.downgrade());

    let (f_a, wb_a, wc_a) = (Rc::clone(&f), wb.clone(), wc.clone());
    feed(&derived, a, move |out, va| {
        if let (Some(vb), Some(vc)) = (current(&wb_a), current(&wc_a)) {
            out.set(f_a(va, &vb, &vc));
        }
    });
    let (f_b, wa_b) = (Rc::clone(&f), wa.clone());
    feed(&derived, b, move |out, vb| {
        if let (Some(va), Some(vc)) = (current(&wa_b), current(&wc)) {
            out.set(f_b(&va, vb, &vc));
        }
    });
    feed(&derived, c, move |out, vc| {
        if let (Some(va), Some(vb)) = (current(&wa), current(&wb)) {
            out.set(f(&va, &vb, vc));
        }
    });
    derived
}

/// A cell that takes the latest value from any of `sources`. Starts unset.
pub fn any<T: Clone + 'static>(sources: &[Dynamic<T>]) -> Dynamic<T> {
    let derived = Dynamic::unset();
    for source in sources {
        feed(&derived, source, |out, value| out.set(value.clone()));
    }
    derived
}

fn current<T: Clone + 'static>(cell: &WeakDynamic<T>) -> Option<T> {
    cell.upgrade().and_then(|cell| cell.try_value().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn map_tracks_source() {
        let source = Dynamic::new(2);
        let doubled = source.map(|v| v * 2);
        assert_eq!(doubled.value(), 4);
        source.set(5);
        assert_eq!(doubled.value(), 10);
    }

    #[test]
    fn map_of_unset_stays_unset_until_first_set() {
        let source: Dynamic<i32> = Dynamic::unset();
        let shown = source.map(|v| v.to_string());
        assert!(!shown.is_set());
        source.set(7);
        assert_eq!(shown.value(), "7");
    }

    #[test]
    fn filter_drops_failing_values() {
        let source = Dynamic::new(1);
        let evens = source.filter(|v| v % 2 == 0);
        assert!(!evens.is_set());
        source.set(4);
        source.set(5);
        assert_eq!(evens.value(), 4);
    }

    #[test]
    fn filter_against_compares_with_reference() {
        let volume = Dynamic::new(3);
        let loud = volume.filter_against(|v, limit| v > limit, 5);
        assert!(!loud.is_set());
        volume.set(8);
        volume.set(2);
        assert_eq!(loud.value(), 8);
        volume.set(6);
        assert_eq!(loud.value(), 6);
    }

    #[test]
    fn rewrite_and_zip_value() {
        let taps = Dynamic::new(());
        let label = taps.rewrite("tapped");
        let tagged = taps.zip_value(3u8);
        taps.set(());
        assert_eq!(label.value(), "tapped");
        assert_eq!(tagged.value(), ((), 3));
    }

    #[test]
    fn zip_waits_for_both() {
        let a = Dynamic::new(1);
        let b: Dynamic<&str> = Dynamic::unset();
        let pair = a.zip(&b);
        assert!(!pair.is_set());

        a.set(2);
        assert!(!pair.is_set());
        b.set("x");
        assert_eq!(pair.value(), (2, "x"));
        a.set(3);
        assert_eq!(pair.value(), (3, "x"));
    }

    #[test]
    fn reduce_recomputes_on_either_input() {
        let a = Dynamic::new(1);
        let b = Dynamic::new(10);
        let sum = reduce(&a, &b, |x, y| x + y);
        assert_eq!(sum.value(), 11);
        b.set(20);
        assert_eq!(sum.value(), 21);
        a.set(5);
        assert_eq!(sum.value(), 25);
    }

    #[test]
    fn reduce3_combines_all() {
        let a = Dynamic::new(1);
        let b = Dynamic::new(2);
        let c = Dynamic::new(3);
        let joined = reduce3(&a, &b, &c, |x, y, z| format!("{x}{y}{z}"));
        assert_eq!(joined.value(), "123");
        c.set(9);
        assert_eq!(joined.value(), "129");
        b.set(0);
        assert_eq!(joined.value(), "109");
    }

    #[test]
    fn skip_ignores_first_notifications() {
        let source = Dynamic::new(0);
        let later = source.skip(2);
        assert!(!later.is_set());
        source.set(1);
        source.set(2);
        assert!(!later.is_set());
        source.set(3);
        assert_eq!(later.value(), 3);

        let copied = source.skip(0);
        assert_eq!(copied.value(), 3);
    }

    #[test]
    fn any_takes_latest_from_any_source() {
        let a = Dynamic::new(1);
        let b = Dynamic::new(2);
        let latest = any(&[a.clone(), b.clone()]);
        assert!(!latest.is_set());
        b.set(20);
        assert_eq!(latest.value(), 20);
        a.set(10);
        assert_eq!(latest.value(), 10);
    }

    #[test]
    fn derived_cell_keeps_sources_alive() {
        let (derived, weak_source) = {
            let source = Dynamic::new(1);
            (source.map(|v| v + 1), source.downgrade())
        };
        assert!(weak_source.is_alive());
        weak_source.upgrade().unwrap().set(4);
        assert_eq!(derived.value(), 5);

        drop(derived);
        assert!(!weak_source.is_alive());
    }

    #[test]
    fn chained_combinators_notify_downstream() {
        let source = Dynamic::new(1);
        let text = source.filter(|v| *v > 0).map(|v| format!("#{v}"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let bond = Bond::new(move |v: &String| seen_clone.borrow_mut().push(v.clone()));
        bond.bind(&text, true, false);

        source.set(-1);
        source.set(2);
        assert_eq!(*seen.borrow(), vec!["#1", "#2"]);
    }
}
