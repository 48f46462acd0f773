//! Property-based invariant tests for derived collection views.
//!
//! For any sequence of mutations on a source array:
//!
//! 1. The filtered view equals a fresh `source.filter(pred)`.
//! 2. Filtered pointers are strictly increasing and in source bounds.
//! 3. The mapped view equals `transform(source[i], i)`.
//! 4. `count == len` for the source and every view.
//! 5. Replaying a view's `did` events onto a replica reproduces the view.
//! 6. Linear and binary pointer search produce identical event streams.

use std::cell::RefCell;
use std::rc::Rc;

use bond_core::{
    ArrayChange, ArrayEvent, ArrayView, ArrayViewExt, Bond, BondConfig, DynamicArray, Phase,
    PointerSearch,
};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Append(i32),
    Insert(i32, usize),
    Splice(Vec<i32>, usize),
    RemoveAt(usize),
    RemoveLast,
    RemoveAll,
    Set(usize, i32),
    Reset(Vec<i32>),
}

fn arb_value() -> impl Strategy<Value = i32> {
    -20i32..20
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_value().prop_map(Op::Append),
        4 => (arb_value(), any::<usize>()).prop_map(|(v, i)| Op::Insert(v, i)),
        2 => (prop::collection::vec(arb_value(), 0..5), any::<usize>())
            .prop_map(|(vs, i)| Op::Splice(vs, i)),
        4 => any::<usize>().prop_map(Op::RemoveAt),
        1 => Just(Op::RemoveLast),
        1 => Just(Op::RemoveAll),
        5 => (any::<usize>(), arb_value()).prop_map(|(i, v)| Op::Set(i, v)),
        1 => prop::collection::vec(arb_value(), 0..8).prop_map(Op::Reset),
    ]
}

fn arb_initial() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(arb_value(), 0..12)
}

/// Apply `op` with indices folded into the valid range. Ops that need an
/// element are skipped on an empty array.
fn apply(array: &DynamicArray<i32>, op: &Op) {
    let len = array.len();
    match op {
        Op::Append(v) => array.append(*v),
        Op::Insert(v, i) => array.insert(*v, i % (len + 1)),
        Op::Splice(vs, i) => array.splice(vs.clone(), i % (len + 1)),
        Op::RemoveAt(i) if len > 0 => {
            array.remove_at(i % len);
        }
        Op::RemoveLast if len > 0 => {
            array.remove_last();
        }
        Op::RemoveAll => array.remove_all(),
        Op::Set(i, v) => array.set(i % (len + 1), *v),
        Op::Reset(vs) => array.set_array(vs.clone()),
        Op::RemoveAt(_) | Op::RemoveLast => {}
    }
}

fn keep(v: &i32) -> bool {
    v.rem_euclid(3) != 0
}

fn transform(v: &i32, i: usize) -> i64 {
    i64::from(*v) * 100 + i as i64
}

fn checked_config(search: PointerSearch) -> BondConfig {
    BondConfig::default()
        .with_pointer_search(search)
        .with_verify_pointers(true)
}

/// Mirror a view by applying its `did` events, reading new elements from
/// the view itself.
fn replica<V>(view: &V) -> (Rc<RefCell<Vec<V::Item>>>, Bond<Vec<V::Item>>)
where
    V: ArrayView + bond_core::Bindable<Vec<<V as ArrayView>::Item>> + Clone + 'static,
{
    let mirror = Rc::new(RefCell::new(view.to_vec()));
    let sink = Rc::clone(&mirror);
    let reader = view.clone();
    let bond = Bond::detached().with_array_listener(move |ev: &ArrayEvent| {
        if ev.phase != Phase::Did {
            return;
        }
        let mut mirror = sink.borrow_mut();
        match &ev.change {
            ArrayChange::Insert(positions) => {
                let mut positions = positions.clone();
                positions.sort_unstable();
                for pos in positions {
                    mirror.insert(pos, reader.get(pos));
                }
            }
            ArrayChange::Remove(positions) => {
                let mut positions = positions.clone();
                positions.sort_unstable_by(|a, b| b.cmp(a));
                for pos in positions {
                    mirror.remove(pos);
                }
            }
            ArrayChange::Update(positions) => {
                for &pos in positions {
                    mirror[pos] = reader.get(pos);
                }
            }
            ArrayChange::Reset => *mirror = reader.to_vec(),
        }
    });
    bond.bind(view, false, false);
    (mirror, bond)
}

fn event_log<V>(view: &V) -> (Rc<RefCell<Vec<ArrayEvent>>>, Bond<Vec<V::Item>>)
where
    V: ArrayView + bond_core::Bindable<Vec<<V as ArrayView>::Item>>,
{
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let bond = Bond::detached().with_array_listener(move |ev| sink.borrow_mut().push(ev.clone()));
    bond.bind(view, false, false);
    (log, bond)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Views agree with naive recomputation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn views_match_naive_recomputation(
        initial in arb_initial(),
        ops in prop::collection::vec(arb_op(), 0..40),
        binary in any::<bool>(),
    ) {
        let search = if binary { PointerSearch::Binary } else { PointerSearch::Linear };
        let source = DynamicArray::new(initial);
        let filtered = source.filter_with(keep, checked_config(search));
        let mapped = source.map(transform);
        let scaled_even = source
            .map_values(|v| i64::from(*v) * 3)
            .filter_with(|v| v % 2 == 0, checked_config(search));

        for op in &ops {
            apply(&source, op);
            let current = source.to_vec();

            let expected: Vec<i32> = current.iter().copied().filter(keep).collect();
            prop_assert_eq!(filtered.to_vec(), expected, "after {:?}", op);

            let pointers = filtered.pointers();
            prop_assert!(pointers.windows(2).all(|w| w[0] < w[1]), "unsorted {:?}", pointers);
            prop_assert!(pointers.iter().all(|&p| p < current.len()));

            let projected: Vec<i64> =
                current.iter().enumerate().map(|(i, v)| transform(v, i)).collect();
            prop_assert_eq!(mapped.to_vec(), projected);
            let scaled: Vec<i64> = current
                .iter()
                .map(|v| i64::from(*v) * 3)
                .filter(|v| v % 2 == 0)
                .collect();
            prop_assert_eq!(scaled_even.to_vec(), scaled);

            prop_assert_eq!(source.count().value(), current.len());
            prop_assert_eq!(filtered.count().value(), filtered.len());
            prop_assert_eq!(mapped.count().value(), mapped.len());
            prop_assert_eq!(scaled_even.count().value(), scaled_even.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Event replay reproduces every view
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn did_events_replay_onto_replica(
        initial in arb_initial(),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let source = DynamicArray::new(initial);
        let filtered = source.filter_with(keep, checked_config(PointerSearch::Binary));
        let nested = filtered.filter_with(|v| *v >= 0, checked_config(PointerSearch::Linear));
        // Index-independent, so shifted elements keep their projected value.
        let mapped = filtered.map_values(|v| i64::from(*v) * 7);

        let (source_copy, _b0) = replica(&source);
        let (filtered_copy, _b1) = replica(&filtered);
        let (nested_copy, _b2) = replica(&nested);
        let (mapped_copy, _b3) = replica(&mapped);

        for op in &ops {
            apply(&source, op);
            prop_assert_eq!(source_copy.borrow().clone(), source.to_vec(), "after {:?}", op);
            prop_assert_eq!(filtered_copy.borrow().clone(), filtered.to_vec(), "after {:?}", op);
            prop_assert_eq!(nested_copy.borrow().clone(), nested.to_vec(), "after {:?}", op);
            prop_assert_eq!(mapped_copy.borrow().clone(), mapped.to_vec(), "after {:?}", op);
        }
    }

    #[test]
    fn every_will_is_followed_by_matching_did(
        initial in arb_initial(),
        ops in prop::collection::vec(arb_op(), 0..30),
    ) {
        let source = DynamicArray::new(initial);
        let filtered = source.filter_with(keep, checked_config(PointerSearch::Binary));
        let (log, _bond) = event_log(&filtered);

        for op in &ops {
            apply(&source, op);
        }

        let log = log.borrow();
        prop_assert_eq!(log.len() % 2, 0);
        for pair in log.chunks(2) {
            prop_assert_eq!(pair[0].phase, Phase::Will);
            prop_assert_eq!(pair[1].phase, Phase::Did);
            prop_assert_eq!(&pair[0].change, &pair[1].change);
            if let Some(indices) = pair[0].indices() {
                prop_assert!(!indices.is_empty(), "empty event {}", pair[0]);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Search strategy is not observable
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn linear_and_binary_search_emit_identical_events(
        initial in arb_initial(),
        ops in prop::collection::vec(arb_op(), 0..30),
    ) {
        let source = DynamicArray::new(initial);
        let linear = source.filter_with(keep, checked_config(PointerSearch::Linear));
        let binary = source.filter_with(keep, checked_config(PointerSearch::Binary));
        let (linear_log, _b1) = event_log(&linear);
        let (binary_log, _b2) = event_log(&binary);

        for op in &ops {
            apply(&source, op);
            prop_assert_eq!(linear.pointers(), binary.pointers());
        }
        prop_assert_eq!(linear_log.borrow().clone(), binary_log.borrow().clone());
    }
}
