#![forbid(unsafe_code)]

//! Index-map patching for filtered views.
//!
//! A filtered view tracks the sorted source indices it admits. These helpers
//! compute the next index map for a source insert or remove without
//! rescanning the source, together with the filtered positions that changed.
//! They are pure so both the view and its tests can drive them directly.

use crate::config::PointerSearch;

/// Position of the first entry `>= target` in `sorted`, or `sorted.len()`.
#[must_use]
pub fn first_index_ge(sorted: &[usize], target: usize, search: PointerSearch) -> usize {
    match search {
        PointerSearch::Linear => sorted
            .iter()
            .position(|&p| p >= target)
            .unwrap_or(sorted.len()),
        PointerSearch::Binary => sorted.partition_point(|&p| p < target),
    }
}

/// Result of patching an index map for a source insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPatch {
    /// The index map after the insert.
    pub pointers: Vec<usize>,
    /// The old entries renumbered for the insert, before any new entry is
    /// added. Element-wise this describes the same elements as the old map.
    pub shifted: Vec<usize>,
    /// Filtered positions of the admitted elements, ascending.
    pub positions: Vec<usize>,
}

/// Result of patching an index map for a source remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovePatch {
    pub pointers: Vec<usize>,
    /// Filtered positions that were dropped, descending.
    pub positions: Vec<usize>,
}

/// Patch `pointers` for source elements inserted at `inserted` (post-insert
/// source indices). `passes(idx)` reports whether the element now at source
/// index `idx` is admitted.
pub fn patch_insert(
    pointers: &[usize],
    inserted: &[usize],
    mut passes: impl FnMut(usize) -> bool,
    search: PointerSearch,
) -> InsertPatch {
    let mut order = inserted.to_vec();
    order.sort_unstable();
    order.dedup();

    let mut next = pointers.to_vec();
    let mut shifted = pointers.to_vec();
    let mut positions = Vec::new();

    for &idx in &order {
        let start = first_index_ge(&next, idx, search);
        for p in &mut next[start..] {
            *p += 1;
        }
        let shift_start = first_index_ge(&shifted, idx, search);
        for p in &mut shifted[shift_start..] {
            *p += 1;
        }
        if passes(idx) {
            next.insert(start, idx);
            positions.push(start);
        }
    }

    InsertPatch {
        pointers: next,
        shifted,
        positions,
    }
}

/// Patch `pointers` for source elements removed at `removed` (pre-remove
/// source indices).
#[must_use]
pub fn patch_remove(pointers: &[usize], removed: &[usize], search: PointerSearch) -> RemovePatch {
    let mut order = removed.to_vec();
    order.sort_unstable_by(|a, b| b.cmp(a));
    order.dedup();

    let mut next = pointers.to_vec();
    let mut positions = Vec::new();

    for &idx in &order {
        let start = first_index_ge(&next, idx, search);
        if next.get(start) == Some(&idx) {
            next.remove(start);
            positions.push(start);
        }
        // Everything from `start` on is now > idx.
        for p in &mut next[start..] {
            *p -= 1;
        }
    }

    RemovePatch {
        pointers: next,
        positions,
    }
}

/// Admitted source indices of `len` elements, by full scan.
pub fn scan(len: usize, mut passes: impl FnMut(usize) -> bool) -> Vec<usize> {
    (0..len).filter(|&i| passes(i)).collect()
}

/// Whether `pointers` is strictly increasing and every entry is `< source_len`.
#[must_use]
pub fn is_consistent(pointers: &[usize], source_len: usize) -> bool {
    pointers.windows(2).all(|w| w[0] < w[1]) && pointers.last().is_none_or(|&p| p < source_len)
}
