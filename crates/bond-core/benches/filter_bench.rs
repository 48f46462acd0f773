//! Benchmarks for filtered-view maintenance.
//!
//! Run with: `cargo bench --package bond-core --bench filter_bench`
//!
//! Compares incremental index-map patching against a full rescan, and the
//! two pointer search strategies against each other.
//!
//! # Criterion Output
//!
//! Results are written to `target/criterion/filter_bench/`.

use bond_core::view::pointers::{self, patch_insert, patch_remove};
use bond_core::{ArrayView, ArrayViewExt, Bond, BondConfig, DynamicArray, PointerSearch};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const SIZES: [usize; 3] = [100, 1_000, 10_000];
const SEARCHES: [PointerSearch; 2] = [PointerSearch::Linear, PointerSearch::Binary];

fn config(search: PointerSearch) -> BondConfig {
    BondConfig::default()
        .with_pointer_search(search)
        .with_verify_pointers(false)
}

/// Every third index admitted.
fn sparse_pointers(len: usize) -> Vec<usize> {
    (0..len).filter(|i| i % 3 == 0).collect()
}

// ============================================================================
// Pointer patching
// ============================================================================

fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_bench/patch");
    for &len in &SIZES {
        let pointers = sparse_pointers(len);
        let middle = len / 2;
        for search in SEARCHES {
            group.bench_with_input(
                BenchmarkId::new(format!("insert_{search}"), len),
                &pointers,
                |b, pointers| {
                    b.iter(|| {
                        black_box(patch_insert(
                            black_box(pointers),
                            &[middle],
                            |i| i % 2 == 0,
                            search,
                        ))
                    });
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("remove_{search}"), len),
                &pointers,
                |b, pointers| {
                    b.iter(|| black_box(patch_remove(black_box(pointers), &[middle], search)));
                },
            );
        }
        group.bench_with_input(BenchmarkId::new("rescan", len), &len, |b, &len| {
            b.iter(|| black_box(pointers::scan(len, |i| i % 3 == 0)));
        });
    }
    group.finish();
}

// ============================================================================
// End-to-end view updates
// ============================================================================

fn bench_view_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_bench/view");
    for &len in &SIZES {
        group.throughput(Throughput::Elements(1));
        for search in SEARCHES {
            group.bench_function(BenchmarkId::new(format!("toggle_{search}"), len), |b| {
                let source = DynamicArray::new((0..len as i64).collect::<Vec<_>>());
                let view = source.filter_with(|v| v % 2 == 0, config(search));
                let observer = Bond::detached().with_array_listener(|ev| {
                    black_box(ev);
                });
                observer.bind(&view, false, false);
                let at = len / 2;
                let mut flip = false;
                b.iter(|| {
                    flip = !flip;
                    source.set(at, if flip { 1 } else { 2 });
                    black_box(view.len())
                });
            });
        }
        group.bench_function(BenchmarkId::new("append", len), |b| {
            let source = DynamicArray::new((0..len as i64).collect::<Vec<_>>());
            let view = source.filter_with(|v| v % 2 == 0, config(PointerSearch::Binary));
            b.iter(|| {
                source.append(black_box(4));
                source.remove_last();
                black_box(view.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_patch, bench_view_updates);
criterion_main!(benches);
