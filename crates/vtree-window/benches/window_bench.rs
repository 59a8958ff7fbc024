//! Benchmarks for the windowed list.
//!
//! Run with: cargo bench -p vtree-window

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vtree_core::{Align, WindowedRenderer};
use vtree_window::{VirtualList, WindowConfig};

fn extents(count: usize) -> Vec<u32> {
    (0..count).map(|i| 16 + (i % 7) as u32 * 4).collect()
}

// ============================================================================
// Sync
// ============================================================================

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/sync");

    for count in [1_000, 10_000, 100_000] {
        let rows = extents(count);
        let mut list = VirtualList::new(WindowConfig::new(600)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| {
                list.sync(rows);
                black_box(list.total_extent())
            })
        });
    }

    group.finish();
}

// ============================================================================
// Scroll and range queries
// ============================================================================

fn bench_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/scroll");

    for count in [10_000, 100_000] {
        let mut list = VirtualList::new(WindowConfig::new(600)).unwrap();
        list.sync(&extents(count));
        let max = list.max_scroll_offset();

        group.bench_with_input(BenchmarkId::new("visible_range", count), &(), |b, _| {
            let mut offset = 0u64;
            b.iter(|| {
                offset = (offset + 997) % max;
                list.scroll_to(offset);
                black_box(list.render_range())
            })
        });

        group.bench_with_input(BenchmarkId::new("scroll_to_item", count), &(), |b, _| {
            let mut index = 0usize;
            b.iter(|| {
                index = (index + 4_099) % count;
                list.scroll_to_item(index, Align::Smart);
                black_box(list.scroll_offset())
            })
        });
    }

    group.finish();
}

// ============================================================================
// Resize
// ============================================================================

fn bench_reset_after_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/reset_after_index");

    let count = 100_000;
    let mut rows = extents(count);
    let mut list = VirtualList::new(WindowConfig::new(600)).unwrap();
    list.sync(&rows);

    for from in [count - 10, count / 2] {
        group.bench_with_input(BenchmarkId::from_parameter(from), &from, |b, &from| {
            b.iter(|| {
                rows[from] ^= 8;
                list.reset_after_index(from, &rows, false);
                black_box(list.total_extent())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sync, bench_scroll, bench_reset_after_index);
criterion_main!(benches);
