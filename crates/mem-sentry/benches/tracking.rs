// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the tracking allocator's hot paths.

use criterion::{criterion_group, criterion_main, Criterion};
use mem_sentry::{tracking, Heap};

fn bench_alloc_free(c: &mut Criterion) {
    let heap = Heap::new("bench");
    c.bench_function("tracked_alloc_free_64b", |b| {
        b.iter(|| {
            let ptr = tracking::allocate(64, &heap).unwrap();
            unsafe { tracking::deallocate(ptr.as_ptr()) };
        })
    });
}

fn bench_aligned_alloc_free(c: &mut Criterion) {
    let heap = Heap::new("bench-aligned");
    c.bench_function("tracked_alloc_free_64b_align64", |b| {
        b.iter(|| {
            let ptr = tracking::allocate_aligned(64, 64, &heap).unwrap();
            unsafe { tracking::deallocate(ptr.as_ptr()) };
        })
    });
}

criterion_group!(benches, bench_alloc_free, bench_aligned_alloc_free);
criterion_main!(benches);
