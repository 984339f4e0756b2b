// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for ring pool and pool chain handoff.

use criterion::{criterion_group, criterion_main, Criterion};
use mem_pools::{Buffer, PoolChain, RingPool};

fn bench_ring_cycle(c: &mut Criterion) {
    let pool = RingPool::prefilled(256, || Buffer::new(0u64)).unwrap();
    c.bench_function("ring_pop_push", |b| {
        b.iter(|| {
            let handle = pool.pop().unwrap();
            pool.push(handle).unwrap();
        })
    });
}

fn bench_chain_cycle(c: &mut Criterion) {
    let chain = PoolChain::new(256, || Buffer::new(0u64)).unwrap();
    c.bench_function("chain_pop_push", |b| {
        b.iter(|| {
            let handle = chain.pop().unwrap();
            chain.push(handle).unwrap();
        })
    });
}

criterion_group!(benches, bench_ring_cycle, bench_chain_cycle);
criterion_main!(benches);
