// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: chain growth under sustained draining, cross-pool
//! returns, leak accounting, and threaded SPSC handoff.

use mem_pools::{Buffer, PoolChain, RingPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_sustained_drain_grows_chain() {
    // Usable capacity 1 per ring, every buffer seeded with 777.
    let chain = PoolChain::new(2, || Buffer::new(777u32)).unwrap();

    let mut held = Vec::with_capacity(500);
    for _ in 0..500 {
        let handle = chain.pop().expect("pop after growth must succeed");
        assert_eq!(**handle, 777);
        held.push(handle);
    }
    assert!(chain.pool_count() >= 500);

    for handle in held {
        chain.push(handle).expect("total capacity matches handles");
    }
}

#[test]
fn test_cross_pool_return_frees_everything() {
    static LIVE: AtomicUsize = AtomicUsize::new(0);

    struct Payload;
    impl Payload {
        fn new() -> Self {
            LIVE.fetch_add(1, Ordering::Relaxed);
            Self
        }
    }
    impl Drop for Payload {
        fn drop(&mut self) {
            LIVE.fetch_sub(1, Ordering::Relaxed);
        }
    }

    let chain = PoolChain::new(2, || Buffer::new(Payload::new())).unwrap();

    let mut held = Vec::with_capacity(500);
    for _ in 0..500 {
        held.push(chain.pop().unwrap());
    }
    assert_eq!(LIVE.load(Ordering::Relaxed), 500);

    // Return the handles in a scrambled order so they land in different
    // rings than they came from.
    held.reverse();
    let back_half = held.split_off(250);
    for (a, b) in held.into_iter().zip(back_half) {
        assert!(chain.push(b).is_ok());
        assert!(chain.push(a).is_ok());
    }

    drop(chain);
    assert_eq!(LIVE.load(Ordering::Relaxed), 0);
}

#[test]
fn test_pop_then_push_is_identity_on_live_set() {
    let chain = PoolChain::new(4, || Buffer::new(3u64)).unwrap();
    for _ in 0..100 {
        let handle = chain.pop().unwrap();
        chain.push(handle).unwrap();
    }
    // Balanced traffic never needs a second ring.
    assert_eq!(chain.pool_count(), 1);
}

#[test]
fn test_minimum_ring_capacity() {
    // A request for capacity 1 rounds up to 2 slots, 1 usable.
    let pool = RingPool::prefilled(1, || Buffer::new(0u8)).unwrap();
    assert_eq!(pool.capacity(), 2);
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_spsc_handoff_across_threads() {
    const ITEMS: usize = 10_000;

    let ring = Arc::new(RingPool::<usize>::vacant(64));
    let producer_ring = Arc::clone(&ring);

    let producer = std::thread::spawn(move || {
        for value in 0..ITEMS {
            let mut handle = Box::new(Buffer::new(value).unwrap());
            loop {
                match producer_ring.push(handle) {
                    Ok(()) => break,
                    Err(back) => {
                        handle = back;
                        std::thread::yield_now();
                    }
                }
            }
        }
    });

    let mut received = 0usize;
    let mut sum = 0usize;
    while received < ITEMS {
        match ring.pop() {
            Some(handle) => {
                sum += **handle;
                received += 1;
            }
            None => std::thread::yield_now(),
        }
    }
    producer.join().unwrap();

    assert_eq!(sum, ITEMS * (ITEMS - 1) / 2);
    assert!(ring.is_empty());
}

#[test]
fn test_chain_handoff_across_threads() {
    const ROUNDS: usize = 2_000;

    let chain = Arc::new(PoolChain::new(4, || Buffer::new(0u64)).unwrap());
    let returner = Arc::clone(&chain);

    let (tx, rx) = std::sync::mpsc::channel::<Box<Buffer<u64>>>();

    // Producer side of the chain: returns handles it receives.
    let producer = std::thread::spawn(move || {
        let mut returned = 0usize;
        while returned < ROUNDS {
            let mut handle = rx.recv().unwrap();
            loop {
                match returner.push(handle) {
                    Ok(()) => break,
                    Err(back) => {
                        handle = back;
                        std::thread::yield_now();
                    }
                }
            }
            returned += 1;
        }
    });

    // Consumer side: pops (growing as needed) and sends the handle over.
    for _ in 0..ROUNDS {
        let handle = chain.pop().unwrap();
        tx.send(handle).unwrap();
    }
    producer.join().unwrap();
}
