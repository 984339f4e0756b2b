// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Growable chain of ring pools.
//!
//! A [`PoolChain`] links [`RingPool`]s into a singly-linked list that
//! grows when drained: `pop` walks the chain head to tail, and when every
//! ring is empty it appends a fresh, pre-populated ring and pops from
//! that — so `pop` always produces a buffer as long as memory holds out.
//! `push` walks the same way and deposits into the first ring with a free
//! slot, but deliberately never grows the chain; a rejected push means
//! the caller raced ahead of capacity the consumer created.
//!
//! # Concurrency model
//! Each ring is SPSC, and only the popping thread appends pools, so a
//! chain as a whole operates under the same single-producer/single-
//! consumer discipline. New nodes are published with a release store of
//! the previous tail's `next`; traversals acquire-load their way down the
//! list and therefore always observe fully initialised nodes.

use crate::buffer::Buffer;
use crate::error::PoolError;
use crate::ring::RingPool;
use crossbeam_utils::CachePadded;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

type BufferFactory<T> = Box<dyn Fn() -> Result<Buffer<T>, PoolError> + Send + Sync>;

struct ChainNode<T> {
    pool: RingPool<T>,
    next: CachePadded<AtomicPtr<ChainNode<T>>>,
}

impl<T> ChainNode<T> {
    fn boxed(pool: RingPool<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            pool,
            next: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
        }))
    }
}

/// A linked list of pre-populated SPSC rings sharing one buffer factory.
///
/// # Example
/// ```
/// use mem_pools::{Buffer, PoolChain};
///
/// // Rings of usable capacity 3, each buffer seeded with 0u64.
/// let chain = PoolChain::new(4, || Buffer::new(0u64)).unwrap();
///
/// let a = chain.pop().unwrap();
/// let b = chain.pop().unwrap();
/// chain.push(a).unwrap();
/// chain.push(b).unwrap();
/// ```
pub struct PoolChain<T> {
    head: CachePadded<AtomicPtr<ChainNode<T>>>,
    tail: CachePadded<AtomicPtr<ChainNode<T>>>,
    /// Per-ring slot count, already rounded to a power of two.
    queue_size: usize,
    factory: BufferFactory<T>,
}

// Nodes are reached only through the atomic links; ring access follows
// the SPSC discipline documented above.
unsafe impl<T: Send> Send for PoolChain<T> {}
unsafe impl<T: Send> Sync for PoolChain<T> {}

impl<T> PoolChain<T> {
    /// Creates a chain with one ring of `queue_size` slots (rounded up to
    /// a power of two, minimum 2; usable capacity is one less). `factory`
    /// is stored and used to populate every ring this chain ever builds.
    pub fn new<F>(queue_size: usize, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> Result<Buffer<T>, PoolError> + Send + Sync + 'static,
    {
        let queue_size = queue_size.next_power_of_two().max(2);
        let factory: BufferFactory<T> = Box::new(factory);
        let first = RingPool::prefilled(queue_size, &factory)?;
        let node = ChainNode::boxed(first);
        Ok(Self {
            head: CachePadded::new(AtomicPtr::new(node)),
            tail: CachePadded::new(AtomicPtr::new(node)),
            queue_size,
            factory,
        })
    }

    /// Takes a buffer from the first non-empty ring, growing the chain if
    /// every ring is drained. Only fails when building a new ring fails.
    ///
    /// Consumer-side: at most one thread may pop (and thereby grow).
    pub fn pop(&self) -> Result<Box<Buffer<T>>, PoolError> {
        loop {
            let mut current = self.head.load(Ordering::Acquire);
            while !current.is_null() {
                let node = unsafe { &*current };
                if let Some(handle) = node.pool.pop() {
                    return Ok(handle);
                }
                current = node.next.load(Ordering::Acquire);
            }
            // Everything is drained: append a pre-populated ring and go
            // around again; the new ring is guaranteed to serve us.
            self.add_pool()?;
        }
    }

    /// Deposits a handle into the first ring with a free slot. The handle
    /// comes back in `Err` when every ring is full — the chain does not
    /// grow on push.
    ///
    /// Producer-side: at most one thread may push.
    pub fn push(&self, handle: Box<Buffer<T>>) -> Result<(), Box<Buffer<T>>> {
        let mut handle = handle;
        let mut current = self.head.load(Ordering::Acquire);
        while !current.is_null() {
            let node = unsafe { &*current };
            match node.pool.push(handle) {
                Ok(()) => return Ok(()),
                Err(rejected) => handle = rejected,
            }
            current = node.next.load(Ordering::Acquire);
        }
        Err(handle)
    }

    /// Number of rings currently linked.
    pub fn pool_count(&self) -> usize {
        let mut count = 0;
        let mut current = self.head.load(Ordering::Acquire);
        while !current.is_null() {
            count += 1;
            current = unsafe { &*current }.next.load(Ordering::Acquire);
        }
        count
    }

    /// Builds a ring via the stored factory and links it at the tail.
    /// Single writer: only the popping thread gets here.
    fn add_pool(&self) -> Result<(), PoolError> {
        let pool = RingPool::prefilled(self.queue_size, &self.factory)?;
        let node = ChainNode::boxed(pool);

        let tail = self.tail.load(Ordering::Acquire);
        unsafe { &*tail }.next.store(node, Ordering::Release);
        self.tail.store(node, Ordering::Relaxed);

        tracing::debug!(queue_size = self.queue_size, "pool chain grew by one ring");
        Ok(())
    }
}

impl<T> Drop for PoolChain<T> {
    fn drop(&mut self) {
        let mut current = self.head.load(Ordering::Relaxed);
        while !current.is_null() {
            let node = unsafe { Box::from_raw(current) };
            current = node.next.load(Ordering::Relaxed);
        }
    }
}

impl<T> std::fmt::Debug for PoolChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolChain")
            .field("queue_size", &self.queue_size)
            .field("pool_count", &self.pool_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_one_pool() {
        let chain = PoolChain::new(4, || Buffer::new(1u8)).unwrap();
        assert_eq!(chain.pool_count(), 1);
    }

    #[test]
    fn test_pop_grows_when_drained() {
        // Usable capacity 1 per ring.
        let chain = PoolChain::new(2, || Buffer::new(10u32)).unwrap();
        let first = chain.pop().unwrap();
        assert_eq!(**first, 10);
        assert_eq!(chain.pool_count(), 1);

        let second = chain.pop().unwrap();
        assert_eq!(**second, 10);
        assert_eq!(chain.pool_count(), 2);

        chain.push(first).unwrap();
        chain.push(second).unwrap();
    }

    #[test]
    fn test_push_never_grows() {
        let chain = PoolChain::new(2, || Buffer::new(0u8)).unwrap();
        // The lone ring is already full; an extra handle bounces.
        let extra = Box::new(Buffer::new(9u8).unwrap());
        let rejected = chain.push(extra).unwrap_err();
        assert_eq!(**rejected, 9);
        assert_eq!(chain.pool_count(), 1);
    }

    #[test]
    fn test_push_fills_front_pools_first() {
        let chain = PoolChain::new(2, || Buffer::new(0u16)).unwrap();
        let a = chain.pop().unwrap();
        let b = chain.pop().unwrap(); // grew to 2 rings
        let c = chain.pop().unwrap(); // grew to 3 rings
        assert_eq!(chain.pool_count(), 3);

        // All three go back; every ring has exactly one free slot.
        chain.push(a).unwrap();
        chain.push(b).unwrap();
        chain.push(c).unwrap();

        // Every slot is taken again, so a fourth handle bounces.
        let extra = Box::new(Buffer::new(1u16).unwrap());
        assert!(chain.push(extra).is_err());
    }
}
