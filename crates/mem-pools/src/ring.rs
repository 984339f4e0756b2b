// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lock-free single-producer/single-consumer ring of buffer handles.
//!
//! A [`RingPool`] is a fixed-capacity circular queue of
//! `Box<Buffer<T>>` handles built for real-time-safe handoff between one
//! producer thread and one consumer thread.
//!
//! # Waste-one-slot
//! Capacity is rounded up to the next power of two (minimum 2) and one
//! slot is permanently sacrificed so that `write == read` always means
//! empty and `write + 1 == read` always means full, with no shared flags.
//! Usable capacity is therefore `capacity() - 1`.
//!
//! # Ordering
//! The producer writes a slot and then publishes it with a release store
//! of the write index; the consumer acquires the write index before
//! touching the slot. The mirror-image pair on the read index covers the
//! producer's free-slot calculation. The slot array itself needs no
//! further synchronisation. Both indices live on their own cache lines to
//! keep the two sides from false-sharing.

use crate::buffer::Buffer;
use crate::error::PoolError;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity SPSC queue of owned buffer handles.
///
/// `push` may only be called from one thread at a time (the producer) and
/// `pop` from one thread at a time (the consumer); the two sides need no
/// coordination beyond that.
pub struct RingPool<T> {
    /// Producer-owned position. Consumers acquire it to see new slots.
    write: CachePadded<AtomicUsize>,
    /// Consumer-owned position. Producers acquire it to count free slots.
    read: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    /// `capacity - 1`; capacity is a power of two so this masks indices.
    mask: usize,
}

struct Slot<T> {
    handle: UnsafeCell<*mut Buffer<T>>,
}

// Slots hold owned Buffer handles; the index protocol above serialises
// every access to a given slot.
unsafe impl<T: Send> Send for RingPool<T> {}
unsafe impl<T: Send> Sync for RingPool<T> {}

impl<T> RingPool<T> {
    /// Creates a pool that starts empty. The caller supplies handles via
    /// [`RingPool::push`].
    pub fn vacant(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(2);
        let slots: Box<[Slot<T>]> = (0..capacity)
            .map(|_| Slot {
                handle: UnsafeCell::new(ptr::null_mut()),
            })
            .collect();
        Self {
            write: CachePadded::new(AtomicUsize::new(0)),
            read: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
        }
    }

    /// Creates a pool pre-populated with `capacity - 1` buffers built by
    /// `factory`, ready to be consumed immediately.
    ///
    /// If the factory fails part-way, everything built so far is released
    /// and the error is returned.
    pub fn prefilled<F>(capacity: usize, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> Result<Buffer<T>, PoolError>,
    {
        let pool = Self::vacant(capacity);
        let usable = pool.mask;
        for index in 0..usable {
            let handle = Box::new(factory()?);
            unsafe { *pool.slots[index].handle.get() = Box::into_raw(handle) };
        }
        pool.write.store(usable, Ordering::Relaxed);
        Ok(pool)
    }

    /// Total slot count (a power of two). One slot is always kept free,
    /// so at most `capacity() - 1` handles fit.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of handles currently queued. Acquire-loads both indices.
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        write.wrapping_sub(read) & self.mask
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deposits a handle. Producer-side, non-blocking; the handle comes
    /// back in `Err` when no slot is free.
    pub fn push(&self, handle: Box<Buffer<T>>) -> Result<(), Box<Buffer<T>>> {
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let free = self.mask - (write.wrapping_sub(read) & self.mask);
        if free == 0 {
            return Err(handle);
        }
        unsafe { *self.slots[write].handle.get() = Box::into_raw(handle) };
        self.write.store((write + 1) & self.mask, Ordering::Release);
        Ok(())
    }

    /// Takes the oldest handle. Consumer-side, non-blocking; `None` when
    /// the queue is empty.
    pub fn pop(&self) -> Option<Box<Buffer<T>>> {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        if write.wrapping_sub(read) & self.mask == 0 {
            return None;
        }
        let raw = unsafe {
            let slot = self.slots[read].handle.get();
            let raw = *slot;
            *slot = ptr::null_mut();
            raw
        };
        self.read.store((read + 1) & self.mask, Ordering::Release);
        Some(unsafe { Box::from_raw(raw) })
    }
}

impl<T> Drop for RingPool<T> {
    fn drop(&mut self) {
        // Whatever is still queued belongs to the pool.
        for slot in self.slots.iter() {
            let raw = unsafe { *slot.handle.get() };
            if !raw.is_null() {
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}

impl<T> std::fmt::Debug for RingPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingPool")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
