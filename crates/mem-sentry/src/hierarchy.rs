// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heap graph: directed adjacency between arenas and hierarchical
//! aggregation over it.
//!
//! Edges are directed — [`Heap::add_peer`] is one-way, and
//! [`connect_heaps`] is the bidirectional helper. Traversal copes with
//! arbitrary directed graphs, cycles included, by visited-set
//! deduplication; duplicate edges are permitted and harmless.
//!
//! Every topology mutation and every hierarchical query serialises on one
//! process-wide lock. Per-heap operations (alloc/free on individual
//! arenas) are not blocked by it, but the hierarchy queries walk the whole
//! reachable graph and lock each member heap in turn — keep them off hot
//! paths.

use crate::heap::Heap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// Serialises graph mutation and traversal process-wide.
static TOPOLOGY_LOCK: Mutex<()> = Mutex::new(());

static DEFAULT_HEAP: OnceLock<Arc<Heap>> = OnceLock::new();

/// The process-wide default arena. Created lazily on first use; every
/// allocation that names no explicit heap is charged here.
pub fn default_heap() -> &'static Arc<Heap> {
    DEFAULT_HEAP.get_or_init(|| Heap::new("DefaultHeap"))
}

/// Links two arenas in both directions.
///
/// Note that connected heaps keep each other alive: a cycle of `Arc`
/// references never drops. For a diagnostics graph that is the intended
/// behaviour — arenas live for the life of the process.
pub fn connect_heaps(a: &Arc<Heap>, b: &Arc<Heap>) {
    a.add_peer(b);
    b.add_peer(a);
}

impl Heap {
    /// Adds a directed edge from this arena to `peer`. Duplicates are
    /// allowed; traversal deduplicates.
    pub fn add_peer(&self, peer: &Arc<Heap>) {
        let _topology = TOPOLOGY_LOCK.lock();
        self.peers.lock().push(Arc::clone(peer));
    }

    /// Sum of [`Heap::total_bytes`] over every arena reachable from this
    /// one (itself included), each counted exactly once.
    pub fn total_hierarchy(&self) -> usize {
        let _topology = TOPOLOGY_LOCK.lock();
        let mut total = 0;
        for_each_reachable(self, |heap| total += heap.total_bytes());
        total
    }

    /// Sum of [`Heap::allocation_count`] over every reachable arena.
    pub fn allocation_count_hierarchy(&self) -> usize {
        let _topology = TOPOLOGY_LOCK.lock();
        let mut count = 0;
        for_each_reachable(self, |heap| count += heap.allocation_count());
        count
    }
}

/// Depth-first walk over outgoing edges. Caller holds the topology lock.
fn for_each_reachable(start: &Heap, mut visit: impl FnMut(&Heap)) {
    let mut seen: HashSet<*const Heap> = HashSet::new();
    seen.insert(start as *const Heap);
    visit(start);

    let mut stack: Vec<Arc<Heap>> = start.peers.lock().clone();
    while let Some(heap) = stack.pop() {
        if !seen.insert(Arc::as_ptr(&heap)) {
            continue;
        }
        visit(&heap);
        stack.extend(heap.peers.lock().iter().cloned());
    }
}
