// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named allocation arenas.
//!
//! A [`Heap`] is a category that every tracked allocation is charged to.
//! It keeps a running byte total, an intrusive doubly-linked list of the
//! live allocation headers it owns, an optional [`Reporter`] hook, and a
//! set of outgoing edges to peer heaps for hierarchical aggregation (see
//! [`crate::hierarchy`]).
//!
//! # Locking
//! Each heap has one private mutex covering its byte counter, tracking
//! list, and reporter dispatch. Reporter callbacks run *under* that lock:
//! implementations must be non-blocking and must not call back into the
//! heap. The allocation-id counter is a separate atomic and is not covered
//! by the mutex.

use crate::header::AllocHeader;
use crate::reporter::{AllocEvent, Reporter};
use parking_lot::Mutex;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A named arena that tracks a set of live allocations.
///
/// Heaps are handed around as `Arc<Heap>`; every live block holds one
/// reference to its owner, so an arena outlives everything charged to it.
///
/// # Example
/// ```
/// use mem_sentry::{Heap, HeapBox};
///
/// let textures = Heap::new("Textures");
/// let px = HeapBox::new_in([0u8; 64], &textures).unwrap();
/// assert_eq!(textures.total_bytes(), 64);
/// drop(px);
/// assert_eq!(textures.total_bytes(), 0);
/// ```
pub struct Heap {
    /// Human-readable arena name.
    name: String,
    /// Next allocation id. Relaxed fetch-add: ids are unique and
    /// monotonic per heap, with no total order promised across heaps.
    next_id: AtomicU64,
    /// Counter, tracking list, and reporter, under one lock.
    inner: Mutex<HeapInner>,
    /// Outgoing edges to peer heaps. Guarded by the process-wide topology
    /// lock in `hierarchy`; the inner mutex here makes mutation sound.
    pub(crate) peers: Mutex<Vec<Arc<Heap>>>,
}

struct HeapInner {
    /// Sum of `size + alignment` over live blocks.
    total_bytes: usize,
    reporter: Option<Arc<dyn Reporter>>,
    list: TrackList,
}

impl Heap {
    /// Creates a new, empty arena.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            next_id: AtomicU64::new(0),
            inner: Mutex::new(HeapInner {
                total_bytes: 0,
                reporter: None,
                list: TrackList::new(),
            }),
            peers: Mutex::new(Vec::new()),
        })
    }

    /// The arena's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draws the next allocation id. Ids are never reused, even after the
    /// block is freed.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next allocation on this heap will receive. Useful as a
    /// bookmark for [`Heap::report_memory`] ranges.
    pub fn bookmark(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Bytes currently outstanding on this arena, counting alignment
    /// padding. Locks briefly.
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Number of live allocations on this arena. Locks briefly.
    pub fn allocation_count(&self) -> usize {
        self.inner.lock().list.len
    }

    /// Installs a reporter. Callbacks are dispatched under the heap lock,
    /// so the reporter must be non-blocking and must not call back into
    /// this heap.
    pub fn set_reporter(&self, reporter: Arc<dyn Reporter>) {
        self.inner.lock().reporter = Some(reporter);
    }

    /// Removes the reporter, if any.
    pub fn clear_reporter(&self) {
        self.inner.lock().reporter = None;
    }

    /// Snapshot of this arena's counters.
    pub fn stats(&self) -> HeapStats {
        let inner = self.inner.lock();
        HeapStats {
            name: self.name.clone(),
            total_bytes: inner.total_bytes,
            allocation_count: inner.list.len,
            next_id: self.next_id.load(Ordering::Relaxed),
        }
    }

    /// Replays every live allocation with id in `[start_id, end_id]` to
    /// the installed reporter, in id order. No-op without a reporter.
    ///
    /// The heap lock is held for the whole walk.
    pub fn report_memory(&self, start_id: u64, end_id: u64) {
        let inner = self.inner.lock();
        let Some(reporter) = inner.reporter.clone() else {
            return;
        };
        let mut cur = inner.list.head;
        // The list is appended at the tail, so a head-to-tail walk visits
        // ids in increasing order.
        unsafe {
            while !cur.is_null() && (*cur).id < start_id {
                cur = (*cur).next;
            }
            while !cur.is_null() && (*cur).id <= end_id {
                reporter.report(&AllocEvent::new(self, inner.total_bytes, &*cur));
                cur = (*cur).next;
            }
        }
    }

    /// Registers a freshly written header with this arena.
    ///
    /// # Safety
    /// `header` must point at a fully initialised [`AllocHeader`] that is
    /// not linked into any list, and must stay valid until it is removed
    /// again via [`Heap::remove_allocation`].
    pub(crate) unsafe fn add_allocation(&self, header: *mut AllocHeader) {
        let mut inner = self.inner.lock();
        inner.total_bytes += (*header).size + (*header).align;
        inner.list.push_back(header);
        if let Some(reporter) = inner.reporter.clone() {
            reporter.on_alloc(&AllocEvent::new(self, inner.total_bytes, &*header));
        }
    }

    /// Unlinks a header on its way out.
    ///
    /// A header that is not on the list is logged and skipped — the free
    /// still proceeds, the block just was not tracked here any more.
    ///
    /// # Safety
    /// `header` must point at a valid [`AllocHeader`] owned by this heap.
    pub(crate) unsafe fn remove_allocation(&self, header: *mut AllocHeader) {
        let mut inner = self.inner.lock();
        if inner.list.unlink(header) {
            inner.total_bytes -= (*header).size + (*header).align;
        } else {
            tracing::error!(
                heap = %self.name,
                id = (*header).id,
                "freed block is not on its heap's tracking list"
            );
        }
        if let Some(reporter) = inner.reporter.clone() {
            reporter.on_dealloc(&AllocEvent::new(self, inner.total_bytes, &*header));
        }
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Heap")
            .field("name", &self.name)
            .field("total_bytes", &inner.total_bytes)
            .field("allocation_count", &inner.list.len)
            .finish()
    }
}

/// Serialisable snapshot of one arena's counters.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HeapStats {
    /// Arena name.
    pub name: String,
    /// Bytes currently outstanding (payload + alignment padding).
    pub total_bytes: usize,
    /// Live allocation count.
    pub allocation_count: usize,
    /// Id the next allocation will receive.
    pub next_id: u64,
}

impl HeapStats {
    /// Human-readable one-liner.
    pub fn summary(&self) -> String {
        format!(
            "heap '{}': {} bytes live across {} allocations ({} ever issued)",
            self.name, self.total_bytes, self.allocation_count, self.next_id,
        )
    }
}

/// Intrusive doubly-linked list of allocation headers.
///
/// Nodes are the headers themselves; the list never allocates. All access
/// happens under the owning heap's mutex.
struct TrackList {
    head: *mut AllocHeader,
    tail: *mut AllocHeader,
    len: usize,
}

// Raw pointers into tracked blocks; every access is serialised by the
// heap mutex that owns this list.
unsafe impl Send for TrackList {}

impl TrackList {
    const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            len: 0,
        }
    }

    /// Appends at the tail, keeping ids in list order.
    unsafe fn push_back(&mut self, header: *mut AllocHeader) {
        (*header).prev = self.tail;
        (*header).next = ptr::null_mut();
        if self.tail.is_null() {
            self.head = header;
        } else {
            (*self.tail).next = header;
        }
        self.tail = header;
        self.len += 1;
    }

    /// Unlinks `header` wherever it sits: head, tail, middle, or sole
    /// node. Returns false when the header is not linked here at all.
    unsafe fn unlink(&mut self, header: *mut AllocHeader) -> bool {
        let prev = (*header).prev;
        let next = (*header).next;
        if prev.is_null() && next.is_null() && self.head != header {
            return false;
        }
        if prev.is_null() {
            self.head = next;
        } else {
            (*prev).next = next;
        }
        if next.is_null() {
            self.tail = prev;
        } else {
            (*next).prev = prev;
        }
        (*header).prev = ptr::null_mut();
        (*header).next = ptr::null_mut();
        self.len -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_heap_is_empty() {
        let heap = Heap::new("empty");
        assert_eq!(heap.name(), "empty");
        assert_eq!(heap.total_bytes(), 0);
        assert_eq!(heap.allocation_count(), 0);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let heap = Heap::new("ids");
        let first = heap.bookmark();
        assert_eq!(heap.next_id(), first);
        assert_eq!(heap.next_id(), first + 1);
        assert_eq!(heap.bookmark(), first + 2);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let heap = Heap::new("threaded-ids");
        let mut handles = Vec::new();
        for _ in 0..4 {
            let heap = Arc::clone(&heap);
            handles.push(std::thread::spawn(move || {
                (0..256).map(|_| heap.next_id()).collect::<Vec<_>>()
            }));
        }
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 4 * 256);
    }

    #[test]
    fn test_stats_snapshot() {
        let heap = Heap::new("snap");
        let stats = heap.stats();
        assert_eq!(stats.name, "snap");
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.summary().contains("snap"));
    }

    #[test]
    fn test_stats_serialise() {
        let heap = Heap::new("wire");
        let json = serde_json::to_string(&heap.stats()).unwrap();
        assert!(json.contains("\"name\":\"wire\""));
        assert!(json.contains("\"total_bytes\":0"));
    }
}
