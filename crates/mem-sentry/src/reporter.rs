// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Event hooks for allocation tracking.
//!
//! A [`Reporter`] attached to a [`Heap`](crate::Heap) is told about every
//! allocation and free, and receives replay callbacks from
//! [`Heap::report_memory`](crate::Heap::report_memory). Dispatch happens
//! while the heap lock is held: implementations must be quick, must not
//! block, and must not call back into the heap that invoked them.

use crate::header::AllocHeader;
use crate::heap::Heap;

/// A snapshot of one tracked block, handed to reporter callbacks.
///
/// Borrowed data only — reporters that need to keep anything must copy it
/// out before returning.
pub struct AllocEvent<'a> {
    /// Name of the owning arena.
    pub heap_name: &'a str,
    /// The arena's byte total after the event was applied.
    pub heap_total: usize,
    /// User payload size in bytes.
    pub size: usize,
    /// Alignment used for the block; 0 means the default.
    pub align: usize,
    /// Monotonic per-heap allocation id.
    pub id: u64,
    /// Integrity signature at the time of the event.
    pub signature: u32,
    /// Address handed out by the underlying system allocator.
    pub raw_base: *const u8,
}

impl<'a> AllocEvent<'a> {
    pub(crate) fn new(heap: &'a Heap, heap_total: usize, header: &AllocHeader) -> Self {
        Self {
            heap_name: heap.name(),
            heap_total,
            size: header.size(),
            align: header.align(),
            id: header.id(),
            signature: header.signature(),
            raw_base: header.raw_base(),
        }
    }
}

/// Hook surface consumed at alloc, free, and report time.
pub trait Reporter: Send + Sync {
    /// A block was just registered with the heap.
    fn on_alloc(&self, event: &AllocEvent<'_>);

    /// A block was just removed from the heap.
    fn on_dealloc(&self, event: &AllocEvent<'_>);

    /// Replay callback for one live block, from
    /// [`Heap::report_memory`](crate::Heap::report_memory).
    fn report(&self, event: &AllocEvent<'_>);
}

/// Prints every event to stdout as a bordered block report.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Creates a console reporter.
    pub fn new() -> Self {
        Self
    }

    fn print_block(title: &str, event: &AllocEvent<'_>) {
        println!("╔══════════════════ {title:^20} ══════════════════╗");
        println!("║ Heap:           {:<38} ║", event.heap_name);
        println!(
            "║ Size:           {:<38} ║",
            format!("{} bytes (align {})", event.size, event.align)
        );
        println!("║ Allocation id:  {:<38} ║", event.id);
        println!(
            "║ Signature:      {:<38} ║",
            format!("0x{:08X}", event.signature)
        );
        println!(
            "║ Raw address:    {:<38} ║",
            format!("{:p}", event.raw_base)
        );
        println!(
            "║ Heap total now: {:<38} ║",
            format!("{} bytes", event.heap_total)
        );
        println!("╚════════════════════════════════════════════════════════╝");
    }
}

impl Reporter for ConsoleReporter {
    fn on_alloc(&self, event: &AllocEvent<'_>) {
        Self::print_block("ALLOCATION", event);
    }

    fn on_dealloc(&self, event: &AllocEvent<'_>) {
        Self::print_block("DEALLOCATION", event);
    }

    fn report(&self, event: &AllocEvent<'_>) {
        Self::print_block("MEMORY BLOCK", event);
    }
}

/// Routes events to the `tracing` subscriber instead of stdout.
#[derive(Debug, Default)]
pub struct TraceReporter;

impl TraceReporter {
    /// Creates a tracing-backed reporter.
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TraceReporter {
    fn on_alloc(&self, event: &AllocEvent<'_>) {
        tracing::debug!(
            heap = event.heap_name,
            size = event.size,
            align = event.align,
            id = event.id,
            heap_total = event.heap_total,
            "alloc"
        );
    }

    fn on_dealloc(&self, event: &AllocEvent<'_>) {
        tracing::debug!(
            heap = event.heap_name,
            size = event.size,
            align = event.align,
            id = event.id,
            heap_total = event.heap_total,
            "dealloc"
        );
    }

    fn report(&self, event: &AllocEvent<'_>) {
        tracing::info!(
            heap = event.heap_name,
            size = event.size,
            align = event.align,
            id = event.id,
            signature = format_args!("0x{:08X}", event.signature),
            "live block"
        );
    }
}
