// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tracking allocator: header + end-marker layout, aligned placement,
//! and integrity validation on free.
//!
//! Every tracked block is laid out as
//!
//! ```text
//! [AllocHeader][user payload, `size` bytes][END_MARKER, 4 bytes]
//! ```
//!
//! with the header immediately in front of the user pointer. On the
//! aligned path the allocator over-requests by `alignment` bytes and
//! slides the user pointer forward to the first aligned address past the
//! header, so the free path is uniform: step back one header, validate,
//! release the raw base recorded inside it.
//!
//! # Disable mode
//! Tracking follows the build profile: debug builds (`debug_assertions`)
//! track, release builds compile these functions down to thin wrappers
//! over the system allocator's malloc/memalign/free — no header is
//! written and no heap is notified. The `tracking` cargo feature forces
//! tracking on regardless of profile.
//!
//! # Safety
//! [`deallocate`] trusts the caller to hand back pointers produced by
//! [`allocate`]/[`allocate_aligned`]; everything else is validated via the
//! header signature and end marker. Prefer [`HeapBox`](crate::HeapBox)
//! unless you are building your own container on top of this layer.

use crate::error::SentryError;
use crate::heap::Heap;
use std::ptr::NonNull;
use std::sync::Arc;

#[cfg(any(feature = "tracking", debug_assertions))]
pub use tracked::{allocate, allocate_aligned, deallocate};

#[cfg(not(any(feature = "tracking", debug_assertions)))]
pub use passthrough::{allocate, allocate_aligned, deallocate};

/// Alignment every default-path block is guaranteed to have.
pub const DEFAULT_ALIGN: usize = std::mem::align_of::<crate::header::AllocHeader>();

fn check_alignment(align: usize) -> Result<(), SentryError> {
    if !align.is_power_of_two() || align < std::mem::size_of::<usize>() {
        return Err(SentryError::BadAlignment { align });
    }
    Ok(())
}

#[cfg(any(feature = "tracking", debug_assertions))]
mod tracked {
    use super::*;
    use crate::constants::{ACTIVE_SIGNATURE, END_MARKER, FREED_SIGNATURE};
    use crate::header::AllocHeader;
    use std::alloc::Layout;
    use std::mem::ManuallyDrop;
    use std::ptr;

    const HEADER_SIZE: usize = std::mem::size_of::<AllocHeader>();
    const MARKER_SIZE: usize = std::mem::size_of::<u32>();

    /// Allocates `size` bytes charged to `heap`.
    ///
    /// Zero-size requests are promoted to one byte so every allocation has
    /// a distinct, freeable address. The returned pointer is aligned to
    /// [`DEFAULT_ALIGN`]; use [`allocate_aligned`] for stricter demands.
    pub fn allocate(size: usize, heap: &Arc<Heap>) -> Result<NonNull<u8>, SentryError> {
        let size = size.max(1);
        let layout = block_layout(size, 0)?;
        let raw = unsafe { std::alloc::alloc(layout) };
        if raw.is_null() {
            return Err(SentryError::AllocationFailed { size, align: 0 });
        }
        Ok(unsafe { publish_block(raw, raw, size, 0, heap) })
    }

    /// Allocates `size` bytes at `align`, charged to `heap`.
    ///
    /// `align` must be a power of two no smaller than a pointer. The
    /// arena is charged `size + align` bytes: the padding is real memory
    /// the block occupies, and counting it keeps the observable totals
    /// honest.
    pub fn allocate_aligned(
        size: usize,
        align: usize,
        heap: &Arc<Heap>,
    ) -> Result<NonNull<u8>, SentryError> {
        check_alignment(align)?;
        let size = size.max(1);
        let layout = block_layout(size, align)?;
        let raw = unsafe { std::alloc::alloc(layout) };
        if raw.is_null() {
            return Err(SentryError::AllocationFailed { size, align });
        }
        // First aligned address that leaves room for the header in front
        // of it. The over-request of `align` bytes guarantees the end
        // marker still fits.
        let user = (raw as usize + HEADER_SIZE).next_multiple_of(align) as *mut u8;
        let header_at = unsafe { user.sub(HEADER_SIZE) };
        Ok(unsafe { publish_block(raw, header_at, size, align, heap) })
    }

    /// Returns a tracked block.
    ///
    /// No-op on null. Panics on a signature or end-marker mismatch —
    /// double free, foreign pointer, or buffer overrun — and deliberately
    /// does not release the block in that case, because it may not be
    /// ours to release.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by
    /// [`allocate`]/[`allocate_aligned`] that has not been freed yet.
    pub unsafe fn deallocate(ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let header = AllocHeader::from_user_ptr(ptr);

        let signature = (*header).signature;
        assert_ne!(
            signature, FREED_SIGNATURE,
            "double free of block at {ptr:p}"
        );
        assert_eq!(
            signature, ACTIVE_SIGNATURE,
            "block at {ptr:p} was not allocated by the tracking allocator (signature 0x{signature:08X})"
        );

        let marker = ptr::read_unaligned(ptr.add((*header).size).cast::<u32>());
        assert_eq!(
            marker, END_MARKER,
            "buffer overrun behind block at {ptr:p} (end marker 0x{marker:08X})"
        );

        // Mark the header dead before the heap forgets about it, so a
        // racing double free can only ever see FREED, never a stale
        // ACTIVE on an unlinked block.
        (*header).signature = FREED_SIGNATURE;
        let heap = ManuallyDrop::take(&mut (*header).heap);
        heap.remove_allocation(header);
        tracing::trace!(
            heap = heap.name(),
            size = (*header).size,
            id = (*header).id,
            "tracked free"
        );

        let raw = (*header).raw_base;
        let size = (*header).size;
        let align = (*header).align;
        // These values produced a valid layout on the way in.
        let layout = Layout::from_size_align_unchecked(
            HEADER_SIZE + size + align + MARKER_SIZE,
            super::DEFAULT_ALIGN,
        );
        std::alloc::dealloc(raw, layout);
        drop(heap);
    }

    /// Total layout of one block: header, payload, alignment slack, end
    /// marker. `align == 0` is the default (unaligned) path.
    fn block_layout(size: usize, align: usize) -> Result<Layout, SentryError> {
        let total = HEADER_SIZE
            .checked_add(size)
            .and_then(|n| n.checked_add(align))
            .and_then(|n| n.checked_add(MARKER_SIZE))
            .ok_or(SentryError::AllocationFailed { size, align })?;
        Layout::from_size_align(total, super::DEFAULT_ALIGN)
            .map_err(|_| SentryError::AllocationFailed { size, align })
    }

    /// Writes the header and end marker, registers the block, and hands
    /// back the user pointer.
    unsafe fn publish_block(
        raw: *mut u8,
        header_at: *mut u8,
        size: usize,
        align: usize,
        heap: &Arc<Heap>,
    ) -> NonNull<u8> {
        let header = header_at.cast::<AllocHeader>();
        header.write(AllocHeader {
            heap: ManuallyDrop::new(Arc::clone(heap)),
            raw_base: raw,
            size,
            align,
            id: heap.next_id(),
            signature: ACTIVE_SIGNATURE,
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        });

        let user = header_at.add(HEADER_SIZE);
        ptr::write_unaligned(user.add(size).cast::<u32>(), END_MARKER);

        heap.add_allocation(header);
        tracing::trace!(heap = heap.name(), size, align, "tracked allocation");
        NonNull::new_unchecked(user)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_zero_size_is_promoted() {
            let heap = Heap::new("zero");
            let ptr = allocate(0, &heap).unwrap();
            assert_eq!(heap.total_bytes(), 1);
            assert_eq!(heap.allocation_count(), 1);
            unsafe { deallocate(ptr.as_ptr()) };
            assert_eq!(heap.total_bytes(), 0);
        }

        #[test]
        fn test_overflowing_request_fails_cleanly() {
            let heap = Heap::new("huge");
            let result = allocate(usize::MAX - 2, &heap);
            assert!(matches!(
                result,
                Err(SentryError::AllocationFailed { .. })
            ));
            assert_eq!(heap.allocation_count(), 0);
        }

        #[test]
        fn test_alignment_contract() {
            let heap = Heap::new("align");
            assert!(matches!(
                allocate_aligned(16, 3, &heap),
                Err(SentryError::BadAlignment { align: 3 })
            ));
            assert!(matches!(
                allocate_aligned(16, 2, &heap),
                Err(SentryError::BadAlignment { align: 2 })
            ));
        }

        #[test]
        fn test_null_free_is_noop() {
            unsafe { deallocate(std::ptr::null_mut()) };
        }
    }
}

#[cfg(not(any(feature = "tracking", debug_assertions)))]
mod passthrough {
    use super::*;

    /// Thin wrapper over `malloc`. No header, no heap bookkeeping.
    pub fn allocate(size: usize, _heap: &Arc<Heap>) -> Result<NonNull<u8>, SentryError> {
        let size = size.max(1);
        let raw = unsafe { libc::malloc(size) }.cast::<u8>();
        NonNull::new(raw).ok_or(SentryError::AllocationFailed { size, align: 0 })
    }

    /// Thin wrapper over `posix_memalign`. No header, no heap bookkeeping.
    pub fn allocate_aligned(
        size: usize,
        align: usize,
        _heap: &Arc<Heap>,
    ) -> Result<NonNull<u8>, SentryError> {
        check_alignment(align)?;
        let size = size.max(1);
        let mut raw = std::ptr::null_mut();
        let rc = unsafe { libc::posix_memalign(&mut raw, align, size) };
        if rc != 0 {
            return Err(SentryError::AllocationFailed { size, align });
        }
        NonNull::new(raw.cast::<u8>()).ok_or(SentryError::AllocationFailed { size, align })
    }

    /// Thin wrapper over `free`.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by
    /// [`allocate`]/[`allocate_aligned`] that has not been freed yet.
    pub unsafe fn deallocate(ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        libc::free(ptr.cast());
    }
}
