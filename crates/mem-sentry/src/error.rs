// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the tracking allocator.
//!
//! Only recoverable conditions surface as errors. Corruption detected on
//! free (bad signature, clobbered end marker) is a contract violation and
//! panics instead — see [`crate::tracking::deallocate`].

/// Errors that can occur while allocating through the tracking layer.
#[derive(Debug, thiserror::Error)]
pub enum SentryError {
    /// The underlying system allocator returned null.
    #[error("allocation of {size} bytes (align {align}) failed")]
    AllocationFailed { size: usize, align: usize },

    /// The requested alignment is not a power of two at least as large as
    /// a pointer.
    #[error("invalid alignment {align}: must be a power of two >= pointer size")]
    BadAlignment { align: usize },
}
