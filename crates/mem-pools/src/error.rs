// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for buffer pools.

/// Errors that can occur while building pool storage.
///
/// Running out of ring capacity is not an error — `push` hands the buffer
/// back instead, and a chain grows on `pop` by itself.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The system allocator refused the backing storage for a buffer.
    #[error("buffer allocation of {size} bytes (align {align}) failed")]
    BufferAllocationFailed { size: usize, align: usize },

    /// The requested buffer alignment is not a power of two.
    #[error("invalid buffer alignment {align}: must be a power of two")]
    BadAlignment { align: usize },
}
