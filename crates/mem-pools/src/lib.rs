// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # mem-pools
//!
//! Lock-free object recycling: a single-producer/single-consumer ring of
//! buffer handles, and a linked chain of such rings that grows on demand.
//!
//! # Key Components
//!
//! - [`Buffer`] — a heap-backed cell holding exactly one `T` at a chosen
//!   alignment ([`InlineBuffer`] is the allocation-free variant).
//! - [`RingPool`] — a waste-one-slot SPSC ring of `Box<Buffer<T>>`
//!   handles; non-blocking push/pop with release/acquire handoff.
//! - [`PoolChain`] — a linked list of pre-populated rings sharing one
//!   buffer factory; appends a fresh ring whenever `pop` finds every
//!   ring drained, so a consumer is never left empty-handed.
//!
//! # Ownership Model
//!
//! ```text
//! PoolChain::pop()
//!       │
//!       ▼
//!   Box<Buffer<T>>  ◄── caller owns the handle while it is out
//!       │
//!       │  PoolChain::push()
//!       ▼
//!   ring slot       ◄── the pool owns whatever sits in its slots
//! ```
//!
//! Handles move by value: whoever holds the `Box` owns the buffer, and a
//! pool or chain frees the handles still sitting in its slots when it is
//! dropped. There is no hidden reclamation — a handle that is never
//! pushed back is simply freed by its holder.
//!
//! # Example
//!
//! ```
//! use mem_pools::{Buffer, PoolChain};
//!
//! let chain = PoolChain::new(8, || Buffer::new([0u8; 256])).unwrap();
//!
//! let mut held = Vec::new();
//! for _ in 0..20 {
//!     held.push(chain.pop().unwrap()); // grows past the first ring
//! }
//! assert!(chain.pool_count() > 1);
//!
//! for handle in held {
//!     chain.push(handle).unwrap();
//! }
//! ```

mod buffer;
mod chain;
mod error;
mod ring;

pub use buffer::{Buffer, InlineBuffer};
pub use chain::PoolChain;
pub use error::PoolError;
pub use ring::RingPool;
