// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sentry pools` command: drain a pool chain past its capacity.
//!
//! Pops more buffers than one ring holds so the chain is forced to grow,
//! then pushes every handle back and reports where things landed.

use mem_pools::{Buffer, PoolChain};

pub fn execute(drain: usize, queue_size: usize) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            sentry · Pool Chain Growth               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let chain = PoolChain::new(queue_size, || Buffer::new([0u8; 1024]))
        .map_err(|e| anyhow::anyhow!("failed to build pool chain: {e}"))?;

    println!("  Per-ring slots:   {queue_size} requested");
    println!("  Rings at start:   {}", chain.pool_count());
    println!();

    let mut held = Vec::with_capacity(drain);
    for _ in 0..drain {
        let handle = chain
            .pop()
            .map_err(|e| anyhow::anyhow!("pop failed while growing: {e}"))?;
        held.push(handle);
    }

    println!("  Popped {drain} buffers without returning any.");
    println!("  Rings after drain: {}", chain.pool_count());
    println!();

    let mut returned = 0usize;
    for handle in held {
        if chain.push(handle).is_ok() {
            returned += 1;
        }
    }
    println!("  Returned {returned}/{drain} handles.");
    println!("  Rings at end:      {}", chain.pool_count());

    Ok(())
}
