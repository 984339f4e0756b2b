// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sentry hierarchy` command: aggregate totals across a heap graph.
//!
//! Builds the classic three-arena topology — A linked both ways with B,
//! A pointing one way at C — allocates on each, and prints what every
//! vantage point can see.

use mem_sentry::{connect_heaps, Heap, HeapBox};

pub fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            sentry · Heap Graph Totals               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let a = Heap::new("HeapA");
    let b = Heap::new("HeapB");
    let c = Heap::new("HeapC");

    connect_heaps(&a, &b); // A ↔ B
    a.add_peer(&c); //        A → C

    let on_a = HeapBox::new_in(0u32, &a)?;
    let on_b = HeapBox::new_in([0u8; 100], &b)?;
    let on_c = HeapBox::new_in(0u64, &c)?;

    println!("  Topology: A <-> B, A -> C");
    println!();
    println!(
        "  {:<8} {:>12} {:>16} {:>18}",
        "Heap", "own bytes", "reachable bytes", "reachable allocs"
    );
    println!("  {}", "-".repeat(58));
    for heap in [&a, &b, &c] {
        println!(
            "  {:<8} {:>12} {:>16} {:>18}",
            heap.name(),
            heap.total_bytes(),
            heap.total_hierarchy(),
            heap.allocation_count_hierarchy(),
        );
    }
    println!();
    println!("  C sees only itself: its one edge points nowhere.");

    drop(on_a);
    drop(on_b);
    drop(on_c);

    Ok(())
}
