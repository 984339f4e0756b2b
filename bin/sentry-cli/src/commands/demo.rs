// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `sentry demo` command: walk an allocation lifecycle across named heaps.
//!
//! Creates a couple of arenas, routes one type through a per-type binding,
//! allocates, prints per-heap statistics, frees, and shows the counters
//! returning to zero.

use mem_sentry::{ConsoleReporter, Heap, HeapBox, Reporter, Sentry};
use std::sync::Arc;

struct VoiceLine {
    #[allow(dead_code)]
    samples: [f32; 32],
}
impl Sentry for VoiceLine {}

pub fn execute(report: bool) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           sentry · Allocation Lifecycle             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let textures = Heap::new("Textures");
    let audio = Heap::new("Audio");

    if report {
        let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new());
        textures.set_reporter(Arc::clone(&reporter));
        audio.set_reporter(reporter);
    }

    // Explicit-arena allocations.
    let atlas = HeapBox::new_in([0u8; 4096], &textures)?;
    let lut = HeapBox::new_in([0u32; 256], &textures)?;

    // Per-type binding: every VoiceLine lands on the audio heap.
    VoiceLine::bind_heap(&audio);
    let line = VoiceLine {
        samples: [0.0; 32],
    }
    .into_tracked()?;

    println!("  After allocation:");
    for heap in [&textures, &audio] {
        println!("   {}", heap.stats().summary());
    }
    println!();

    // Replay the texture heap's live blocks through the reporter.
    if report {
        textures.report_memory(0, textures.bookmark());
    }

    drop(atlas);
    drop(lut);
    drop(line);

    println!("  After teardown:");
    for heap in [&textures, &audio] {
        println!("   {}", heap.stats().summary());
    }
    println!();
    println!(
        "  Stats as JSON: {}",
        serde_json::to_string(&textures.stats())?
    );

    Ok(())
}
