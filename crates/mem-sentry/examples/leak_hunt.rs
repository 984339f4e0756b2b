// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Find the allocations a subsystem forgot to return.
//!
//! Demonstrates the bookmark workflow: snapshot a heap's id counter
//! before handing it to a subsystem, snapshot again after teardown, and
//! replay everything in between that is still live — those blocks are
//! the leaks.
//!
//! ```bash
//! cargo run -p mem-sentry --example leak_hunt
//! ```

use mem_sentry::{ConsoleReporter, Heap, HeapBox, Reporter};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let assets = Heap::new("Assets");
    assets.set_reporter(Arc::new(ConsoleReporter::new()) as Arc<dyn Reporter>);

    // A well-behaved subsystem: everything it takes, it returns.
    {
        let _mesh = HeapBox::new_in([0u8; 512], &assets)?;
        let _skin = HeapBox::new_in([0u8; 256], &assets)?;
    }
    println!(
        "after tidy subsystem: {} blocks live\n",
        assets.allocation_count()
    );

    // A sloppy subsystem: two of its three allocations escape teardown.
    let checkpoint = assets.bookmark();
    let leaked_a = HeapBox::new_in([0u8; 64], &assets)?;
    let _returned = HeapBox::new_in([0u8; 128], &assets)?;
    let leaked_b = HeapBox::new_in([0u8; 32], &assets)?;
    drop(_returned);

    let after = assets.bookmark();
    println!(
        "sloppy subsystem done: {} blocks still live, {} bytes",
        assets.allocation_count(),
        assets.total_bytes()
    );
    println!("replaying ids {checkpoint}..{after}; the survivors are leaks:\n");
    assets.report_memory(checkpoint, after);
    #[cfg(any(feature = "tracking", debug_assertions))]
    assert_eq!(assets.allocation_count(), 2);

    drop(leaked_a);
    drop(leaked_b);
    println!("\nafter cleanup: {}", assets.stats().summary());
    Ok(())
}
