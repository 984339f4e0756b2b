// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sentry
//!
//! Command-line driver for the mem-sentry tracking allocator and the
//! mem-pools recycling pools.
//!
//! ## Usage
//! ```bash
//! # Walk an allocation lifecycle with live console reporting
//! sentry demo --report
//!
//! # Build a heap graph and print hierarchical totals
//! sentry hierarchy
//!
//! # Drain a pool chain and watch it grow
//! sentry pools --drain 100 --queue-size 4
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sentry",
    about = "Tracking allocator and lock-free pool demos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate and free across named heaps with full bookkeeping output.
    Demo {
        /// Attach a console reporter so every alloc/free prints a block
        /// report.
        #[arg(short, long)]
        report: bool,
    },

    /// Build a connected heap graph and print hierarchical totals.
    Hierarchy,

    /// Drain a pool chain past its capacity and return every handle.
    Pools {
        /// Number of buffers to pop before pushing them all back.
        #[arg(short, long, default_value_t = 100)]
        drain: usize,

        /// Per-ring slot count (rounded up to a power of two).
        #[arg(short, long, default_value_t = 4)]
        queue_size: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Demo { report } => commands::demo::execute(report),
        Commands::Hierarchy => commands::hierarchy::execute(),
        Commands::Pools { drain, queue_size } => commands::pools::execute(drain, queue_size),
    }
}
