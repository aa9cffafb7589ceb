// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! reactor-cli
//!
//! Command-line demo that wires up a small reactive action graph — a
//! counter cell, a derivation mirroring it into a "doubled" cell, and an
//! event handler driven by `send` — and drives it to quiescence through
//! [`reactor_core::Scheduler`].

// The CLI is expected to print its results to stdout.
#![allow(clippy::print_stdout)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use reactor_core::{Action, ActionId, Cell, CellId, InMemoryPipeline, Scheduler};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Command to execute
    #[clap(subcommand)]
    cmd: Option<Command>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the demo graph, sending `ticks` increment events and reporting
    /// the settled state and commit count.
    Run {
        /// Number of increment events to send before settling.
        #[clap(long, default_value_t = 5)]
        ticks: u32,
        /// Simulated authorization latency in milliseconds, per commit.
        #[clap(long, default_value_t = 90)]
        latency_ms: u64,
    },
}

async fn run_demo(ticks: u32, latency_ms: u64) -> Result<()> {
    let pipeline = Arc::new(InMemoryPipeline::new(std::time::Duration::from_millis(latency_ms)));
    let scheduler = Scheduler::with_pipeline(Arc::clone(&pipeline) as Arc<dyn reactor_core::Pipeline>);

    let counter = Arc::new(Cell::new(CellId::from_raw(1), 0i64));
    let doubled = Arc::new(Cell::new(CellId::from_raw(2), 0i64));

    let mirror_source = Arc::clone(&counter);
    let mirror_target = Arc::clone(&doubled);
    let mirror = Action::derivation(ActionId::from_raw(1), move |tx| {
        let value = mirror_source.get(tx);
        mirror_target.set(tx, value * 2);
        Ok(())
    });
    scheduler.register(mirror).await?;

    let incrementer_counter = Arc::clone(&counter);
    let incrementer = Action::event_handler(ActionId::from_raw(2), move |tx, _payload: ()| {
        let current = incrementer_counter.get(tx);
        incrementer_counter.set(tx, current + 1);
        Ok(())
    });
    let incrementer_id = scheduler.register(incrementer).await?;

    scheduler.idle().await;
    tracing::info!(counter = counter.get_untracked(), doubled = doubled.get_untracked(), "initial settle");

    for _ in 0..ticks {
        scheduler.send(incrementer_id, ()).await?;
    }
    let outcome = scheduler.idle().await;

    println!("settled after {ticks} tick(s): {outcome:?}");
    println!("counter = {}", counter.get_untracked());
    println!("doubled = {}", doubled.get_untracked());
    println!("commits seen by pipeline = {}", pipeline.commits_seen());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.cmd {
        Some(Command::Run { ticks, latency_ms }) => run_demo(ticks, latency_ms).await?,
        None => {
            println!("reactor-cli. Use --help for usage, or `run` to drive the demo graph.");
        }
    }

    Ok(())
}
