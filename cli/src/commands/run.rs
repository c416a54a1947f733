// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `threadrace run` - one simulation with live progress and a final report

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use threadrace_core::infrastructure::{metrics_observer, EventBus, EventBusError};
use threadrace_core::{Simulation, SimulationEvent, StrategyKind};

use crate::commands::{load_config, ConfigOverrides};
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// serialized, race, deadlock or deadlock-avoidance
    #[arg(short, long)]
    pub strategy: StrategyKind,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Stream every simulation event to stdout as JSON lines
    #[arg(long)]
    pub events: bool,

    /// Print the seat map after the run
    #[arg(long)]
    pub seat_map: bool,

    /// Print the first N per-worker claim log entries
    #[arg(long, value_name = "N")]
    pub show_claims: Option<usize>,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path, &args.overrides)?;
    let columns = config.grid.columns;
    let workers = config.workers;

    let mut simulation =
        Simulation::new(config, args.strategy).context("Failed to build simulation")?;
    simulation.add_observer(metrics_observer());

    let bar = output::progress_bar(workers, !args.events);
    simulation.add_observer(output::progress_observer(bar.clone()));

    let streamer = if args.events {
        let bus = EventBus::with_default_capacity();
        simulation.add_observer(bus.observer());
        Some(spawn_event_printer(&bus))
    } else {
        None
    };

    let token = simulation.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling workers");
            token.cancel();
        }
    });

    let stats = simulation.run_simulation().await;
    interrupt.abort();
    bar.finish_and_clear();
    let stats = stats.context("Simulation run failed")?;

    if let Some(streamer) = streamer {
        if tokio::time::timeout(Duration::from_secs(5), streamer).await.is_err() {
            warn!("Event stream did not drain in time");
        }
        // Keep stdout pure JSON lines when streaming
        return Ok(());
    }

    if simulation.cancel_token().is_cancelled() {
        println!("{}", "Run cancelled; statistics cover the workers that finished.".yellow());
    }

    output::print_report(&stats);

    if args.seat_map {
        println!();
        println!("{}", "Seat map:".bold());
        println!("{}", output::render_seat_map(simulation.venue(), columns));
        for line in output::collision_details(simulation.venue(), 10) {
            println!("  {}", line);
        }
    }

    if let Some(limit) = args.show_claims {
        println!();
        println!("{}", "Claims:".bold());
        for result in simulation.results().iter().take(limit) {
            println!("  {}", result.to_log_entry());
        }
    }

    info!(strategy = %stats.strategy, "Run finished");
    Ok(())
}

/// Print events as JSON lines until the run completes.
fn spawn_event_printer(bus: &EventBus) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let done = matches!(event, SimulationEvent::RunCompleted { .. });
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                    if done {
                        break;
                    }
                }
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    })
}
