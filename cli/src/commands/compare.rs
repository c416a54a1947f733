// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `threadrace compare` - serialized and race on identical configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use threadrace_core::{Simulation, SimulationConfig, SimulationStats, StrategyKind};

use crate::commands::{load_config, ConfigOverrides};
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

pub async fn execute(args: CompareArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path, &args.overrides)?;

    println!(
        "Comparing {} workers on {} seats...",
        config.workers,
        config.resource_count()
    );

    let safe = run_once(&config, StrategyKind::Serialized).await?;
    let unsafe_ = run_once(&config, StrategyKind::Race).await?;

    println!();
    print!("{}", output::render_comparison(&safe, &unsafe_));
    println!();
    println!("{}", safe.summary().green());
    println!("{}", unsafe_.summary().red());

    Ok(())
}

async fn run_once(config: &SimulationConfig, kind: StrategyKind) -> Result<SimulationStats> {
    let mut simulation = Simulation::new(config.clone(), kind)
        .with_context(|| format!("Failed to build {} simulation", kind))?;
    simulation
        .run_simulation()
        .await
        .with_context(|| format!("{} run failed", kind))
}
