// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use threadrace_core::{SimulationConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output path (default: ./threadrace.yaml)
        #[arg(short, long, default_value = "./threadrace.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SimulationConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./threadrace.yaml");
        println!("  4. ~/.threadrace/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Venue:".bold());
    println!(
        "  Grid: {} x {} ({} seats)",
        config.grid.rows,
        config.grid.columns,
        config.resource_count()
    );
    println!("  Workers: {}", config.workers);
    println!();

    println!("{}", "Race window:".bold());
    println!("  Base delay: {:?}", config.race.base_delay);
    println!("  Jitter: up to {:?}", config.race.jitter);
    println!();

    println!("{}", "Seat + snack pairs:".bold());
    println!("  Hold delay: {:?}", config.deadlock.hold_delay);
    println!("  Lock timeout: {:?}", config.deadlock.lock_timeout);
    println!("  Pair selection: {:?}", config.deadlock.pair_selection);
    println!();

    println!("  Progress interval: {:?}", config.progress_interval);
    match config.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: {}", "(random)".dimmed()),
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SimulationConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    SimulationConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
