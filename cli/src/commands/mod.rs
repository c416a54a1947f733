// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for threadrace CLI

pub mod compare;
pub mod config;
pub mod run;

pub use self::compare::CompareArgs;
pub use self::config::ConfigCommand;
pub use self::run::RunArgs;

use clap::Args;
use std::path::PathBuf;

use anyhow::{Context, Result};
use threadrace_core::SimulationConfig;

/// Size and seed overrides shared by `run` and `compare`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Number of simulated workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seat grid rows
    #[arg(long)]
    pub rows: Option<usize>,

    /// Seat grid columns
    #[arg(long)]
    pub columns: Option<usize>,

    /// Seed for per-worker randomness
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(rows) = self.rows {
            config.grid.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.grid.columns = columns;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Discovered (or explicit) config with env and flag overrides applied, validated.
pub fn load_config(
    config_path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<SimulationConfig> {
    let mut config =
        SimulationConfig::load_or_default(config_path).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_touch_given_fields() {
        let mut config = SimulationConfig::default();
        let overrides = ConfigOverrides {
            workers: Some(50),
            columns: Some(4),
            ..Default::default()
        };

        overrides.apply(&mut config);

        assert_eq!(config.workers, 50);
        assert_eq!(config.grid.columns, 4);
        assert_eq!(config.grid.rows, SimulationConfig::default().grid.rows);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_load_config_rejects_zero_workers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadrace.yaml");
        SimulationConfig::default().to_yaml_file(&path).unwrap();

        let overrides = ConfigOverrides {
            workers: Some(0),
            ..Default::default()
        };
        assert!(load_config(Some(path), &overrides).is_err());
    }
}
