// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Simulation Configuration
//
// Immutable settings handed to the simulation, harness and strategies:
// - Venue size (grid rows x columns)
// - Worker population
// - Race window delays
// - Lock hold time, second-lock timeout and pair selection for the
//   two-resource scenarios
// - Progress polling period and optional rng seed

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::error::SimulationError;

pub const CONFIG_PATH_ENV: &str = "THREADRACE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seat layout; resource count is rows x columns
    #[serde(default)]
    pub grid: GridConfig,

    /// Number of simulated workers, each attempting exactly one booking
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Race strategy window
    #[serde(default)]
    pub race: RaceConfig,

    /// Two-resource (seat + snack) scenario settings
    #[serde(default)]
    pub deadlock: DeadlockConfig,

    /// How often the progress poller reports active workers
    #[serde(default = "default_progress_interval", with = "humantime_serde")]
    pub progress_interval: Duration,

    /// Seed for per-worker randomness (timing stays nondeterministic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_side")]
    pub rows: usize,

    #[serde(default = "default_grid_side")]
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Fixed part of the delay between snapshot and commit
    #[serde(default = "default_race_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    /// Upper bound of the uniform extra delay added to `base_delay`
    #[serde(default = "default_race_jitter", with = "humantime_serde")]
    pub jitter: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlockConfig {
    /// Time the first lock is held before the second is attempted
    #[serde(default = "default_hold_delay", with = "humantime_serde")]
    pub hold_delay: Duration,

    /// Bound on the second-lock wait; expiry is recorded as a deadlock
    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub lock_timeout: Duration,

    #[serde(default)]
    pub pair_selection: PairSelection,
}

/// How a worker picks its seat/snack pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairSelection {
    /// Uniformly random pair per worker.
    #[default]
    Random,
    /// `worker_id mod resource_count`; distinct pairs while workers <= resources.
    RoundRobin,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_grid_side(),
            columns: default_grid_side(),
        }
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            base_delay: default_race_base_delay(),
            jitter: default_race_jitter(),
        }
    }
}

impl Default for DeadlockConfig {
    fn default() -> Self {
        Self {
            hold_delay: default_hold_delay(),
            lock_timeout: default_lock_timeout(),
            pair_selection: PairSelection::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            workers: default_workers(),
            race: RaceConfig::default(),
            deadlock: DeadlockConfig::default(),
            progress_interval: default_progress_interval(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Number of seats (and, in pair scenarios, snacks).
    pub fn resource_count(&self) -> usize {
        self.grid.rows * self.grid.columns
    }

    /// Shorthand for a config with `resources` seats in a single row.
    pub fn with_size(resources: usize, workers: usize) -> Self {
        Self {
            grid: GridConfig {
                rows: 1,
                columns: resources,
            },
            workers,
            ..Self::default()
        }
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. THREADRACE_CONFIG_PATH environment variable
    /// 2. ./threadrace.yaml (working directory)
    /// 3. ~/.threadrace/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./threadrace.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".threadrace").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(workers) = parse_override::<usize>(&lookup, "THREADRACE_WORKERS") {
            self.workers = workers;
        }
        if let Some(rows) = parse_override::<usize>(&lookup, "THREADRACE_GRID_ROWS") {
            self.grid.rows = rows;
        }
        if let Some(columns) = parse_override::<usize>(&lookup, "THREADRACE_GRID_COLUMNS") {
            self.grid.columns = columns;
        }
        if let Some(ms) = parse_override::<u64>(&lookup, "THREADRACE_RACE_DELAY_MS") {
            self.race.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_override::<u64>(&lookup, "THREADRACE_HOLD_DELAY_MS") {
            self.deadlock.hold_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_override::<u64>(&lookup, "THREADRACE_LOCK_TIMEOUT_MS") {
            self.deadlock.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(seed) = parse_override::<u64>(&lookup, "THREADRACE_SEED") {
            self.seed = Some(seed);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.grid.rows == 0 || self.grid.columns == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "grid must have at least one seat (rows={}, columns={})",
                self.grid.rows, self.grid.columns
            )));
        }

        if self.workers == 0 {
            return Err(SimulationError::InvalidConfig(
                "workers must be greater than zero".to_string(),
            ));
        }

        if self.deadlock.lock_timeout.is_zero() {
            return Err(SimulationError::InvalidConfig(
                "deadlock.lock_timeout must be greater than zero".to_string(),
            ));
        }

        if self.progress_interval.is_zero() {
            return Err(SimulationError::InvalidConfig(
                "progress_interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            tracing::info!("Environment override: {}={}", key, raw);
            Some(value)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Ignoring.", key, raw);
            None
        }
    }
}

fn default_grid_side() -> usize {
    10
}

fn default_workers() -> usize {
    1000
}

fn default_race_base_delay() -> Duration {
    Duration::from_millis(2)
}

fn default_race_jitter() -> Duration {
    Duration::from_millis(1)
}

fn default_hold_delay() -> Duration {
    Duration::from_millis(5)
}

fn default_lock_timeout() -> Duration {
    Duration::from_millis(5000)
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.resource_count(), 100);
        assert_eq!(config.workers, 1000);
        assert_eq!(config.race.base_delay, Duration::from_millis(2));
        assert_eq!(config.race.jitter, Duration::from_millis(1));
        assert_eq!(config.deadlock.hold_delay, Duration::from_millis(5));
        assert_eq!(config.deadlock.lock_timeout, Duration::from_secs(5));
        assert_eq!(config.deadlock.pair_selection, PairSelection::Random);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
grid:
  rows: 4
workers: 250
deadlock:
  lock_timeout: 20ms
  pair_selection: round-robin
"#;
        let config = SimulationConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.grid.rows, 4);
        assert_eq!(config.grid.columns, 10);
        assert_eq!(config.resource_count(), 40);
        assert_eq!(config.workers, 250);
        assert_eq!(config.deadlock.lock_timeout, Duration::from_millis(20));
        assert_eq!(config.deadlock.hold_delay, Duration::from_millis(5));
        assert_eq!(config.deadlock.pair_selection, PairSelection::RoundRobin);
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadrace.yaml");

        let mut config = SimulationConfig::with_size(16, 64);
        config.seed = Some(7);
        config.to_yaml_file(&path).unwrap();

        let loaded = SimulationConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_rejects_missing_explicit_path() {
        let result = SimulationConfig::load_or_default(Some(PathBuf::from(
            "/nonexistent/threadrace.yaml",
        )));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply_and_ignore_garbage() {
        let env = HashMap::from([
            ("THREADRACE_WORKERS", "50"),
            ("THREADRACE_LOCK_TIMEOUT_MS", "15"),
            ("THREADRACE_SEED", "99"),
            ("THREADRACE_GRID_ROWS", "not-a-number"),
        ]);
        let mut config = SimulationConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.workers, 50);
        assert_eq!(config.deadlock.lock_timeout, Duration::from_millis(15));
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.grid.rows, 10);
    }

    #[test]
    fn test_validation() {
        let mut config = SimulationConfig::default();

        config.grid.columns = 0;
        assert!(matches!(config.validate(), Err(SimulationError::InvalidConfig(_))));
        config.grid.columns = 10;

        config.workers = 0;
        assert!(config.validate().is_err());
        config.workers = 1;

        config.deadlock.lock_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.deadlock.lock_timeout = Duration::from_millis(1);

        config.progress_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.progress_interval = Duration::from_millis(10);

        assert!(config.validate().is_ok());
    }
}
