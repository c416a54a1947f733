// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four acquisition disciplines a simulation can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// One run-wide token; no races possible.
    Serialized,
    /// No token and a widened race window; double bookings expected.
    Race,
    /// Seat + snack, random per-worker lock order; deadlocks detected by timeout.
    Deadlock,
    /// Seat + snack, always seat first; deadlock-free.
    DeadlockAvoidance,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Serialized,
        StrategyKind::Race,
        StrategyKind::Deadlock,
        StrategyKind::DeadlockAvoidance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Serialized => "serialized",
            StrategyKind::Race => "race",
            StrategyKind::Deadlock => "deadlock",
            StrategyKind::DeadlockAvoidance => "deadlock-avoidance",
        }
    }

    /// Whether the strategy contends on seat/snack pairs.
    pub fn uses_pairs(&self) -> bool {
        matches!(self, StrategyKind::Deadlock | StrategyKind::DeadlockAvoidance)
    }

    /// Strategies that guarantee booking integrity by construction.
    pub fn is_safe(&self) -> bool {
        matches!(self, StrategyKind::Serialized | StrategyKind::DeadlockAvoidance)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}' (expected serialized, race, deadlock or deadlock-avoidance)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serialized" | "synchronized" | "safe" => Ok(StrategyKind::Serialized),
            "race" | "unsafe" => Ok(StrategyKind::Race),
            "deadlock" => Ok(StrategyKind::Deadlock),
            "deadlock-avoidance" | "deadlock_avoidance" | "avoidance" => {
                Ok(StrategyKind::DeadlockAvoidance)
            }
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert_eq!("SAFE".parse::<StrategyKind>().unwrap(), StrategyKind::Serialized);
        assert!("optimistic".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_classification() {
        assert!(StrategyKind::Serialized.is_safe());
        assert!(!StrategyKind::Race.is_safe());
        assert!(!StrategyKind::Race.uses_pairs());
        assert!(StrategyKind::Deadlock.uses_pairs());
        assert!(StrategyKind::DeadlockAvoidance.is_safe());
    }
}
