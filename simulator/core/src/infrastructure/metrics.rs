// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Metrics Observer
//
// Feeds claim, collision and deadlock counts into the `metrics` facade.
// Without an installed recorder every call is a no-op, so the observer can be
// registered unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::application::SimulationObserver;

pub const CLAIMS_TOTAL: &str = "threadrace_claims_total";
pub const CLAIM_FAILURES_TOTAL: &str = "threadrace_claim_failures_total";
pub const COLLISIONS_TOTAL: &str = "threadrace_collisions_total";
pub const DEADLOCKS_TOTAL: &str = "threadrace_deadlocks_total";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(CLAIMS_TOTAL, "Successful seat claims, double bookings included");
    describe_counter!(CLAIM_FAILURES_TOTAL, "Workers that ended without a booking");
    describe_counter!(COLLISIONS_TOTAL, "Collision notifications raised by the race strategy");
    describe_counter!(DEADLOCKS_TOTAL, "Deadlock notifications from the pair strategies");
    describe_gauge!("threadrace_resources_occupied", "Occupied seats after the last run");
    describe_gauge!("threadrace_oversold", "Claims beyond capacity in the last run");
    describe_gauge!("threadrace_pairs_completed", "Seat/snack pairs completed in the last run");
    describe_gauge!("threadrace_workers_stuck", "Workers stuck on deadlocked pairs in the last run");
}

/// Observer that records every notification as a metric.
pub fn metrics_observer() -> SimulationObserver {
    SimulationObserver::new()
        .on_resource_claimed(|_, _| counter!(CLAIMS_TOTAL).increment(1))
        .on_claim_failed(|_| counter!(CLAIM_FAILURES_TOTAL).increment(1))
        .on_collision_detected(|_| counter!(COLLISIONS_TOTAL).increment(1))
        .on_deadlock_detected(|_, _, _| counter!(DEADLOCKS_TOTAL).increment(1))
        .on_run_completed(|stats| {
            let strategy = stats.strategy.as_str();
            gauge!("threadrace_resources_occupied", "strategy" => strategy).set(stats.resources_occupied as f64);
            gauge!("threadrace_oversold", "strategy" => strategy).set(stats.oversold_count as f64);
            gauge!("threadrace_pairs_completed", "strategy" => strategy).set(stats.pairs_completed as f64);
            gauge!("threadrace_workers_stuck", "strategy" => strategy).set(stats.workers_stuck as f64);
        })
}
