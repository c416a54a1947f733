// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering: progress bar, statistics report, seat map and the
//! side-by-side comparison table.

use std::time::Duration;

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use threadrace_core::{Seat, SimulationObserver, SimulationStats, Venue};

/// Progress bar over `total` workers; hidden when `visible` is false.
pub fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} workers {msg}",
    ) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Observer that drives `bar` from the harness's progress reports.
pub fn progress_observer(bar: ProgressBar) -> SimulationObserver {
    let finished = bar.clone();
    SimulationObserver::new()
        .on_progress(move |progress| {
            bar.set_position(progress.completed as u64);
            bar.set_message(format!("({} active)", progress.active));
        })
        .on_run_completed(move |_| finished.finish_and_clear())
}

fn status(ok: bool, text: &str) -> ColoredString {
    if ok {
        text.green().bold()
    } else {
        text.red().bold()
    }
}

/// Labelled rows of the statistics report, in display order.
pub fn report_rows(stats: &SimulationStats) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Strategy", stats.strategy.to_string()),
        ("Workers", stats.total_workers.to_string()),
        ("Resources", stats.total_resources.to_string()),
    ];

    if stats.strategy.uses_pairs() {
        rows.extend([
            ("Pairs completed", stats.pairs_completed.to_string()),
            ("Snacks reserved", stats.snacks_reserved.to_string()),
            ("Deadlocks detected", stats.deadlocks_detected.to_string()),
            ("Workers stuck", stats.workers_stuck.to_string()),
        ]);
    } else {
        rows.extend([
            ("Seats occupied", stats.resources_occupied.to_string()),
            ("Successful claims", stats.successful_claims.to_string()),
            ("Claim attempts", stats.total_claim_attempts.to_string()),
            ("Collisions", stats.collision_count.to_string()),
            (
                "Oversold",
                format!("{} ({:.1}%)", stats.oversold_count, stats.oversell_percentage()),
            ),
        ]);
    }

    rows.extend([
        ("Failed claims", stats.failed_claims.to_string()),
        ("Elapsed", format!("{:.1?}", stats.elapsed)),
    ]);
    rows
}

pub fn print_report(stats: &SimulationStats) {
    println!();
    println!("{}", "Simulation Report".bold());
    for (label, value) in report_rows(stats) {
        println!("  {:<20} {}", format!("{label}:"), value);
    }
    println!();

    let intact = stats.integrity_intact();
    for line in stats.verdict().lines() {
        if line.starts_with("SAFE MODE") || line.starts_with("UNSAFE MODE") {
            println!("{}", status(stats.is_safe_mode(), line));
        } else if line.starts_with("System integrity") {
            println!("{}", status(intact, line));
        } else {
            println!("{}", line);
        }
    }
    println!();
    println!("{}", stats.summary().dimmed());
}

fn seat_cell(seat: &Seat) -> ColoredString {
    if seat.is_deadlocked() {
        "D".yellow().bold()
    } else if seat.has_collision() && seat.is_occupied() {
        "X".red().bold()
    } else if seat.is_occupied() {
        "#".green()
    } else {
        ".".dimmed()
    }
}

/// Grid of seat states: `.` empty, `#` booked, `X` double booked, `D` deadlocked.
pub fn render_seat_map(venue: &Venue, columns: usize) -> String {
    let columns = columns.max(1);
    venue
        .seats()
        .chunks(columns)
        .map(|row| {
            row.iter()
                .map(|seat| seat_cell(seat).to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Descriptions of every double-booked seat, at most `limit` of them.
pub fn collision_details(venue: &Venue, limit: usize) -> Vec<String> {
    venue
        .seats()
        .iter()
        .filter(|seat| seat.is_occupied() && seat.has_collision())
        .take(limit)
        .map(|seat| format!("Seat {}: {}", seat.index(), seat.describe().replace('\n', " ")))
        .collect()
}

/// Side-by-side table for `compare`.
pub fn render_comparison(safe: &SimulationStats, unsafe_: &SimulationStats) -> String {
    let rows: [(&str, String, String); 7] = [
        ("Seats occupied", safe.resources_occupied.to_string(), unsafe_.resources_occupied.to_string()),
        ("Claim attempts", safe.total_claim_attempts.to_string(), unsafe_.total_claim_attempts.to_string()),
        ("Collisions", safe.collision_count.to_string(), unsafe_.collision_count.to_string()),
        ("Oversold", safe.oversold_count.to_string(), unsafe_.oversold_count.to_string()),
        ("Failed claims", safe.failed_claims.to_string(), unsafe_.failed_claims.to_string()),
        ("Elapsed", format!("{:.1?}", safe.elapsed), format!("{:.1?}", unsafe_.elapsed)),
        (
            "Integrity",
            if safe.integrity_intact() { "INTACT" } else { "COMPROMISED" }.to_string(),
            if unsafe_.integrity_intact() { "INTACT" } else { "COMPROMISED" }.to_string(),
        ),
    ];

    let mut out = format!(
        "{:<16} {:>14} {:>14}\n",
        "",
        safe.strategy.as_str(),
        unsafe_.strategy.as_str()
    );
    for (label, left, right) in rows {
        out.push_str(&format!("{:<16} {:>14} {:>14}\n", label, left, right));
    }
    out
}
