// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use piyo::wal::{replay_from, ReplayStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub size_bytes: u64,
    pub stats: ReplayStats,
    pub live_events: usize,
    pub first_start: Option<i64>,
    pub last_start: Option<i64>,
}

/// Replays the log read-only; the file is never rewritten.
pub fn report(wal_path: &Path) -> anyhow::Result<InspectReport> {
    let file = File::open(wal_path)
        .with_context(|| format!("Failed to open WAL {:?}", wal_path))?;
    let size_bytes = file.metadata()?.len();
    let (index, stats) = replay_from(BufReader::new(file))
        .with_context(|| format!("Failed to replay WAL {:?}", wal_path))?;

    Ok(InspectReport {
        size_bytes,
        stats,
        live_events: index.len(),
        first_start: index.list().first().map(|e| e.start),
        last_start: index.last().map(|e| e.start),
    })
}

pub fn run(wal_path: &Path) -> anyhow::Result<()> {
    let report = report(wal_path)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Path".to_string(), wal_path.display().to_string()]);
    table.add_row(vec!["Size".to_string(), format!("{} bytes", report.size_bytes)]);
    table.add_row(vec!["Records".to_string(), report.stats.records.to_string()]);
    table.add_row(vec!["Add".to_string(), report.stats.adds.to_string()]);
    table.add_row(vec!["Delete".to_string(), report.stats.deletes.to_string()]);
    table.add_row(vec!["Live events".to_string(), report.live_events.to_string()]);
    table.add_row(vec![
        "Dead records".to_string(),
        report.stats.records.saturating_sub(report.live_events).to_string(),
    ]);
    table.add_row(vec!["First event".to_string(), format_ts(report.first_start)]);
    table.add_row(vec!["Last event".to_string(), format_ts(report.last_start)]);
    table.add_row(vec![
        "Torn tail".to_string(),
        if report.stats.torn_tail { "YES" } else { "no" }.to_string(),
    ]);

    println!("\npiyo WAL Report\n");
    println!("{table}\n");
    Ok(())
}

fn format_ts(ts: Option<i64>) -> String {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}
