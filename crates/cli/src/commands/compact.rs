// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use anyhow::Context;
use piyo::{CompactStats, Wal, WalOptions};

/// Rewrites the log in place by opening it, which compacts. Do not run
/// against a WAL a live node holds.
pub fn compact(wal_path: &Path) -> anyhow::Result<CompactStats> {
    if !wal_path.exists() {
        anyhow::bail!("WAL {:?} does not exist", wal_path);
    }
    let (_wal, stats) = Wal::open_with_stats(wal_path, WalOptions::default())
        .with_context(|| format!("Failed to compact WAL {:?}", wal_path))?;
    Ok(stats)
}

pub fn run(wal_path: &Path) -> anyhow::Result<()> {
    let before = std::fs::metadata(wal_path).map(|m| m.len()).unwrap_or(0);
    let stats = compact(wal_path)?;
    let after = std::fs::metadata(wal_path)?.len();

    println!(
        "Compacted {:?}: {} records -> {} events ({} -> {} bytes)",
        wal_path, stats.records_read, stats.events_written, before, after
    );
    if stats.torn_tail {
        println!("Warning: discarded a torn final record");
    }
    Ok(())
}
