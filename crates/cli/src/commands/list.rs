// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use piyo::wal::replay_from;
use piyo::{Event, Select};

/// Filters for `piyo list`. Dates are whole UTC days, both inclusive.
#[derive(Debug, Default, Clone)]
pub struct ListOptions {
    pub from: Option<String>,
    pub to: Option<String>,
    pub who: Option<String>,
    pub category: Option<String>,
}

impl ListOptions {
    pub fn bounds(&self) -> anyhow::Result<(i64, i64)> {
        let start = match &self.from {
            Some(day) => day_start(parse_day(day)?)?,
            None => i64::MIN,
        };
        let end = match &self.to {
            Some(day) => {
                let next = parse_day(day)?.succ_opt().context("Date out of range")?;
                day_start(next)? - 1
            }
            None => i64::MAX,
        };
        if end < start {
            bail!("--from needs to be before --to");
        }
        Ok((start, end))
    }
}

fn parse_day(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD", value))
}

fn day_start(day: NaiveDate) -> anyhow::Result<i64> {
    day.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc().timestamp())
        .context("Date out of range")
}

/// Live events in `wal_path` matching `opts`, in ordering-key order.
pub fn select_events(wal_path: &Path, opts: &ListOptions) -> anyhow::Result<Vec<Event>> {
    let (start, end) = opts.bounds()?;
    let file = File::open(wal_path)
        .with_context(|| format!("Failed to open WAL {:?}", wal_path))?;
    let (index, _) = replay_from(BufReader::new(file))
        .with_context(|| format!("Failed to replay WAL {:?}", wal_path))?;

    let select = Select::parse(opts.who.as_deref(), opts.category.as_deref());
    Ok(select.filter(index.query(start, end)))
}

pub fn run(wal_path: &Path, opts: &ListOptions, relative: bool) -> anyhow::Result<()> {
    let events = select_events(wal_path, opts)?;

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }

    let now = Local::now();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["When", "Who", "Type", "Value", "Unit", "Id"]);

    for event in &events {
        let when = if relative {
            event
                .display_since(now)
                .split('\t')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            event
                .local_start()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| event.start.to_string())
        };
        let (value, unit) = event.measurement();
        table.add_row(vec![
            when,
            event.actor.clone(),
            event.category.clone(),
            value.to_string(),
            unit.to_string(),
            event.effective_id(),
        ]);
    }

    println!("{table}");
    println!("{} event(s)", events.len());
    Ok(())
}
