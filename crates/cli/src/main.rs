// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use piyo_cli::commands::{compact, inspect, list};
use piyo_cli::commands::list::ListOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "piyo")]
#[command(about = "piyo - inspect and maintain event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a WAL: record counts, live events, time span.
    Inspect {
        wal_path: PathBuf,
    },
    /// List live events, optionally filtered.
    List {
        wal_path: PathBuf,

        /// First day to include (YYYY-MM-DD, UTC)
        #[arg(long)]
        from: Option<String>,

        /// Last day to include (YYYY-MM-DD, UTC)
        #[arg(long)]
        to: Option<String>,

        /// Comma-separated actors
        #[arg(long)]
        who: Option<String>,

        /// Comma-separated categories
        #[arg(long = "type")]
        category: Option<String>,

        /// Show times relative to now
        #[arg(long, short)]
        relative: bool,
    },
    /// Rewrite a WAL so it holds one Add per live event.
    /// Stop any node using the file first.
    Compact {
        wal_path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { wal_path } => inspect::run(&wal_path)?,
        Commands::List {
            wal_path,
            from,
            to,
            who,
            category,
            relative,
        } => {
            let opts = ListOptions {
                from,
                to,
                who,
                category,
            };
            list::run(&wal_path, &opts, relative)?
        }
        Commands::Compact { wal_path } => compact::run(&wal_path)?,
    }

    Ok(())
}
