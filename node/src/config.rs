// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use piyo::WalOptions;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Without a WAL the node keeps events in memory only.
    pub wal_path: Option<PathBuf>,
    /// Background compaction period. Needs `wal_path`.
    pub compact_interval_secs: Option<u64>,
    pub sync_on_append: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            wal_path: None,
            compact_interval_secs: None,
            sync_on_append: true,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `PIYO_BIND_ADDR`, `PIYO_WAL_PATH`,
    /// `PIYO_COMPACT_INTERVAL_SECS` and `PIYO_SYNC_ON_APPEND`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(addr) = lookup("PIYO_BIND_ADDR") {
            cfg.bind_addr = parse("PIYO_BIND_ADDR", addr)?;
        }
        if let Some(path) = lookup("PIYO_WAL_PATH").filter(|p| !p.is_empty()) {
            cfg.wal_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup("PIYO_COMPACT_INTERVAL_SECS") {
            let secs: u64 = parse("PIYO_COMPACT_INTERVAL_SECS", secs)?;
            cfg.compact_interval_secs = (secs > 0).then_some(secs);
        }
        if let Some(sync) = lookup("PIYO_SYNC_ON_APPEND") {
            cfg.sync_on_append = parse("PIYO_SYNC_ON_APPEND", sync)?;
        }
        Ok(cfg)
    }

    pub fn wal_options(&self) -> WalOptions {
        WalOptions {
            sync_on_append: self.sync_on_append,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
