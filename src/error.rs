// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A log record that could not be decoded. Fatal to replay.
    #[error("Malformed log record at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Unknown log operation tag {0}")]
    UnknownOp(u8),

    #[error("Negative duration {0}ns")]
    NegativeDuration(i64),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, StoreError>;
