// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Write-Ahead Log
//!
//! The log is the durable source of truth; the in-memory index is a cache
//! rebuilt from it.
//! - Every mutation is appended here before it is applied in memory
//! - Replay folds the log into a fresh `EventIndex` with live semantics
//! - Compaction rewrites the log as one `Add` per live event, via a temp
//!   file that is synced and then renamed over the original
//!
//! # File Format
//! One JSON record per line:
//! ```text
//! {"Ops":0,"Event":{"id":"a","type":"a"}}
//! {"Ops":1,"Event":{"id":"a"}}
//! ```
//! `Ops` 0 is Add, 1 is Delete. Any other tag is a decode failure.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StoreError};
use crate::event::Event;
use crate::index::EventIndex;

/// Log operation tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Add = 0,
    Delete = 1,
}

impl TryFrom<u8> for Op {
    type Error = StoreError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Op::Add),
            1 => Ok(Op::Delete),
            other => Err(StoreError::UnknownOp(other)),
        }
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let tag = u8::deserialize(d)?;
        Op::try_from(tag).map_err(D::Error::custom)
    }
}

/// One entry of the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogRecord {
    Add(Event),
    /// Tombstone; only the id is kept.
    Delete(String),
}

impl LogRecord {
    pub fn op(&self) -> Op {
        match self {
            LogRecord::Add(_) => Op::Add,
            LogRecord::Delete(_) => Op::Delete,
        }
    }

    /// Appends the record, newline included, to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            LogRecord::Add(event) => encode_frame(Op::Add, event, buf),
            LogRecord::Delete(id) => encode_frame(Op::Delete, &Tombstone { id }, buf),
        }
    }

    /// Applies the record to `index` with the same semantics as live writes.
    pub fn apply(self, index: &mut EventIndex) {
        match self {
            LogRecord::Add(event) => index.upsert(event),
            LogRecord::Delete(id) => {
                index.delete(&id);
            }
        }
    }
}

#[derive(Serialize)]
struct Frame<'a, T> {
    #[serde(rename = "Ops")]
    op: Op,
    #[serde(rename = "Event")]
    event: &'a T,
}

#[derive(Serialize)]
struct Tombstone<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "Ops")]
    op: Op,
    #[serde(rename = "Event")]
    event: Event,
}

fn encode_frame<T: Serialize>(op: Op, event: &T, buf: &mut Vec<u8>) -> Result<()> {
    serde_json::to_writer(&mut *buf, &Frame { op, event }).map_err(StoreError::Encode)?;
    buf.push(b'\n');
    Ok(())
}

impl<'de> Deserialize<'de> for LogRecord {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = RawRecord::deserialize(d)?;
        Ok(match raw.op {
            Op::Add => LogRecord::Add(raw.event),
            Op::Delete => LogRecord::Delete(raw.event.id),
        })
    }
}

/// Iterator over the records of a log.
///
/// A final fragment without a newline that fails to decode because the input
/// ended is a torn append from a crash: it is dropped and flagged through
/// `torn_tail()`. Every other decode failure is returned and ends iteration.
pub struct LogReader<R> {
    reader: R,
    line: usize,
    buf: String,
    done: bool,
    torn_tail: bool,
}

impl<R: BufRead> LogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
            done: false,
            torn_tail: false,
        }
    }

    pub fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    /// Lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn next_record(&mut self) -> Result<Option<LogRecord>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return match serde_json::from_str(text) {
                Ok(record) => Ok(Some(record)),
                Err(e) if e.is_eof() && !self.buf.ends_with('\n') => {
                    tracing::warn!(line = self.line, "Discarding torn record at end of log");
                    self.torn_tail = true;
                    Ok(None)
                }
                Err(source) => Err(StoreError::Decode {
                    line: self.line,
                    source,
                }),
            };
        }
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Opens a log file read-only. Nothing is compacted or rewritten.
pub fn read_log(path: impl AsRef<Path>) -> Result<LogReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(LogReader::new(BufReader::new(file)))
}

/// Outcome of a replay pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: usize,
    pub adds: usize,
    pub deletes: usize,
    pub torn_tail: bool,
}

/// Folds every record from `reader` into a fresh index.
pub fn replay_from<R: BufRead>(reader: R) -> Result<(EventIndex, ReplayStats)> {
    let mut index = EventIndex::new();
    let mut stats = ReplayStats::default();
    let mut records = LogReader::new(reader);
    for record in records.by_ref() {
        let record = record?;
        stats.records += 1;
        match record.op() {
            Op::Add => stats.adds += 1,
            Op::Delete => stats.deletes += 1,
        }
        record.apply(&mut index);
    }
    stats.torn_tail = records.torn_tail();
    Ok((index, stats))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalOptions {
    /// `sync_data` after every append.
    pub sync_on_append: bool,
}

impl Default for WalOptions {
    fn default() -> Self {
        Self {
            sync_on_append: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactStats {
    pub records_read: usize,
    pub events_written: usize,
    pub torn_tail: bool,
}

/// Append handle to a single log file.
///
/// `append` and `compact` serialize on one mutex. The handle slot is empty
/// only between a compaction's rename and its reopen; an append that finds
/// it empty reopens the file itself.
pub struct Wal {
    path: PathBuf,
    options: WalOptions,
    file: Mutex<Option<File>>,
}

impl Wal {
    /// Opens or creates the log and compacts it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, WalOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: WalOptions) -> Result<Self> {
        Self::open_compacted(path, options).map(|(wal, _, _)| wal)
    }

    /// Opens, compacts, and hands back the index the compaction produced.
    pub fn open_replayed(
        path: impl AsRef<Path>,
        options: WalOptions,
    ) -> Result<(Self, EventIndex)> {
        Self::open_compacted(path, options).map(|(wal, index, _)| (wal, index))
    }

    /// Opens and reports what the opening compaction did.
    pub fn open_with_stats(
        path: impl AsRef<Path>,
        options: WalOptions,
    ) -> Result<(Self, CompactStats)> {
        Self::open_compacted(path, options).map(|(wal, _, stats)| (wal, stats))
    }

    fn open_compacted(
        path: impl AsRef<Path>,
        options: WalOptions,
    ) -> Result<(Self, EventIndex, CompactStats)> {
        let path = path.as_ref().to_path_buf();
        let file = open_handle(&path)?;
        let wal = Self {
            path,
            options,
            file: Mutex::new(Some(file)),
        };

        let (index, stats) = {
            let mut slot = wal.lock()?;
            wal.compact_locked(&mut slot)?
        };
        tracing::info!(
            path = %wal.path.display(),
            records = stats.records_read,
            events = stats.events_written,
            "WAL opened"
        );
        Ok((wal, index, stats))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> WalOptions {
        self.options
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<File>>> {
        self.file.lock().map_err(|_| StoreError::LockPoisoned("wal"))
    }

    /// Appends one record at end of file.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let mut buf = Vec::with_capacity(128);
        record.encode(&mut buf)?;
        self.append_encoded(&buf, record.op())
    }

    pub fn write(&self, event: &Event) -> Result<()> {
        let mut buf = Vec::with_capacity(128);
        encode_frame(Op::Add, event, &mut buf)?;
        self.append_encoded(&buf, Op::Add)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.append(&LogRecord::Delete(id.to_string()))
    }

    fn append_encoded(&self, buf: &[u8], op: Op) -> Result<()> {
        let mut slot = self.lock()?;
        let file = handle(&mut slot, &self.path)?;
        let sync = self.options.sync_on_append;
        append_or_rollback(file, buf, |file, buf| {
            file.write_all(buf)?;
            if sync {
                file.sync_data()?;
            }
            Ok(())
        })?;
        tracing::debug!(op = ?op, bytes = buf.len(), "WAL append");
        Ok(())
    }

    /// Rebuilds the index from the start of the log.
    pub fn replay(&self) -> Result<EventIndex> {
        let mut slot = self.lock()?;
        let file = handle(&mut slot, &self.path)?;
        replay_handle(file).map(|(index, _)| index)
    }

    /// Rewrites the log as one `Add` per live event.
    ///
    /// The replacement is written to a sibling temp file, synced, then renamed
    /// over the log. On any failure before the rename the original is untouched.
    pub fn compact(&self) -> Result<CompactStats> {
        let mut slot = self.lock()?;
        self.compact_locked(&mut slot).map(|(_, stats)| stats)
    }

    fn compact_locked(&self, slot: &mut Option<File>) -> Result<(EventIndex, CompactStats)> {
        let file = handle(slot, &self.path)?;
        let (index, replayed) = replay_handle(file)?;

        let tmp_path = compaction_path(&self.path);
        if let Err(e) = write_compacted(&tmp_path, &index) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Drop the old handle: after the rename it would point at the
        // unlinked inode.
        *slot = None;
        fs::rename(&tmp_path, &self.path)?;
        sync_parent_dir(&self.path)?;
        *slot = Some(open_handle(&self.path)?);

        let stats = CompactStats {
            records_read: replayed.records,
            events_written: index.len(),
            torn_tail: replayed.torn_tail,
        };
        tracing::debug!(
            records_read = stats.records_read,
            events_written = stats.events_written,
            "WAL compacted"
        );
        Ok((index, stats))
    }
}

fn open_handle(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    Ok(file)
}

fn handle<'a>(slot: &'a mut Option<File>, path: &Path) -> Result<&'a mut File> {
    match slot {
        Some(file) => Ok(file),
        None => Ok(slot.insert(open_handle(path)?)),
    }
}

/// Sibling the compacted log is staged in: the full file name plus
/// `.compact`, so logs sharing a stem never share a staging file.
pub(crate) fn compaction_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".compact");
    path.with_file_name(name)
}

/// Runs `write` at end of file. If it fails the file is cut back to its
/// previous length so a partial record cannot prefix the next one.
fn append_or_rollback<F>(file: &mut File, buf: &[u8], write: F) -> Result<()>
where
    F: FnOnce(&mut File, &[u8]) -> std::io::Result<()>,
{
    let prev_len = file.seek(SeekFrom::End(0))?;
    if let Err(e) = write(file, buf) {
        if let Err(trunc) = file.set_len(prev_len) {
            tracing::error!(len = prev_len, "Failed to roll back partial WAL append: {}", trunc);
        }
        return Err(e.into());
    }
    Ok(())
}

fn replay_handle(file: &mut File) -> Result<(EventIndex, ReplayStats)> {
    file.seek(SeekFrom::Start(0))?;
    replay_from(BufReader::new(file))
}

fn write_compacted(tmp_path: &Path, index: &EventIndex) -> Result<()> {
    let file = File::create(tmp_path)?;
    let mut writer = BufWriter::new(file);
    let mut buf = Vec::with_capacity(128);
    for event in index.list() {
        buf.clear();
        encode_frame(Op::Add, event, &mut buf)?;
        writer.write_all(&buf)?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
