// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher's event log (§6): an append-only stream of every message
//! that passes through `DispatchMessage`, one JSON record per line, rotated
//! hourly so long-running supervisors never accumulate one unbounded file.

use chrono::{DateTime, Utc};
use maestro_core::Message;
use serde::{Deserialize, Serialize};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::EventLogError;

/// Why a message was recorded: dispatched, delivered to the recipient's
/// inbox, or dropped (e.g. recipient detached before delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDirection {
    Sent,
    Delivered,
    Dropped,
}

/// One line of the event log: the cloned message plus a wall-clock
/// timestamp and direction tag (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogRecord {
    pub message: Message,
    pub recorded_at_ms: u64,
    pub direction: EventDirection,
}

/// Sink the dispatcher clones every sent/delivered/dropped message into.
/// Implemented by `FileEventLog`; tests typically use an in-memory
/// `Vec`-backed fake instead.
pub trait EventLogSink: Send + Sync {
    fn record(&self, message: &Message, recorded_at_ms: u64, direction: EventDirection) -> Result<(), EventLogError>;
}

/// Hourly-rotated append-only JSON-lines event log.
///
/// Segment file names are `{log_dir}/{YYYYMMDD-HH}.jsonl`; a new segment is
/// started automatically whenever the wall-clock hour advances. Consumers
/// (tests, audits) read completed segments — i.e. every file other than the
/// currently-open one.
pub struct FileEventLog {
    log_dir: PathBuf,
    current: Mutex<Option<(String, fs::File)>>,
}

impl FileEventLog {
    pub fn open(log_dir: impl Into<PathBuf>) -> Result<Self, EventLogError> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir).map_err(|e| EventLogError::CreateDir(log_dir.clone(), e))?;
        Ok(Self { log_dir, current: Mutex::new(None) })
    }

    fn segment_name(recorded_at_ms: u64) -> String {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(recorded_at_ms as i64).unwrap_or_else(Utc::now);
        dt.format("%Y%m%d-%H").to_string()
    }

    fn segment_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}.jsonl"))
    }

    /// Paths of every segment that is no longer the active (current-hour)
    /// one, oldest first.
    pub fn completed_segments(&self) -> Vec<PathBuf> {
        let current_name = self.current.lock().as_ref().map(|(n, _)| n.clone());
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.log_dir)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
            .filter(|p| {
                let stem = p.file_stem().and_then(|s| s.to_str());
                stem != current_name.as_deref()
            })
            .collect();
        paths.sort();
        paths
    }
}

impl EventLogSink for FileEventLog {
    fn record(&self, message: &Message, recorded_at_ms: u64, direction: EventDirection) -> Result<(), EventLogError> {
        let name = Self::segment_name(recorded_at_ms);
        let record = EventLogRecord { message: message.clone(), recorded_at_ms, direction };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut guard = self.current.lock();
        let needs_new = match guard.as_ref() {
            Some((open_name, _)) => *open_name != name,
            None => true,
        };
        if needs_new {
            let path = self.segment_path(&name);
            let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|e| EventLogError::Open(path, e))?;
            *guard = Some((name.clone(), file));
        }
        let Some((_, file)) = guard.as_mut() else {
            unreachable!("segment was just opened above when absent")
        };
        file.write_all(line.as_bytes()).map_err(|e| EventLogError::Append(self.segment_path(&name), e))?;
        Ok(())
    }
}

/// Read every record from a completed segment file, in on-disk order.
pub fn read_segment(path: &Path) -> Result<Vec<EventLogRecord>, EventLogError> {
    let bytes = fs::read(path).map_err(|e| EventLogError::Open(path.to_path_buf(), e))?;
    let text = String::from_utf8_lossy(&bytes);
    text.lines().filter(|l| !l.trim().is_empty()).map(|l| serde_json::from_str(l).map_err(EventLogError::from)).collect()
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
