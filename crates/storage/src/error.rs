// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the state store and event log.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("failed to create state directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("failed to write state file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to read state file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to rename temp file into place at {0}: {1}")]
    Rename(PathBuf, #[source] std::io::Error),

    #[error("failed to delete state file {0}: {1}")]
    Delete(PathBuf, #[source] std::io::Error),

    #[error("corrupt state blob at {0}: {1}")]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("failed to serialize state blob: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to create event log directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("failed to open event log segment {0}: {1}")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("failed to append to event log segment {0}: {1}")]
    Append(PathBuf, #[source] std::io::Error),

    #[error("failed to serialize event log record: {0}")]
    Serialize(#[from] serde_json::Error),
}
