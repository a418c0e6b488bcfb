// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state-store collaborator (§6, §3.2): one JSON file per agent under
//! `{state_dir}/{agent_id}.json`, written tmp-then-rename for crash
//! consistency. §3.2 requires that a reader sees either the pre- or
//! post-transition value, never a partial write — `rename` on the same
//! filesystem is atomic, which is exactly what this guarantees.

use crate::error::StateStoreError;
use maestro_core::{AgentId, AgentStateBlob};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

/// `Get(id) -> blob|nil`, `Put(id, blob)` atomic, `Delete(id)` (§6).
pub trait StateStore: Send + Sync {
    fn get(&self, agent_id: &AgentId) -> Result<Option<AgentStateBlob>, StateStoreError>;
    fn put(&self, blob: &AgentStateBlob) -> Result<(), StateStoreError>;
    fn delete(&self, agent_id: &AgentId) -> Result<(), StateStoreError>;
}

/// Filesystem-backed `StateStore`.
pub struct FileStateStore {
    state_dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileStateStore {
    /// Opens (creating if necessary) a directory of per-agent state files.
    pub fn open(state_dir: impl Into<PathBuf>) -> Result<Self, StateStoreError> {
        let state_dir = state_dir.into();
        std::fs::create_dir_all(&state_dir).map_err(|e| StateStoreError::CreateDir(state_dir.clone(), e))?;
        Ok(Self { state_dir, tmp_counter: AtomicU64::new(0) })
    }

    fn path_for(&self, agent_id: &AgentId) -> PathBuf {
        // `AgentId` is always `type:instance`; ':' is not filesystem-safe on
        // every platform, so it is rendered as '-' in the file name while the
        // blob's own `agent_id` field (not the path) remains authoritative.
        self.state_dir.join(format!("{}.json", agent_id.as_str().replace(':', "-")))
    }

    fn tmp_path_for(&self, final_path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        final_path.with_extension(format!("json.tmp.{}.{}", process::id(), n))
    }
}

impl StateStore for FileStateStore {
    fn get(&self, agent_id: &AgentId) -> Result<Option<AgentStateBlob>, StateStoreError> {
        let path = self.path_for(agent_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateStoreError::Read(path, e)),
        };
        let blob = serde_json::from_slice(&bytes).map_err(|e| StateStoreError::Corrupt(path, e))?;
        Ok(Some(blob))
    }

    fn put(&self, blob: &AgentStateBlob) -> Result<(), StateStoreError> {
        let path = self.path_for(&blob.agent_id);
        let tmp_path = self.tmp_path_for(&path);
        let bytes = serde_json::to_vec_pretty(blob)?;
        std::fs::write(&tmp_path, &bytes).map_err(|e| StateStoreError::Write(tmp_path.clone(), e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StateStoreError::Rename(path, e))?;
        Ok(())
    }

    fn delete(&self, agent_id: &AgentId) -> Result<(), StateStoreError> {
        let path = self.path_for(agent_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateStoreError::Delete(path, e)),
        }
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
