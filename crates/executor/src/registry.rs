// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container record (§3.4) and the process-wide container registry,
//! modeled per §9 "Global state" as a value owned by the supervisor and
//! passed explicitly to executors rather than a singleton.

use maestro_core::{ContainerConfig, ResourceLimits, RoMount, TmpfsMounts};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use maestro_core::AgentId;

/// Everything the executor tracks about one agent's running container,
/// beyond the `ContainerConfig` it was started with (§3.4).
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub container_name: String,
    pub container_id: Option<String>,
    pub created_at_ms: u64,
    pub last_used_ms: u64,
    pub workspace_host_path: PathBuf,
    pub workspace_container_path: &'static str,
    pub ro_mounts: Vec<RoMount>,
    pub tmpfs_mounts: TmpfsMounts,
    pub resource_caps: ResourceLimits,
    pub auth_token: String,
    pub mcp_port: u16,
}

impl ContainerRecord {
    pub fn new(container_name: String, config: &ContainerConfig, auth_token: String, mcp_port: u16, now_ms: u64) -> Self {
        Self {
            container_name,
            container_id: None,
            created_at_ms: now_ms,
            last_used_ms: now_ms,
            workspace_host_path: config.workdir.clone(),
            workspace_container_path: "/workspace",
            ro_mounts: config.ro_mounts.clone(),
            tmpfs_mounts: config.tmpfs,
            resource_caps: config.resource_limits,
            auth_token,
            mcp_port,
        }
    }
}

/// Deterministic container name for an agent, `maestro-<kind>-<instance>`
/// (§4.3).
pub fn container_name_for(agent_id: &AgentId) -> String {
    format!("maestro-{}-{}", agent_id.agent_type(), agent_id.instance())
}

/// An explicit, owned registry of every container this supervisor started
/// (§3.5 "Executor owns its container record", §9 "Global state"). Cheaply
/// cloneable (`Arc` inside); the supervisor constructs one instance and
/// hands it to every executor.
#[derive(Clone, Default)]
pub struct ContainerRegistry {
    inner: Arc<Mutex<HashMap<AgentId, ContainerRecord>>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agent_id: AgentId, record: ContainerRecord) {
        self.inner.lock().insert(agent_id, record);
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<ContainerRecord> {
        self.inner.lock().get(agent_id).cloned()
    }

    pub fn remove(&self, agent_id: &AgentId) -> Option<ContainerRecord> {
        self.inner.lock().remove(agent_id)
    }

    pub fn touch(&self, agent_id: &AgentId, now_ms: u64) {
        if let Some(record) = self.inner.lock().get_mut(agent_id) {
            record.last_used_ms = now_ms;
        }
    }

    /// Number of containers currently tracked (testable property 4: after
    /// shutdown this must be 0).
    pub fn count(&self) -> usize {
        self.inner.lock().len()
    }

    /// All agent ids with a registered container, for bulk teardown and for
    /// the idle-cleanup sweep.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Agent ids whose container has been idle longer than `threshold_ms`
    /// as of `now_ms` (§4.3 "a cleanup routine optionally stops containers
    /// idle longer than a configured threshold").
    pub fn idle_longer_than(&self, threshold_ms: u64, now_ms: u64) -> Vec<AgentId> {
        self.inner
            .lock()
            .iter()
            .filter(|(_, record)| now_ms.saturating_sub(record.last_used_ms) >= threshold_ms)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
