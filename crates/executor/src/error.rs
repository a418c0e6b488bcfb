// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the container executor (§4.3, §7).

use maestro_core::AgentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("neither docker nor podman found on PATH")]
    NoContainerRuntime,

    #[error("{runtime} {args} failed: {stderr}")]
    CliFailed { runtime: &'static str, args: String, stderr: String },

    #[error("failed to exec {runtime}: {source}")]
    Spawn { runtime: &'static str, #[source] source: std::io::Error },

    #[error("mount probe for {host_path} did not succeed within the 5s deadline: {reason}")]
    MountProbeTimeout { host_path: String, reason: String },

    #[error("no container registered for agent {0}")]
    NotRegistered(AgentId),

    #[error("mcp-proxy install failed for agent {agent_id}: {reason}")]
    ProxyInstallFailed { agent_id: AgentId, reason: String },

    #[error("command inside container timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("host path {0} is not an allowed bind-mount root on this platform")]
    DisallowedHostPath(String),
}
