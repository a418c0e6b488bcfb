// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container configuration shared between the container executor and the
//! agent driver that requests a container be started for it (§3.4).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hard resource caps applied to every agent container (§4.3).
///
/// Defaults: 2 CPUs / 2 GiB / 1024 PIDs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpus: f64,
    pub memory_mib: u64,
    pub pids_limit: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { cpus: 2.0, memory_mib: 2048, pids_limit: 1024 }
    }
}

/// Tmpfs mount sizes for the directories that must be writable despite the
/// read-only root filesystem (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TmpfsMounts {
    pub tmp_mib: u64,
    pub home_mib: u64,
    pub cache_mib: u64,
}

impl Default for TmpfsMounts {
    fn default() -> Self {
        Self { tmp_mib: 512, home_mib: 100, cache_mib: 100 }
    }
}

/// A single read-only bind mount of another agent's workspace, used to give
/// the architect visibility into each coder's checkout
/// (`/mnt/coders/coder-NNN`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// Everything the container executor needs to provision one agent's
/// container. Constructed by the agent factory (out of scope) and handed to
/// `ContainerExecutor::start_container`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container image (e.g. `"maestro-agent:latest"`).
    pub image: String,
    /// Host path bind-mounted read-write at `/workspace` (read-only if
    /// `read_only` is set).
    pub workdir: PathBuf,
    pub read_only: bool,
    /// Additional read-only binds, e.g. coder workspaces for the architect.
    #[serde(default)]
    pub ro_mounts: Vec<RoMount>,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
    #[serde(default)]
    pub tmpfs: TmpfsMounts,
    /// Disable networking inside the container entirely.
    #[serde(default)]
    pub network_none: bool,
}

impl ContainerConfig {
    pub fn new(image: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            workdir: workdir.into(),
            read_only: false,
            ro_mounts: Vec::new(),
            resource_limits: ResourceLimits::default(),
            tmpfs: TmpfsMounts::default(),
            network_none: false,
        }
    }

    crate::setters! {
        set { read_only: bool, resource_limits: ResourceLimits, tmpfs: TmpfsMounts, network_none: bool }
    }

    pub fn with_ro_mount(mut self, mount: RoMount) -> Self {
        self.ro_mounts.push(mount);
        self
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
