// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supplies the per-architecture `mcp-proxy` static binary the executor
//! copies into each container (§4.3 "MCP proxy installation").
//!
//! The proxy binary is `maestro-mcp`'s `mcp-proxy` bin target (see
//! `maestro_mcp::proxy`), cross-compiled for each supported container
//! architecture ahead of time. This crate does not depend on `maestro-mcp`
//! (that would be a build-order inversion — the proxy is compiled as part
//! of the `mcp` crate, not the executor); instead a provider is injected at
//! construction, matching the dependency-injection shape the reference
//! codebase uses for its adapters.

use crate::error::ExecutorError;

/// Source of the `mcp-proxy` binary bytes for a given `uname -m` output
/// (§4.3: "selected by `uname -m` inside the container").
pub trait McpProxyProvider: Send + Sync {
    fn binary_for_arch(&self, arch: &str) -> Result<Vec<u8>, ExecutorError>;
}

/// Loads pre-built `mcp-proxy` binaries from a directory, one file per
/// architecture (`x86_64`, `aarch64`, ...), populated by the release build
/// pipeline that cross-compiles `maestro-mcp`'s `mcp-proxy` bin target.
pub struct DirMcpProxyProvider {
    dir: std::path::PathBuf,
}

impl DirMcpProxyProvider {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl McpProxyProvider for DirMcpProxyProvider {
    fn binary_for_arch(&self, arch: &str) -> Result<Vec<u8>, ExecutorError> {
        let path = self.dir.join(arch);
        std::fs::read(&path).map_err(|e| ExecutorError::ProxyInstallFailed {
            agent_id: maestro_core::AgentId::new(maestro_core::AgentType::Supervisor, "proxy-lookup"),
            reason: format!("no mcp-proxy binary for arch {arch} at {}: {e}", path.display()),
        })
    }
}

/// In-memory provider for tests, avoiding any filesystem dependency.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeMcpProxyProvider {
    pub bytes: Vec<u8>,
}

#[cfg(any(test, feature = "test-support"))]
impl McpProxyProvider for FakeMcpProxyProvider {
    fn binary_for_arch(&self, _arch: &str) -> Result<Vec<u8>, ExecutorError> {
        Ok(self.bytes.clone())
    }
}
