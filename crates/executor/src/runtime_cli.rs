// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves `docker` vs `podman` once per executor instance and shells out
//! to whichever was resolved (§4.3 "Runtime selection (this port)", §6
//! "Container runtime CLI").

use crate::error::ExecutorError;
use std::process::Output;
use tokio::process::Command;

/// The container runtime binary this executor was resolved to use. Stored
/// once at executor construction so a single executor never mixes runtimes
/// mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    fn binary(self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }

    /// The resolved CLI binary name, for callers that need to shell out
    /// directly (e.g. the LLM runner's streaming `exec`, which cannot use
    /// [`Self::run`]'s wait-for-completion semantics).
    pub fn binary_name(self) -> &'static str {
        self.binary()
    }

    /// Probe `PATH` for `docker` first, falling back to `podman` (§6).
    pub async fn resolve() -> Result<Self, ExecutorError> {
        if which("docker").await {
            return Ok(ContainerRuntime::Docker);
        }
        if which("podman").await {
            return Ok(ContainerRuntime::Podman);
        }
        Err(ExecutorError::NoContainerRuntime)
    }

    /// Run a CLI subcommand against the resolved runtime, returning stdout
    /// trimmed on success.
    pub async fn run(self, args: &[&str]) -> Result<String, ExecutorError> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ExecutorError::CliFailed {
                runtime: self.binary(),
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run a CLI subcommand, returning the raw output regardless of exit
    /// status (used by callers that need to inspect a non-zero exit, e.g.
    /// `docker exec`'s exit code is the caller's result, not our error).
    pub async fn output(self, args: &[&str]) -> Result<Output, ExecutorError> {
        Command::new(self.binary())
            .args(args)
            .output()
            .await
            .map_err(|source| ExecutorError::Spawn { runtime: self.binary(), source })
    }
}

async fn which(binary: &str) -> bool {
    Command::new("which").arg(binary).output().await.map(|o| o.status.success()).unwrap_or(false)
}
