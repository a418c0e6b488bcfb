// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container executor (§4.3): one long-running container per agent,
//! provisioned with the mandatory hardening, and a `run` operation that
//! execs one-shot commands inside it.

use async_trait::async_trait;
use maestro_core::{AgentId, ContainerConfig};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ExecutorError;
use crate::mount_probe::probe_mount;
use crate::proxy::McpProxyProvider;
use crate::registry::{container_name_for, ContainerRecord, ContainerRegistry};
use crate::runtime_cli::ContainerRuntime;

/// One-shot command execution request against an already-started container
/// (§4.3 "Run semantics").
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the container's default `/workspace` working directory.
    pub workdir: Option<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Bytes written to the exec'd process's stdin, if any.
    pub stdin: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub duration: Duration,
}

/// `Run(ctx, argv, opts) -> Result{stdout, stderr, exit_code, duration}`
/// (§4.3), plus container provisioning and teardown.
#[async_trait]
pub trait ContainerExecutor: Send + Sync {
    async fn start_container(&self, agent_id: &AgentId, config: &ContainerConfig) -> Result<(), ExecutorError>;
    async fn run(&self, agent_id: &AgentId, argv: &[String], opts: RunOptions) -> Result<RunResult, ExecutorError>;
    async fn install_mcp_proxy(&self, agent_id: &AgentId, mcp_addr: &str, auth_token: &str) -> Result<(), ExecutorError>;
    async fn stop_container(&self, agent_id: &AgentId) -> Result<(), ExecutorError>;
}

/// `ContainerExecutor` backed by a resolved `docker`/`podman` CLI (§4.3,
/// §6). The registry is injected, never a global/static (§9 "Global
/// state").
pub struct DockerContainerExecutor<P> {
    runtime: ContainerRuntime,
    registry: ContainerRegistry,
    proxy_provider: P,
}

const MOUNT_PROBE_IMAGE: &str = "busybox:latest";

impl<P: McpProxyProvider> DockerContainerExecutor<P> {
    pub fn new(runtime: ContainerRuntime, registry: ContainerRegistry, proxy_provider: P) -> Self {
        Self { runtime, registry, proxy_provider }
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    fn build_run_args(&self, config: &ContainerConfig, container_name: &str) -> Vec<String> {
        let mut args: Vec<String> = vec!["run".into(), "-d".into(), "--name".into(), container_name.into()];

        args.push("--security-opt".into());
        args.push("no-new-privileges".into());
        args.push("--read-only".into());
        if config.network_none {
            args.push("--network".into());
            args.push("none".into());
        }
        args.push("--pids-limit".into());
        args.push(config.resource_limits.pids_limit.to_string());
        args.push("--cpus".into());
        args.push(config.resource_limits.cpus.to_string());
        args.push("--memory".into());
        args.push(format!("{}m", config.resource_limits.memory_mib));
        args.push("--user".into());
        args.push("1000:1000".into());

        args.push("--tmpfs".into());
        args.push(format!("/tmp:exec,size={}m", config.tmpfs.tmp_mib));
        args.push("--tmpfs".into());
        args.push(format!("/home:size={}m", config.tmpfs.home_mib));
        args.push("--tmpfs".into());
        args.push(format!("/.cache:size={}m", config.tmpfs.cache_mib));
        args.push("-e".into());
        args.push("HOME=/tmp".into());

        if cfg!(target_os = "linux") {
            args.push("--add-host".into());
            args.push("host.docker.internal:host-gateway".into());
        }

        let ro_suffix = if config.read_only { ":ro" } else { "" };
        args.push("-v".into());
        args.push(format!("{}:/workspace{}", config.workdir.display(), ro_suffix));

        for mount in &config.ro_mounts {
            args.push("-v".into());
            args.push(format!("{}:{}:ro", mount.host_path.display(), mount.container_path));
        }

        args.push(config.image.clone());
        args.push("sleep".into());
        args.push("infinity".into());
        args
    }

    async fn docker_exists(&self, container_name: &str) -> Result<bool, ExecutorError> {
        let ids = self
            .runtime
            .run(&["ps", "-a", "-q", "--filter", &format!("name=^{container_name}$")])
            .await?;
        Ok(!ids.trim().is_empty())
    }
}

#[async_trait]
impl<P: McpProxyProvider> ContainerExecutor for DockerContainerExecutor<P> {
    #[tracing::instrument(skip(self, config), fields(agent_id = %agent_id))]
    async fn start_container(&self, agent_id: &AgentId, config: &ContainerConfig) -> Result<(), ExecutorError> {
        let container_name = container_name_for(agent_id);

        if self.docker_exists(&container_name).await? {
            tracing::warn!(%container_name, "removing stale container from a crashed prior run");
            let _ = self.runtime.run(&["rm", "-f", &container_name]).await;
        }

        probe_mount(self.runtime, &config.workdir, MOUNT_PROBE_IMAGE).await?;
        for mount in &config.ro_mounts {
            probe_mount(self.runtime, &mount.host_path, MOUNT_PROBE_IMAGE).await?;
        }

        let args = self.build_run_args(config, &container_name);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let container_id = self.runtime.run(&arg_refs).await?;

        let auth_token = generate_auth_token();
        let mut record = ContainerRecord::new(container_name, config, auth_token, 0, now_ms());
        record.container_id = Some(container_id);
        self.registry.insert(agent_id.clone(), record);

        tracing::info!(%agent_id, "container started");
        Ok(())
    }

    #[tracing::instrument(skip(self, argv, opts), fields(agent_id = %agent_id))]
    async fn run(&self, agent_id: &AgentId, argv: &[String], opts: RunOptions) -> Result<RunResult, ExecutorError> {
        let record = self.registry.get(agent_id).ok_or_else(|| ExecutorError::NotRegistered(agent_id.clone()))?;

        let mut args: Vec<String> = vec!["exec".into(), "-i".into(), "--user".into(), "1000:1000".into()];
        args.push("-w".into());
        args.push(opts.workdir.clone().unwrap_or_else(|| "/workspace".into()));
        for (k, v) in &opts.env {
            args.push("-e".into());
            args.push(format!("{k}={v}"));
        }
        args.push(record.container_name.clone());
        args.extend(argv.iter().cloned());

        let mut child = Command::new(self.runtime_binary())
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|source| ExecutorError::Spawn { runtime: self.runtime_binary_name(), source })?;

        if let Some(stdin_bytes) = opts.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(&stdin_bytes).await;
            }
        } else {
            drop(child.stdin.take());
        }

        let start = std::time::Instant::now();
        let timeout = opts.timeout.unwrap_or(Duration::from_secs(600));
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ExecutorError::Spawn { runtime: self.runtime_binary_name(), source })?,
            Err(_) => return Err(ExecutorError::Timeout(timeout)),
        };

        self.registry.touch(agent_id, now_ms());
        Ok(RunResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    #[tracing::instrument(skip(self, mcp_addr, auth_token), fields(agent_id = %agent_id))]
    async fn install_mcp_proxy(&self, agent_id: &AgentId, mcp_addr: &str, auth_token: &str) -> Result<(), ExecutorError> {
        let record = self.registry.get(agent_id).ok_or_else(|| ExecutorError::NotRegistered(agent_id.clone()))?;

        let arch = self
            .run(agent_id, &["uname".into(), "-m".into()], RunOptions::default())
            .await
            .map(|r| String::from_utf8_lossy(&r.stdout).trim().to_string())
            .map_err(|e| ExecutorError::ProxyInstallFailed { agent_id: agent_id.clone(), reason: e.to_string() })?;

        let bytes = self
            .proxy_provider
            .binary_for_arch(&arch)
            .map_err(|e| ExecutorError::ProxyInstallFailed { agent_id: agent_id.clone(), reason: e.to_string() })?;

        let dest = "/usr/local/bin/maestro-mcp-proxy";
        let result = self
            .run(
                agent_id,
                &["sh".into(), "-c".into(), format!("cat > {dest} && chmod +x {dest}")],
                RunOptions { stdin: Some(bytes), ..Default::default() },
            )
            .await
            .map_err(|e| ExecutorError::ProxyInstallFailed { agent_id: agent_id.clone(), reason: e.to_string() })?;
        if result.exit_code != 0 {
            return Err(ExecutorError::ProxyInstallFailed {
                agent_id: agent_id.clone(),
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }

        let config_json = serde_json::json!({
            "mcpServers": {
                "maestro": {
                    "command": dest,
                    "args": [],
                    "env": { "MCP_AUTH_TOKEN": auth_token, "MCP_HOST_ADDR": mcp_addr },
                }
            }
        });
        let write_config = format!("cat > /tmp/mcp-config.json && echo wrote");
        self.run(
            agent_id,
            &["sh".into(), "-c".into(), write_config],
            RunOptions { stdin: Some(config_json.to_string().into_bytes()), ..Default::default() },
        )
        .await
        .map_err(|e| ExecutorError::ProxyInstallFailed { agent_id: agent_id.clone(), reason: e.to_string() })?;

        let _ = record;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(agent_id = %agent_id))]
    async fn stop_container(&self, agent_id: &AgentId) -> Result<(), ExecutorError> {
        let Some(record) = self.registry.remove(agent_id) else {
            return Ok(());
        };
        let _ = self.runtime.run(&["stop", &record.container_name]).await;
        let _ = self.runtime.run(&["rm", "-f", &record.container_name]).await;
        tracing::info!(%agent_id, "container stopped");
        Ok(())
    }
}

impl<P> DockerContainerExecutor<P> {
    fn runtime_binary(&self) -> &'static str {
        match self.runtime {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }

    fn runtime_binary_name(&self) -> &'static str {
        self.runtime_binary()
    }
}

fn generate_auth_token() -> String {
    // 32 bytes of hex per §6 ("32-byte hex token"): two v4 UUIDs (16 bytes
    // each) concatenated in simple (no-hyphen) form.
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
