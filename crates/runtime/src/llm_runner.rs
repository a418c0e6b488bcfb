// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execute the LLM CLI as a subprocess inside an agent's container,
//! monitor progress, enforce timeouts, and extract the outcome signal
//! (§4.5).
//!
//! **Runner internals (this port).** Built directly on the container
//! executor's `Run`-style subprocess spawn idiom (piped stdout/stderr),
//! generalizing the reference codebase's local-agent-spawn pattern (an
//! env-default table applied only when unset, a detached "reaper" task
//! logging the exit outcome) but replacing its HTTP-health-endpoint
//! readiness poll with line-by-line `stream-json` parsing. The process
//! source is an injected trait ([`LlmProcessSource`]) so tests can supply a
//! fake subprocess — including one that never produces a line, to exercise
//! the inactivity monitor without a real CLI or container.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use maestro_core::Signal;
use maestro_executor::ContainerRuntime;

use crate::error::LlmRunnerError;

/// Everything the runner needs to build the CLI invocation (§4.5
/// "Invocation").
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub container_name: String,
    pub model: String,
    pub mcp_config_path: String,
    /// `Some(session_id)` to resume a prior conversation; `None` mints a
    /// fresh session id and stores it on the result for the caller to
    /// persist in the agent's state blob (§4.2 "Session resume").
    pub resume_session_id: Option<String>,
    pub append_system_prompt: String,
    pub user_input: String,
    pub total_timeout: Duration,
    pub inactivity_timeout: Duration,
}

impl LlmInvocation {
    pub fn new(container_name: impl Into<String>, model: impl Into<String>, mcp_config_path: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            model: model.into(),
            mcp_config_path: mcp_config_path.into(),
            resume_session_id: None,
            append_system_prompt: String::new(),
            user_input: user_input.into(),
            total_timeout: Duration::from_secs(600),
            inactivity_timeout: Duration::from_secs(60),
        }
    }

    /// The argv for the LLM CLI itself (without the `docker/podman exec`
    /// prefix), per §4.5 "Invocation". The user input is always last, after
    /// `--`, to avoid flag-parsing collisions.
    pub fn cli_args(&self, session_id: &str) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format=stream-json".to_string(),
            "--verbose".to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--dangerously-skip-permissions".to_string(),
            "--mcp-config".to_string(),
            self.mcp_config_path.clone(),
        ];
        match &self.resume_session_id {
            Some(resume_id) => {
                args.push("--resume".to_string());
                args.push(resume_id.clone());
            }
            None => {
                args.push("--session-id".to_string());
                args.push(session_id.to_string());
                if !self.append_system_prompt.is_empty() {
                    args.push("--append-system-prompt".to_string());
                    args.push(self.append_system_prompt.clone());
                }
            }
        }
        args.push("--".to_string());
        args.push(self.user_input.clone());
        args
    }
}

/// One line of the subprocess's stdout, or its termination.
#[async_trait]
pub trait LlmProcess: Send {
    /// Read the next `stream-json` line, or `Ok(None)` on EOF.
    async fn next_line(&mut self) -> Result<Option<String>, LlmRunnerError>;

    /// Forcibly terminate the subprocess (§4.5 "an active interrupt").
    async fn kill(&mut self);
}

/// Spawns the LLM CLI subprocess for a given invocation (§4.5 "this port").
/// Implemented by `ContainerExecLlmProcessSource` against a real container
/// executor; tests supply fakes, including one that never emits a line.
pub trait LlmProcessSource: Send + Sync {
    fn spawn(&self, invocation: &LlmInvocation, session_id: &str) -> Result<Box<dyn LlmProcess>, LlmRunnerError>;
}

/// The outcome of one LLM run (§4.5 "Result contract"). Exactly one of
/// `plan`/`summary`/`question`/`error` is populated, matching `signal`.
#[derive(Debug, Clone)]
pub struct LlmResult {
    pub signal: Signal,
    pub plan: Option<String>,
    pub summary: Option<String>,
    pub question: Option<String>,
    pub error: Option<String>,
    pub response_count: u32,
    pub duration: Duration,
    pub session_id: String,
}

impl LlmResult {
    /// A bare result carrying just a signal, with every other field at its
    /// zero value — used as the base for `..` struct-update syntax.
    fn bare(signal: Signal) -> Self {
        Self { signal, plan: None, summary: None, question: None, error: None, response_count: 0, duration: Duration::ZERO, session_id: String::new() }
    }
}

/// Runs the LLM CLI to completion (or timeout/cancellation) and extracts
/// the terminal signal (§4.5).
pub struct LlmRunner {
    source: Box<dyn LlmProcessSource>,
}

impl LlmRunner {
    pub fn new(source: Box<dyn LlmProcessSource>) -> Self {
        Self { source }
    }

    pub async fn run(&self, invocation: LlmInvocation, cancel: CancellationToken) -> Result<LlmResult, LlmRunnerError> {
        let session_id = invocation.resume_session_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.run_until_exit(&invocation, &session_id, cancel).await
    }

    /// Reads events until EOF, total timeout, inactivity timeout, or
    /// cancellation — whichever comes first. The total-timeout deadline is
    /// a `tokio::time::sleep` raced inside the same `select!` as the other
    /// two signals (rather than an outer `tokio::time::timeout` wrapping
    /// the whole call), so every exit path can `process.kill().await`
    /// before returning instead of relying on drop to clean up the
    /// subprocess (§4.5 "an active interrupt, not a post-hoc flag").
    async fn run_until_exit(&self, invocation: &LlmInvocation, session_id: &str, cancel: CancellationToken) -> Result<LlmResult, LlmRunnerError> {
        let started = Instant::now();
        let mut process = self.source.spawn(invocation, session_id)?;
        let mut events: Vec<Value> = Vec::new();
        let mut response_count = 0u32;

        let total_deadline = tokio::time::Instant::now() + invocation.total_timeout;

        loop {
            let inactivity = tokio::time::sleep(invocation.inactivity_timeout);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    process.kill().await;
                    return Ok(LlmResult { session_id: session_id.to_string(), response_count, duration: started.elapsed(), ..LlmResult::bare(Signal::Timeout) });
                }
                _ = tokio::time::sleep_until(total_deadline) => {
                    process.kill().await;
                    return Ok(LlmResult { session_id: session_id.to_string(), response_count, duration: started.elapsed(), ..LlmResult::bare(Signal::Timeout) });
                }
                _ = inactivity => {
                    process.kill().await;
                    return Ok(LlmResult { session_id: session_id.to_string(), response_count, duration: started.elapsed(), ..LlmResult::bare(Signal::Inactivity) });
                }
                line = process.next_line() => {
                    match line? {
                        Some(line) => {
                            if let Ok(event) = serde_json::from_str::<Value>(&line) {
                                if event.get("type").and_then(Value::as_str) == Some("assistant") {
                                    response_count += 1;
                                }
                                events.push(event);
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let mut result = extract_signal(&events);
        result.session_id = session_id.to_string();
        result.response_count = response_count;
        result.duration = started.elapsed();
        Ok(result)
    }
}

/// Scan accumulated stream-json events for the first `maestro_*` signal
/// tool call (§4.5 "Signal detection").
fn extract_signal(events: &[Value]) -> LlmResult {
    for event in events {
        let Some(tool_use) = find_tool_use(event) else { continue };
        let Some(name) = tool_use.get("name").and_then(Value::as_str) else { continue };
        let Some(signal) = Signal::from_tool_name(name) else { continue };
        let text = tool_input_text(tool_use);
        return match signal {
            Signal::PlanComplete => LlmResult { plan: Some(text), ..LlmResult::bare(signal) },
            Signal::Done | Signal::StoryComplete => LlmResult { summary: Some(text), ..LlmResult::bare(signal) },
            Signal::Question => LlmResult { question: Some(text), ..LlmResult::bare(signal) },
            Signal::Error => LlmResult { error: Some(text), ..LlmResult::bare(signal) },
            Signal::Timeout | Signal::Inactivity => LlmResult::bare(signal),
        };
    }

    for event in events {
        if event.get("type").and_then(Value::as_str) == Some("error") {
            let message = event.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string();
            return LlmResult { error: Some(message), ..LlmResult::bare(Signal::Error) };
        }
    }

    LlmResult { error: Some("completed without calling a signal tool".to_string()), ..LlmResult::bare(Signal::Error) }
}

fn find_tool_use(event: &Value) -> Option<&Value> {
    if event.get("type").and_then(Value::as_str) == Some("tool_use") {
        return Some(event);
    }
    event.get("message")?.get("content")?.as_array()?.iter().find(|c| c.get("type").and_then(Value::as_str) == Some("tool_use"))
}

fn tool_input_text(tool_use: &Value) -> String {
    let input = tool_use.get("input").unwrap_or(&Value::Null);
    for key in ["text", "summary", "plan", "question", "message", "error"] {
        if let Some(s) = input.get(key).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    input.to_string()
}

/// Spawns the LLM CLI by shelling directly into `docker/podman exec`
/// (§4.5 "this port"). Cannot go through `ContainerExecutor::run`, whose
/// wait-for-completion semantics are incompatible with line-by-line
/// `stream-json` parsing and the inactivity monitor; uses
/// [`ContainerRuntime::binary_name`] to stay on whichever runtime the
/// executor resolved at startup.
pub struct ContainerExecLlmProcessSource {
    runtime: ContainerRuntime,
    /// The LLM CLI's binary name as installed inside the agent container.
    cli_binary: String,
    /// Environment passed to every invocation (MCP auth token, host addr).
    env: Vec<(String, String)>,
}

impl ContainerExecLlmProcessSource {
    pub fn new(runtime: ContainerRuntime, cli_binary: impl Into<String>, env: Vec<(String, String)>) -> Self {
        Self { runtime, cli_binary: cli_binary.into(), env }
    }
}

impl LlmProcessSource for ContainerExecLlmProcessSource {
    fn spawn(&self, invocation: &LlmInvocation, session_id: &str) -> Result<Box<dyn LlmProcess>, LlmRunnerError> {
        let mut args: Vec<String> =
            vec!["exec".into(), "-i".into(), "--user".into(), "1000:1000".into(), "-w".into(), "/workspace".into()];
        for (k, v) in &self.env {
            args.push("-e".into());
            args.push(format!("{k}={v}"));
        }
        args.push(invocation.container_name.clone());
        args.push(self.cli_binary.clone());
        args.extend(invocation.cli_args(session_id));

        let mut child = Command::new(self.runtime.binary_name())
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(LlmRunnerError::Spawn)?;

        let stdout = child.stdout.take().ok_or(LlmRunnerError::StdoutNotPiped)?;
        let lines = BufReader::new(stdout).lines();
        Ok(Box::new(ContainerLlmProcess { child, lines }))
    }
}

struct ContainerLlmProcess {
    child: Child,
    lines: tokio::io::Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl LlmProcess for ContainerLlmProcess {
    async fn next_line(&mut self) -> Result<Option<String>, LlmRunnerError> {
        self.lines.next_line().await.map_err(LlmRunnerError::Io)
    }

    async fn kill(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

#[cfg(test)]
#[path = "llm_runner_tests.rs"]
mod tests;
