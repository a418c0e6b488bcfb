// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access and state-directory resolution
//! for the supervisor binary (§1 "Configuration", §6 "CLI & env").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use maestro_core::RateLimitConfig;

/// Resolve the state directory: `MAESTRO_STATE_DIR` > `XDG_STATE_HOME/maestro` >
/// `~/.local/state/maestro`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MAESTRO_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = std::env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("maestro");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".local/state/maestro")
}

/// Subdirectory holding one JSON file per agent state blob (§6 "Persisted
/// state layout").
pub fn agent_state_dir(base: &Path) -> PathBuf {
    base.join("agents")
}

/// Subdirectory holding the hourly-rotated dispatcher event log (§6 "Event
/// log").
pub fn event_log_dir(base: &Path) -> PathBuf {
    base.join("events")
}

/// Log file path for the supervisor process's own `tracing` output.
pub fn daemon_log_path(base: &Path) -> PathBuf {
    base.join("maestrod.log")
}

/// How long `Supervisor::shutdown` waits for each agent to acknowledge
/// SHUTDOWN before moving on (`MAESTRO_SHUTDOWN_TIMEOUT_MS`, default 10s).
pub fn shutdown_timeout() -> Duration {
    std::env::var("MAESTRO_SHUTDOWN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Per-dispatcher-channel mpsc capacity override (`MAESTRO_CHANNEL_CAPACITY`).
pub fn channel_capacity() -> Option<usize> {
    std::env::var("MAESTRO_CHANNEL_CAPACITY").ok().and_then(|s| s.parse::<usize>().ok())
}

/// Rate-limit wait override, how long `dispatch_message` blocks on a denial
/// before giving up (`MAESTRO_RATE_LIMIT_WAIT_MS`).
pub fn rate_limit_wait() -> Option<Duration> {
    std::env::var("MAESTRO_RATE_LIMIT_WAIT_MS").ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// The container image every agent's executor provisions
/// (`MAESTRO_AGENT_IMAGE`, default `maestro-agent:latest`).
pub fn agent_image() -> String {
    std::env::var("MAESTRO_AGENT_IMAGE").unwrap_or_else(|_| "maestro-agent:latest".to_string())
}

/// Per-model rate-limit configuration (§4.6). Model-specific provider SDKs
/// and prompt plumbing are out of scope (§1) — only the two model names
/// the placeholder factory (`factory.rs`) drives are configured here, with
/// a uniform cap overridable via `MAESTRO_MAX_TOKENS_PER_MINUTE` /
/// `MAESTRO_MAX_BUDGET_PER_DAY_USD`.
pub fn rate_limit_configs() -> HashMap<String, RateLimitConfig> {
    let max_tokens_per_minute =
        std::env::var("MAESTRO_MAX_TOKENS_PER_MINUTE").ok().and_then(|s| s.parse::<f64>().ok()).unwrap_or(60_000.0);
    let max_budget_per_day_usd =
        std::env::var("MAESTRO_MAX_BUDGET_PER_DAY_USD").ok().and_then(|s| s.parse::<f64>().ok()).unwrap_or(50.0);
    let config = RateLimitConfig::new(max_tokens_per_minute, max_budget_per_day_usd);

    let mut configs = HashMap::new();
    configs.insert("claude-opus".to_string(), config);
    configs.insert("claude-sonnet".to_string(), config);
    configs
}
