// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tracing` initialization for the supervisor binary (§1 "Logging").
//!
//! Logs go to a non-blocking file appender at `{state_dir}/maestrod.log`,
//! never to stdout — the binary's stdout is reserved for the eventual
//! `ResponsePayload{status:"shutdown_acknowledged"}` reporting in §7.
//! `RUST_LOG` controls the level filter (default `info`).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. The returned [`WorkerGuard`] must be
/// held for the lifetime of the process — dropping it early truncates the
/// non-blocking writer's pending buffer.
pub fn init(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(guard)
}
