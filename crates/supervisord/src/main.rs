// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `maestrod`: the supervisor binary that wires the `maestro-*` runtime
//! substrate together (§2 "Data/control flow", §6 "Supervisor binary CLI
//! surface").
//!
//! Two subcommands, mirroring the reference daemon's CLI-and-daemon split
//! in spirit though this is a single binary (§6, this port): `bootstrap`
//! drives one spec to completion and exits; `run` stays up and accepts
//! further specs until a shutdown signal arrives. Git integration, web UI,
//! and declarative config-file parsing are out of scope (§1) — only the
//! env vars in `env.rs` and the CLI flags below are read.

mod env;
mod factory;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use maestro_core::{AgentId, AgentType, Message, MessagePayload, SpecPayload, SystemClock};
use maestro_executor::{ContainerRegistry, ContainerRuntime, DirMcpProxyProvider, DockerContainerExecutor};
use maestro_runtime::{Dispatcher, DispatcherConfig, RateLimiter, Supervisor};
use maestro_storage::{FileEventLog, FileStateStore};
use tokio_util::sync::CancellationToken;

use crate::factory::PlaceholderAgentFactory;

#[derive(Parser, Debug)]
#[command(name = "maestrod")]
#[command(about = "maestro — multi-agent software-development orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive one spec file to completion, then exit (§6).
    Bootstrap(SpecArgs),
    /// Stay up and accept further specs until shutdown (§6).
    Run(SpecArgs),
}

#[derive(clap::Args, Debug)]
struct SpecArgs {
    /// Path to the natural-language specification file.
    spec_file: PathBuf,
    /// Optional git repository URL the architect should commit into.
    /// Git integration itself is out of scope (§1) — this is carried
    /// through to the agent factory as a pass-through value only.
    #[arg(long)]
    repo_url: Option<String>,
    /// Number of coder agents to attach (§2 "Data/control flow").
    #[arg(long, default_value_t = 1)]
    coders: u32,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let state_dir = env::state_dir();

    let _log_guard = match logging::init(&env::daemon_log_path(&state_dir)) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging at {}: {err}", env::daemon_log_path(&state_dir).display());
            return std::process::ExitCode::FAILURE;
        }
    };

    let (args, bootstrap) = match &cli.command {
        Command::Bootstrap(args) => (args, true),
        Command::Run(args) => (args, false),
    };

    match run(args, bootstrap, &state_dir).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "maestrod exiting with error");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: &SpecArgs, bootstrap: bool, state_dir: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(spec_file = %args.spec_file.display(), repo_url = ?args.repo_url, bootstrap, "maestrod starting");

    let spec_content = tokio::fs::read_to_string(&args.spec_file).await?;

    let clock = SystemClock;
    let cancel = CancellationToken::new();

    let state_store: Arc<dyn maestro_storage::StateStore> = Arc::new(FileStateStore::open(env::agent_state_dir(state_dir))?);
    let event_log: Arc<dyn maestro_storage::EventLogSink> = Arc::new(FileEventLog::open(env::event_log_dir(state_dir))?);

    let mut dispatcher_config = DispatcherConfig::default();
    if let Some(capacity) = env::channel_capacity() {
        dispatcher_config.channel_capacity = capacity;
        dispatcher_config.inbox_capacity = capacity;
    }
    if let Some(wait) = env::rate_limit_wait() {
        dispatcher_config.rate_limit_wait = wait;
    }

    let rate_limiter = Arc::new(RateLimiter::new(clock.clone(), env::rate_limit_configs()));
    let dispatcher = Dispatcher::new(rate_limiter, event_log, clock.clone(), dispatcher_config, cancel.child_token());

    let runtime = ContainerRuntime::resolve().await?;
    let registry = ContainerRegistry::new();
    let proxy_provider = DirMcpProxyProvider::new(state_dir.join("mcp-proxy"));
    let executor: Arc<dyn maestro_executor::ContainerExecutor> = Arc::new(DockerContainerExecutor::new(runtime, registry, proxy_provider));

    let factory = Arc::new(PlaceholderAgentFactory::new(
        Arc::clone(&dispatcher),
        Arc::clone(&state_store),
        Arc::clone(&executor),
        clock,
        env::agent_image(),
        state_dir.join("workspaces"),
    ));

    let supervisor = Supervisor::new(dispatcher.clone(), Arc::clone(&executor), factory, env::shutdown_timeout());

    let architect_id = AgentId::new(AgentType::Architect, "0");
    supervisor.attach_agent(architect_id.clone(), AgentType::Architect).await?;
    dispatcher.set_architect(architect_id.clone());

    for n in 0..args.coders {
        let coder_id = AgentId::new(AgentType::Coder, n.to_string());
        supervisor.attach_agent(coder_id, AgentType::Coder).await?;
    }

    let spec_msg = Message::new(AgentId::supervisor(), architect_id, 0, MessagePayload::Spec(SpecPayload { content: spec_content }))?;
    dispatcher.dispatch_message(spec_msg, 0.0).await?;

    if bootstrap {
        tokio::time::sleep(Duration::from_millis(200)).await;
    } else {
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown signal received");
    }

    supervisor.shutdown().await;
    cancel.cancel();
    Ok(())
}
