// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-executor: the container executor (§4.3) — one long-running,
//! hardened container per agent, with a `run` operation for one-shot execs
//! and the MCP proxy installation step.

pub mod error;
pub mod executor;
pub mod mount_probe;
pub mod proxy;
pub mod registry;
pub mod runtime_cli;

pub use error::ExecutorError;
pub use executor::{ContainerExecutor, DockerContainerExecutor, RunOptions, RunResult};
pub use proxy::{DirMcpProxyProvider, McpProxyProvider};
pub use registry::{container_name_for, ContainerRecord, ContainerRegistry};
pub use runtime_cli::ContainerRuntime;

#[cfg(any(test, feature = "test-support"))]
pub use proxy::FakeMcpProxyProvider;
