// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-runtime: the orchestration substrate that sits between the
//! typed data model (`maestro-core`) and the supervisor binary — the
//! message dispatcher (§4.1), the per-agent FSM host (§4.2), the LLM
//! subprocess runner (§4.5), the token/budget rate limiter (§4.6), and
//! agent-lifecycle ownership with the fixed restart-policy matrix (§4.7).
//! Agent-specific state graphs and the agent factory that builds them are
//! out of scope for this crate (§1); see `maestro-supervisord` for the
//! binary that wires a concrete factory in.

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod llm_runner;
pub mod rate_limiter;
pub mod supervisor;

pub use dispatcher::{estimate_tokens, Dispatcher, DispatcherConfig, TerminalNotification};
pub use driver::{AgentDriver, NoTools, RetryPolicy, ToolAccess, Transition, TransitionOutcome, STATE_DONE, STATE_ERROR};
pub use error::{DispatchError, DriverError, LlmRunnerError, RateLimitError, SupervisorError, TransitionError};
pub use llm_runner::{ContainerExecLlmProcessSource, LlmInvocation, LlmProcess, LlmProcessSource, LlmResult, LlmRunner};
pub use rate_limiter::{RateLimiter, ReserveOutcome};
pub use supervisor::{restart_action, AgentFactory, RestartAction, RunningAgent, Supervisor};
