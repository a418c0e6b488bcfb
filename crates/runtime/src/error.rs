// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-component error types for the runtime substrate (§7: "each crate
//! defines its own `thiserror` enum at its public boundary").

use maestro_core::{AgentId, InvalidMessage, MessageKind};
use maestro_storage::StateStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit denied for model {model:?}, retry after {retry_after_ms}ms")]
    Denied { model: String, retry_after_ms: u64 },

    #[error("no rate limit configuration registered for model {0:?}")]
    UnknownModel(String),

    #[error("rate limiter has been closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no agent attached with id {0}")]
    NoSuchRecipient(AgentId),

    #[error("agent {0} is already attached")]
    AlreadyAttached(AgentId),

    #[error("rate limit denied: {0}")]
    RateLimitDenied(#[from] RateLimitError),

    #[error("backpressure timeout delivering to {recipient} on the {channel} channel")]
    BackpressureTimeout { recipient: AgentId, channel: &'static str },

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] InvalidMessage),

    #[error("dispatcher is shutting down")]
    Closed,
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("agent {agent_id} does not support message kind {kind}")]
    UnsupportedMessageKind { agent_id: AgentId, kind: MessageKind },

    #[error("agent {agent_id} has an outstanding sidebar reply pending; refusing further progress")]
    PendingReplyOutstanding { agent_id: AgentId },

    #[error("transition failed: {0}")]
    Transition(#[from] TransitionError),

    #[error("transition exceeded {attempts} retry attempts")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("transition panicked: {info}")]
    TransitionPanicked { info: String },

    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] InvalidMessage),
}

#[derive(Debug, Error)]
pub enum LlmRunnerError {
    #[error("failed to spawn LLM subprocess: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("LLM subprocess stdout was not piped at spawn")]
    StdoutNotPiped,

    #[error("i/o error reading LLM subprocess output: {0}")]
    Io(#[source] std::io::Error),

    #[error("LLM subprocess run was cancelled before producing a signal")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("executor error: {0}")]
    Executor(#[from] maestro_executor::ExecutorError),

    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("agent factory failed to build agent {agent_id}: {reason}")]
    Factory { agent_id: AgentId, reason: String },

    #[error("shutdown deadline elapsed waiting for agent {0} to acknowledge")]
    ShutdownTimeout(AgentId),
}
