// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-core: shared data model for the maestro multi-agent orchestrator
//! runtime substrate — agent identifiers, the message envelope, the
//! per-agent state blob, rate-limit counters, container configuration, and
//! the small set of cross-cutting abstractions (ids, clock, macros) every
//! other `maestro-*` crate builds on.

pub mod macros;

pub mod agent;
pub mod clock;
pub mod container;
pub mod id;
pub mod message;
pub mod rate_limit;
pub mod state_blob;

pub use agent::{AgentId, AgentType, InvalidAgentId, Signal, TerminalState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use container::{ContainerConfig, ResourceLimits, RoMount, TmpfsMounts};
pub use message::{
    ApprovalRequestPayload, ErrorPayload, InvalidMessage, Message, MessageId, MessageKind, MessagePayload,
    QuestionPayload, QuestionRequestPayload, QuestionResponsePayload, RequeuePayload, ResponsePayload, ShutdownPayload,
    SpecPayload, StoryPayload,
};
pub use rate_limit::{ModelCounters, RateLimitConfig};
pub use state_blob::AgentStateBlob;
