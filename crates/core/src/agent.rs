// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identifiers and the small set of enums shared by every crate that
//! talks about "an agent": its type, its terminal states, and the signal
//! vocabulary a transition function or LLM runner reports.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The role an agent plays in the orchestration.
///
/// Drives the restart-policy matrix (see `maestro_runtime::supervisor`) and
/// the container-mount layout (architect gets read-only binds of coder
/// workspaces; coders and the PM do not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Architect,
    Coder,
    Pm,
    /// Not a driven agent — used only as the `from` of messages the
    /// supervisor itself originates (e.g. REQUEUE, §4.1), never attached to
    /// the dispatcher registry or constructed by the agent factory.
    Supervisor,
}

crate::simple_display! {
    AgentType {
        Architect => "architect",
        Coder => "coder",
        Pm => "pm",
        Supervisor => "supervisor",
    }
}

impl AgentType {
    /// Parse the type segment of an `AgentId` (`"coder"`, `"architect"`, `"pm"`, `"supervisor"`).
    pub fn parse(s: &str) -> Result<Self, InvalidAgentId> {
        match s {
            "architect" => Ok(AgentType::Architect),
            "coder" => Ok(AgentType::Coder),
            "pm" => Ok(AgentType::Pm),
            "supervisor" => Ok(AgentType::Supervisor),
            other => Err(InvalidAgentId(other.to_string())),
        }
    }

    /// Whether this type names a real, driven agent attachable to the
    /// dispatcher (as opposed to the `Supervisor` sentinel).
    pub fn is_driven_agent(self) -> bool {
        !matches!(self, AgentType::Supervisor)
    }
}

/// Unique identifier for an agent, always of the form `type:instance`
/// (e.g. `coder:001`, `architect:main`).
///
/// The format is validated at construction so every consumer can rely on
/// `agent_type()`/`instance()` without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId {
    agent_type: AgentType,
    instance: String,
    rendered: String,
}

impl AgentId {
    pub fn new(agent_type: AgentType, instance: impl Into<String>) -> Self {
        let instance = instance.into();
        let rendered = format!("{}:{}", agent_type, instance);
        Self { agent_type, instance, rendered }
    }

    /// Parse from the canonical `type:instance` string form.
    pub fn parse(s: &str) -> Result<Self, InvalidAgentId> {
        let (ty, instance) = s.split_once(':').ok_or_else(|| InvalidAgentId(s.to_string()))?;
        if instance.is_empty() {
            return Err(InvalidAgentId(s.to_string()));
        }
        Ok(Self::new(AgentType::parse(ty)?, instance))
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// The sentinel id used as `from` on supervisor-originated messages
    /// (REQUEUE, SHUTDOWN broadcasts).
    pub fn supervisor() -> Self {
        Self::new(AgentType::Supervisor, "0")
    }
}

impl TryFrom<String> for AgentId {
    type Error = InvalidAgentId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        AgentId::parse(&s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.rendered
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.rendered == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.rendered == *other
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.rendered
    }
}

/// Agent id did not match the required `type:instance` format.
#[derive(Debug, Clone)]
pub struct InvalidAgentId(pub String);

impl fmt::Display for InvalidAgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid agent id: {:?} (expected \"type:instance\")", self.0)
    }
}

impl std::error::Error for InvalidAgentId {}

/// The two terminal states a driver can reach. Everything else is an
/// agent-specific, opaque state-graph tag (`current_state` in the state
/// blob) that only the transition function understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Done,
    Error,
}

crate::simple_display! {
    TerminalState {
        Done => "done",
        Error => "error",
    }
}

/// Outcome signal produced by scanning an LLM run's event stream for the
/// first `maestro_*` signal tool call (§4.5). `Timeout`/`Inactivity` are
/// produced by the runner itself rather than observed in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    PlanComplete,
    Done,
    Question,
    StoryComplete,
    Error,
    Timeout,
    Inactivity,
}

impl Signal {
    /// Map a `maestro_*` tool name to its signal, if it is a recognized
    /// signal tool. Non-signal tool names (ordinary file/shell tools)
    /// return `None`.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "maestro_submit_plan" => Some(Signal::PlanComplete),
            "maestro_done" => Some(Signal::Done),
            "maestro_question" => Some(Signal::Question),
            "maestro_story_complete" => Some(Signal::StoryComplete),
            "maestro_error" => Some(Signal::Error),
            _ => None,
        }
    }

    /// Whether this signal corresponds to a driver terminal state.
    pub fn terminal_state(self) -> Option<TerminalState> {
        match self {
            Signal::Done | Signal::StoryComplete => Some(TerminalState::Done),
            Signal::Error | Signal::Timeout | Signal::Inactivity => Some(TerminalState::Error),
            Signal::PlanComplete | Signal::Question => None,
        }
    }
}

crate::simple_display! {
    Signal {
        PlanComplete => "plan_complete",
        Done => "done",
        Question => "question",
        StoryComplete => "story_complete",
        Error => "error",
        Timeout => "timeout",
        Inactivity => "inactivity",
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
