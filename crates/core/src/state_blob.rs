// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-agent state blob (§3.2), the single unit the state store
//! persists and the driver mutates exclusively during a transition.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A driver-owned record of one agent's progress through its state graph.
///
/// `current_state` is an opaque tag understood only by the agent-specific
/// transition function (architect/coder/PM state graphs are out of scope,
/// §1). `state_data` is the free-form working memory the transition
/// function reads and writes on each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStateBlob {
    pub agent_id: AgentId,
    pub current_state: String,
    #[serde(default)]
    pub state_data: HashMap<String, String>,
    #[serde(default)]
    pub context_summary: String,
    /// LLM session id to resume, if any (set on first non-resuming run).
    #[serde(default)]
    pub session_id: Option<String>,
    pub updated_at_ms: u64,
}

impl AgentStateBlob {
    /// A freshly-initialized blob for an agent that has not yet run a
    /// transition (`current_state` is the agent type's start-state tag,
    /// supplied by the agent factory).
    pub fn new(agent_id: AgentId, start_state: impl Into<String>, updated_at_ms: u64) -> Self {
        Self {
            agent_id,
            current_state: start_state.into(),
            state_data: HashMap::new(),
            context_summary: String::new(),
            session_id: None,
            updated_at_ms,
        }
    }

    crate::setters! {
        into { context_summary: String }
        option { session_id: String }
    }

    /// Apply the result of a successful transition, producing the blob to
    /// persist (§4.2 step 4 — "persist the new state blob atomically").
    pub fn advance(&self, next_state: impl Into<String>, state_data: HashMap<String, String>, updated_at_ms: u64) -> Self {
        Self { current_state: next_state.into(), state_data, updated_at_ms, ..self.clone() }
    }
}

#[cfg(test)]
#[path = "state_blob_tests.rs"]
mod tests;
