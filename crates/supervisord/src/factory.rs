// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A placeholder `AgentFactory` (§6 "Agent factory").
//!
//! Agent-specific state graphs — the architect's plan/review loop, the
//! coder's plan/code/test loop — are external collaborators, out of scope
//! for this crate (§1 "Out of scope"). This factory provisions each
//! agent's hardened container and attaches a driver whose only transition
//! immediately reports DONE, so that the dispatcher, rate limiter,
//! container executor, and supervisor restart-policy matrix can all be
//! exercised end to end by `maestrod bootstrap`/`run` without a real
//! LLM-driven state graph plugged in. A production deployment supplies its
//! own `AgentFactory` wired to real transition functions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use maestro_core::{AgentId, AgentType, Clock, ContainerConfig, Message, MessageKind, TerminalState};
use maestro_executor::ContainerExecutor;
use maestro_runtime::{AgentDriver, AgentFactory, Dispatcher, NoTools, RetryPolicy, RunningAgent, SupervisorError, Transition, TransitionError, TransitionOutcome};
use maestro_storage::StateStore;

/// Immediately reports DONE on the first message it sees. Stands in for a
/// real agent-specific transition function.
struct ImmediateDone;

#[async_trait]
impl Transition for ImmediateDone {
    async fn step(
        &self,
        _current_state: String,
        state_data: HashMap<String, String>,
        message: Message,
        _tools: Arc<dyn maestro_runtime::ToolAccess>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut response_data = HashMap::new();
        if message.kind() == MessageKind::Story {
            if let maestro_core::MessagePayload::Story(story) = &message.payload {
                response_data.insert("story_id".to_string(), story.story_id.clone());
            }
        }
        Ok(TransitionOutcome {
            next_state: maestro_runtime::STATE_DONE.to_string(),
            state_data,
            pending: None,
            terminal: Some(TerminalState::Done),
            response_data,
            context_summary: None,
            session_id: None,
        })
    }
}

pub struct PlaceholderAgentFactory<C: Clock> {
    dispatcher: Arc<Dispatcher<C>>,
    state_store: Arc<dyn StateStore>,
    executor: Arc<dyn ContainerExecutor>,
    clock: C,
    container_image: String,
    workspace_root: std::path::PathBuf,
}

impl<C: Clock + 'static> PlaceholderAgentFactory<C> {
    pub fn new(
        dispatcher: Arc<Dispatcher<C>>,
        state_store: Arc<dyn StateStore>,
        executor: Arc<dyn ContainerExecutor>,
        clock: C,
        container_image: String,
        workspace_root: std::path::PathBuf,
    ) -> Self {
        Self { dispatcher, state_store, executor, clock, container_image, workspace_root }
    }
}

#[async_trait]
impl<C: Clock + 'static> AgentFactory for PlaceholderAgentFactory<C> {
    async fn new_agent(&self, agent_id: AgentId, agent_type: AgentType, cancel: CancellationToken) -> Result<RunningAgent, SupervisorError> {
        let workdir = self.workspace_root.join(agent_id.as_str().replace(':', "-"));
        let config = ContainerConfig::new(self.container_image.clone(), workdir);
        self.executor.start_container(&agent_id, &config).await?;

        let model = match agent_type {
            AgentType::Architect => "claude-opus",
            AgentType::Coder => "claude-sonnet",
            AgentType::Pm => "claude-sonnet",
            AgentType::Supervisor => "claude-sonnet",
        };
        let inbox = self.dispatcher.attach(agent_id.clone(), model)?;

        let driver = AgentDriver::new(
            agent_id.clone(),
            "START",
            Arc::new(ImmediateDone),
            Arc::new(NoTools),
            Arc::clone(&self.state_store),
            Arc::clone(&self.dispatcher),
            self.clock.clone(),
            RetryPolicy::default(),
        )
        .map_err(|err| SupervisorError::Factory { agent_id: agent_id.clone(), reason: err.to_string() })?;

        let join = tokio::spawn(driver.run(inbox, cancel.clone()));
        Ok(RunningAgent { cancel, join })
    }
}
