// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-agent FSM host (§4.2): drives one agent's lifecycle to
//! completion, one message at a time.
//!
//! **Rust representation note (this port).** The transition function is a
//! trait object, `Arc<dyn Transition>`, generalizing the reference
//! codebase's adapter-trait pattern for agent behavior. Its signature takes
//! owned `current_state`/`state_data`/`message` rather than borrowed ones,
//! because panic-catching here goes through `tokio::task::spawn` +
//! `JoinError::is_panic()` (the workspace has no `futures` dependency, so
//! `futures::FutureExt::catch_unwind` is not available) and a spawned task
//! must own everything it captures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use maestro_core::{
    AgentId, AgentStateBlob, Clock, Message, MessageKind, MessagePayload, QuestionPayload, ResponsePayload,
    TerminalState,
};
use maestro_storage::StateStore;

use crate::dispatcher::Dispatcher;
use crate::error::{DriverError, TransitionError};

/// The well-known `current_state` tags the driver itself understands. Every
/// other state string is agent-specific and opaque to the driver.
pub const STATE_DONE: &str = "DONE";
pub const STATE_ERROR: &str = "ERROR";

/// Collaborators a transition function may use to act on the world
/// (container exec, LLM runner) without the driver hard-coding either.
/// Left as a marker/extension point: concrete tool access (running the LLM,
/// shelling into the container) is supplied by the agent-specific
/// transition implementations, which are out of scope here (§1 Non-goals —
/// "agent-specific behavior... is out of scope").
pub trait ToolAccess: Send + Sync {}

/// A no-op `ToolAccess` for transition functions that need no collaborators
/// (e.g. tests, or a transition that only inspects `state_data`).
pub struct NoTools;
impl ToolAccess for NoTools {}

/// What a transition step produced (§4.2 step 2).
#[derive(Debug, Clone, Default)]
pub struct TransitionOutcome {
    pub next_state: String,
    pub state_data: HashMap<String, String>,
    /// A sidebar question to forward to the architect, if the transition
    /// needs one answered before it can continue.
    pub pending: Option<QuestionPayload>,
    /// Set when `next_state` is one of the two terminal tags.
    pub terminal: Option<TerminalState>,
    /// Free-form key/values folded into the auto-synthesized RESPONSE
    /// message's `data` when a terminal state is reached.
    pub response_data: HashMap<String, String>,
    pub context_summary: Option<String>,
    pub session_id: Option<String>,
}

impl TransitionOutcome {
    pub fn new(next_state: impl Into<String>, state_data: HashMap<String, String>) -> Self {
        Self { next_state: next_state.into(), state_data, ..Default::default() }
    }
}

/// The agent-type-specific state graph (§4.2: "provided by the agent type
/// and is the only entity that knows the state graph").
#[async_trait]
pub trait Transition: Send + Sync {
    async fn step(
        &self,
        current_state: String,
        state_data: HashMap<String, String>,
        message: Message,
        tools: Arc<dyn ToolAccess>,
    ) -> Result<TransitionOutcome, TransitionError>;
}

/// Retry/backoff tuning for a transition that returns a transient error
/// (§4.2 "Failure semantics").
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retry_attempts: u32,
    pub initial_backoff: Duration,
    pub retry_backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retry_attempts: 3, initial_backoff: Duration::from_millis(200), retry_backoff_multiplier: 2.0 }
    }
}

/// Runs one agent's lifecycle to completion (§4.2).
pub struct AgentDriver<C: Clock> {
    agent_id: AgentId,
    transition: Arc<dyn Transition>,
    tools: Arc<dyn ToolAccess>,
    state_store: Arc<dyn StateStore>,
    dispatcher: Arc<Dispatcher<C>>,
    clock: C,
    retry: RetryPolicy,
    current: AgentStateBlob,
    /// Message id of an outstanding sidebar question, if any (§4.2 step 3:
    /// "MUST refuse further progress until the reply arrives").
    pending_question: Option<maestro_core::MessageId>,
}

impl<C: Clock + 'static> AgentDriver<C> {
    pub fn new(
        agent_id: AgentId,
        start_state: impl Into<String>,
        transition: Arc<dyn Transition>,
        tools: Arc<dyn ToolAccess>,
        state_store: Arc<dyn StateStore>,
        dispatcher: Arc<Dispatcher<C>>,
        clock: C,
        retry: RetryPolicy,
    ) -> Result<Self, DriverError> {
        let current = match state_store.get(&agent_id)? {
            Some(blob) => blob,
            None => {
                let now_ms = clock.epoch_ms();
                let blob = AgentStateBlob::new(agent_id.clone(), start_state, now_ms);
                state_store.put(&blob)?;
                blob
            }
        };
        Ok(Self { agent_id, transition, tools, state_store, dispatcher, clock, retry, current, pending_question: None })
    }

    pub fn current_state(&self) -> &str {
        &self.current.current_state
    }

    /// Handle one inbound message (§4.2 "Input contract").
    pub async fn process_message(&mut self, msg: Message) -> Result<Option<Message>, DriverError> {
        match msg.kind() {
            MessageKind::Shutdown => self.handle_shutdown(msg).await,
            MessageKind::Request => self.handle_reply(msg).await,
            MessageKind::Story | MessageKind::Spec | MessageKind::Question | MessageKind::Requeue => {
                self.drive(msg).await
            }
            other => Err(DriverError::UnsupportedMessageKind { agent_id: self.agent_id.clone(), kind: other }),
        }
    }

    async fn handle_shutdown(&mut self, msg: Message) -> Result<Option<Message>, DriverError> {
        let mut data = HashMap::new();
        data.insert("final_state".to_string(), self.current.current_state.clone());
        let payload = MessagePayload::Response(ResponsePayload { status: "shutdown_acknowledged".to_string(), data });
        let reply = msg.reply(self.agent_id.clone(), self.clock.epoch_ms(), payload)?;
        Ok(Some(reply))
    }

    async fn handle_reply(&mut self, msg: Message) -> Result<Option<Message>, DriverError> {
        if self.pending_question.is_none() {
            return Err(DriverError::UnsupportedMessageKind { agent_id: self.agent_id.clone(), kind: MessageKind::Request });
        }
        self.pending_question = None;
        self.drive(msg).await
    }

    async fn drive(&mut self, msg: Message) -> Result<Option<Message>, DriverError> {
        if let Some(pending_id) = self.pending_question {
            tracing::debug!(agent_id = %self.agent_id, pending_message_id = %pending_id, "refusing progress: sidebar reply outstanding");
            return Err(DriverError::PendingReplyOutstanding { agent_id: self.agent_id.clone() });
        }

        let outcome = match self.run_transition_with_retry(msg.clone()).await {
            Ok(outcome) => outcome,
            // Fatal-to-agent (§7): exhausting the retry budget or a caught
            // panic does not bubble up as a process_message error — it
            // terminates this agent's lifecycle at ERROR, same as a
            // transition that returns `terminal: Some(Error)` itself.
            Err(err @ (DriverError::MaxRetriesExceeded { .. } | DriverError::TransitionPanicked { .. })) => {
                return self.enter_error(msg, err).await;
            }
            Err(err) => return Err(err),
        };

        self.current = self.current.advance(outcome.next_state.clone(), outcome.state_data.clone(), self.clock.epoch_ms());
        if let Some(summary) = &outcome.context_summary {
            self.current = self.current.clone().context_summary(summary.clone());
        }
        if let Some(session_id) = &outcome.session_id {
            self.current = self.current.clone().session_id(session_id.clone());
        }
        self.state_store.put(&self.current)?;

        if let Some(pending) = outcome.pending {
            let question_msg = self.send_question(pending).await?;
            self.pending_question = Some(question_msg.id);
            return Ok(Some(question_msg));
        }

        if let Some(terminal) = outcome.terminal {
            self.dispatcher.publish_terminal(self.agent_id.clone(), terminal, outcome.response_data.clone());
            let status = match terminal {
                TerminalState::Done => "completed",
                TerminalState::Error => "failed",
            };
            let payload = MessagePayload::Response(ResponsePayload { status: status.to_string(), data: outcome.response_data });
            let reply = msg.reply(self.agent_id.clone(), self.clock.epoch_ms(), payload)?;
            return Ok(Some(reply));
        }

        Ok(None)
    }

    /// Fatal-to-agent path (§7): force the current state to ERROR, persist
    /// it, publish the terminal notification, and reply to whatever
    /// triggered this step with a `failed` RESPONSE — the same shape a
    /// transition-reported `terminal: Some(Error)` would produce, so the
    /// supervisor's restart-policy matrix cannot tell the two apart.
    async fn enter_error(&mut self, msg: Message, err: DriverError) -> Result<Option<Message>, DriverError> {
        tracing::error!(agent_id = %self.agent_id, error = %err, "transition failed fatally, entering ERROR");

        let mut response_data = HashMap::new();
        response_data.insert("error".to_string(), err.to_string());
        if let MessagePayload::Story(story) = &msg.payload {
            response_data.insert("story_id".to_string(), story.story_id.clone());
        }

        self.current = self.current.advance(STATE_ERROR.to_string(), self.current.state_data.clone(), self.clock.epoch_ms());
        self.state_store.put(&self.current)?;

        self.dispatcher.publish_terminal(self.agent_id.clone(), TerminalState::Error, response_data.clone());

        let payload = MessagePayload::Response(ResponsePayload { status: "failed".to_string(), data: response_data });
        let reply = msg.reply(self.agent_id.clone(), self.clock.epoch_ms(), payload)?;
        Ok(Some(reply))
    }

    async fn send_question(&self, pending: QuestionPayload) -> Result<Message, DriverError> {
        let architect = AgentId::new(maestro_core::AgentType::Architect, "0");
        let msg = Message::new(self.agent_id.clone(), architect, self.clock.epoch_ms(), MessagePayload::Question(pending))?;
        self.dispatcher.dispatch_message(msg.clone(), 0.0).await?;
        Ok(msg)
    }

    /// Invoke the transition function, retrying transient failures with
    /// exponential backoff and catching panics via `tokio::spawn` +
    /// `JoinError::is_panic()` (§4.2 "Failure semantics").
    async fn run_transition_with_retry(&self, msg: Message) -> Result<TransitionOutcome, DriverError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0;
        loop {
            let transition = Arc::clone(&self.transition);
            let tools = Arc::clone(&self.tools);
            let current_state = self.current.current_state.clone();
            let state_data = self.current.state_data.clone();
            let message = msg.clone();

            let result = tokio::spawn(async move { transition.step(current_state, state_data, message, tools).await }).await;

            match result {
                Ok(Ok(outcome)) => return Ok(outcome),
                Ok(Err(transition_err)) => {
                    attempt += 1;
                    if attempt > self.retry.max_retry_attempts {
                        return Err(DriverError::MaxRetriesExceeded { attempts: attempt });
                    }
                    tracing::warn!(agent_id = %self.agent_id, attempt, error = %transition_err, "transition failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.mul_f64(self.retry.retry_backoff_multiplier);
                }
                Err(join_err) => {
                    if join_err.is_panic() {
                        return Err(DriverError::TransitionPanicked { info: join_err.to_string() });
                    }
                    return Err(DriverError::Transition(TransitionError::Failed(format!("transition task cancelled: {join_err}"))));
                }
            }
        }
    }

    /// Run this driver's main loop until the inbox closes, cancellation
    /// fires, or a terminal state is reached.
    pub async fn run(mut self, mut inbox: tokio::sync::mpsc::Receiver<Message>, cancel: tokio_util::sync::CancellationToken) {
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = inbox.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            match self.process_message(msg).await {
                Ok(Some(reply)) => {
                    if let Err(err) = self.dispatcher.dispatch_message(reply, 0.0).await {
                        tracing::warn!(agent_id = %self.agent_id, error = %err, "failed to dispatch driver reply");
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::error!(agent_id = %self.agent_id, error = %err, "driver failed to process message"),
            }
            if self.current.current_state == STATE_DONE || self.current.current_state == STATE_ERROR {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
