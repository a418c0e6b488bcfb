// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed, rate-limited message bus (§4.1).
//!
//! **Dispatcher internals (this port).** Each logical channel is a bounded
//! `tokio::sync::mpsc` channel; one pump task per channel reads from it and
//! fans out into the recipient's per-agent inbox (also a bounded `mpsc`),
//! so channel FIFO order is preserved into delivery order at the inbox.
//! `Attach`/`Detach` mutate a `parking_lot::Mutex<HashMap<AgentId,
//! AgentHandle>>` registry; the registry, not the channels, is the single
//! source of truth for "is this agent attached". `SubscribeTerminal` is a
//! `tokio::sync::broadcast` channel. Every dispatch and every delivery
//! clones the message onto an injected `Arc<dyn EventLogSink>` with a
//! `sent`/`delivered`/`dropped` direction tag (§6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use maestro_core::{AgentId, Clock, Message, MessageKind, MessagePayload, TerminalState};
use maestro_storage::{EventDirection, EventLogSink};

use crate::error::DispatchError;
use crate::rate_limiter::{RateLimiter, ReserveOutcome};

/// Which of the four logical channels (§4.1 "Topology") a message kind
/// travels on.
///
/// This mapping is an explicit implementation decision recorded in
/// DESIGN.md: the spec names the channels by purpose ("architect-to-coder
/// story assignments", "coder-to-architect sidebars"...) without
/// enumerating every `MessageKind`, so each kind is assigned to the channel
/// matching its traffic direction and pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Spec,
    Story,
    Questions,
    Reply,
}

impl Channel {
    fn name(self) -> &'static str {
        match self {
            Channel::Spec => "spec_channel",
            Channel::Story => "story_channel",
            Channel::Questions => "questions_channel",
            Channel::Reply => "reply_channel",
        }
    }

    fn for_kind(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Spec => Channel::Spec,
            MessageKind::Story | MessageKind::Response => Channel::Story,
            MessageKind::Question | MessageKind::Requeue => Channel::Questions,
            MessageKind::Request | MessageKind::Error | MessageKind::Shutdown => Channel::Reply,
        }
    }
}

struct AgentHandle {
    inbox: mpsc::Sender<Message>,
    model: String,
}

struct Registry {
    agents: Mutex<HashMap<AgentId, AgentHandle>>,
}

impl Registry {
    fn new() -> Self {
        Self { agents: Mutex::new(HashMap::new()) }
    }

    fn attach(&self, agent_id: AgentId, model: String, inbox: mpsc::Sender<Message>) -> Result<(), DispatchError> {
        let mut agents = self.agents.lock();
        if agents.contains_key(&agent_id) {
            return Err(DispatchError::AlreadyAttached(agent_id));
        }
        agents.insert(agent_id, AgentHandle { inbox, model });
        Ok(())
    }

    fn detach(&self, agent_id: &AgentId) {
        self.agents.lock().remove(agent_id);
    }

    fn model_for(&self, agent_id: &AgentId) -> Option<String> {
        self.agents.lock().get(agent_id).map(|h| h.model.clone())
    }

    fn inbox_for(&self, agent_id: &AgentId) -> Option<mpsc::Sender<Message>> {
        self.agents.lock().get(agent_id).map(|h| h.inbox.clone())
    }
}

/// Message-size heuristic used as the default token-cost estimate when a
/// caller does not supply one explicitly (§4.1 "Rate-limit contract").
pub fn estimate_tokens(payload: &MessagePayload) -> f64 {
    let bytes = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0);
    // ~4 bytes/token is the usual rough heuristic for English/code text.
    (bytes as f64 / 4.0).max(1.0)
}

/// Tuning knobs for dispatch behavior (§4.1, §5).
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub channel_capacity: usize,
    pub inbox_capacity: usize,
    /// How long `dispatch_message` blocks on a rate-limit denial before
    /// giving up and returning `RateLimitDenied` (§4.1: "blocks up to a
    /// caller-configured deadline and retries, or returns RateLimitDenied").
    pub rate_limit_wait: Duration,
    /// How long `dispatch_message` blocks on inbox backpressure before
    /// returning `BackpressureTimeout`.
    pub backpressure_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            inbox_capacity: 64,
            rate_limit_wait: Duration::from_secs(65),
            backpressure_timeout: Duration::from_secs(30),
        }
    }
}

/// The typed, rate-limited, in-memory message bus (§4.1).
pub struct Dispatcher<C: Clock> {
    registry: Arc<Registry>,
    rate_limiter: Arc<RateLimiter<C>>,
    event_log: Arc<dyn EventLogSink>,
    clock: C,
    config: DispatcherConfig,
    architect_id: Mutex<Option<AgentId>>,

    spec_tx: mpsc::Sender<Message>,
    story_tx: mpsc::Sender<Message>,
    questions_tx: mpsc::Sender<Message>,
    reply_tx: mpsc::Sender<Message>,

    terminal_tx: broadcast::Sender<TerminalNotification>,
    cancel: CancellationToken,
}

/// Published when a driver reaches DONE/ERROR (§4.1 "SubscribeTerminal").
/// `context` carries whatever the transition put in its terminal
/// `response_data` — in particular `story_id`, which the supervisor's
/// `RestartAndRequeue` policy needs to call `send_requeue` (§4.7); the
/// notification itself is the only channel that context can travel on,
/// since `SendRequeue` is invoked from the restart loop, not from the
/// driver that observed the failure.
#[derive(Debug, Clone)]
pub struct TerminalNotification {
    pub agent_id: AgentId,
    pub state: TerminalState,
    pub context: HashMap<String, String>,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(
        rate_limiter: Arc<RateLimiter<C>>,
        event_log: Arc<dyn EventLogSink>,
        clock: C,
        config: DispatcherConfig,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let registry = Arc::new(Registry::new());
        let (spec_tx, spec_rx) = mpsc::channel(config.channel_capacity);
        let (story_tx, story_rx) = mpsc::channel(config.channel_capacity);
        let (questions_tx, questions_rx) = mpsc::channel(config.channel_capacity);
        let (reply_tx, reply_rx) = mpsc::channel(config.channel_capacity);
        let (terminal_tx, _) = broadcast::channel(256);

        let dispatcher = Arc::new(Self {
            registry,
            rate_limiter,
            event_log,
            clock,
            config,
            architect_id: Mutex::new(None),
            spec_tx,
            story_tx,
            questions_tx,
            reply_tx,
            terminal_tx,
            cancel,
        });

        dispatcher.spawn_pump(Channel::Spec, spec_rx);
        dispatcher.spawn_pump(Channel::Story, story_rx);
        dispatcher.spawn_pump(Channel::Questions, questions_rx);
        dispatcher.spawn_pump(Channel::Reply, reply_rx);

        dispatcher
    }

    /// Record which agent id is the architect, used to address
    /// supervisor-originated REQUEUE messages (§4.1 "REQUEUE protocol").
    pub fn set_architect(&self, agent_id: AgentId) {
        *self.architect_id.lock() = Some(agent_id);
    }

    fn spawn_pump(self: &Arc<Self>, channel: Channel, mut rx: mpsc::Receiver<Message>) {
        let dispatcher = Arc::clone(self);
        let cancel = dispatcher.cancel.child_token();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                dispatcher.deliver(channel, msg).await;
            }
            tracing::debug!(channel = channel.name(), "dispatcher pump stopped");
        });
    }

    async fn deliver(&self, channel: Channel, msg: Message) {
        let now_ms = self.clock.epoch_ms();
        match self.registry.inbox_for(&msg.to) {
            Some(inbox) => {
                if inbox.send(msg.clone()).await.is_ok() {
                    let _ = self.event_log.record(&msg, now_ms, EventDirection::Delivered);
                } else {
                    let _ = self.event_log.record(&msg, now_ms, EventDirection::Dropped);
                    self.return_error(msg, "recipient inbox closed").await;
                }
            }
            None => {
                tracing::warn!(channel = channel.name(), to = %msg.to, "dropping message: recipient not attached");
                let _ = self.event_log.record(&msg, now_ms, EventDirection::Dropped);
                self.return_error(msg, "recipient not attached").await;
            }
        }
    }

    /// Undeliverable-message recovery (§4.1 "Detach... pending messages to
    /// that agent become undeliverable and are returned as ERROR to their
    /// senders"). Routed directly onto the reply channel, bypassing rate
    /// limiting: this is system-generated protocol feedback, not agent
    /// traffic subject to budget.
    async fn return_error(&self, original: Message, reason: &str) {
        if original.kind() == MessageKind::Error {
            return; // never bounce an ERROR with another ERROR
        }
        let Ok(error_msg) = original.reply(
            AgentId::supervisor(),
            self.clock.epoch_ms(),
            MessagePayload::Error(maestro_core::ErrorPayload { error: reason.to_string(), original_message_id: original.id }),
        ) else {
            return;
        };
        let now_ms = self.clock.epoch_ms();
        if let Some(inbox) = self.registry.inbox_for(&error_msg.to) {
            if inbox.send(error_msg.clone()).await.is_ok() {
                let _ = self.event_log.record(&error_msg, now_ms, EventDirection::Delivered);
            }
        }
    }

    /// Register `agent_id`, creating its inbox and returning the receiving
    /// half for the driver task to consume (§4.1 "Attach").
    pub fn attach(&self, agent_id: AgentId, model: impl Into<String>) -> Result<mpsc::Receiver<Message>, DispatchError> {
        let (inbox_tx, inbox_rx) = mpsc::channel(self.config.inbox_capacity);
        self.registry.attach(agent_id, model.into(), inbox_tx)?;
        Ok(inbox_rx)
    }

    /// Remove `agent_id` from the registry (§4.1 "Detach").
    pub fn detach(&self, agent_id: &AgentId) {
        self.registry.detach(agent_id);
    }

    /// Validate, rate-limit, log, and enqueue `msg` on the channel matching
    /// its kind (§4.1 "DispatchMessage"). `estimated_tokens` defaults to
    /// [`estimate_tokens`] applied to the payload when the caller has no
    /// better estimate.
    pub async fn dispatch_message(&self, msg: Message, estimated_tokens: f64) -> Result<(), DispatchError> {
        let model = self.registry.model_for(&msg.to).ok_or_else(|| DispatchError::NoSuchRecipient(msg.to.clone()))?;

        let deadline = tokio::time::Instant::now() + self.config.rate_limit_wait;
        loop {
            match self.rate_limiter.reserve(&model, estimated_tokens)? {
                ReserveOutcome::Granted => break,
                ReserveOutcome::Denied { retry_after_ms } => {
                    let retry_at = tokio::time::Instant::now() + Duration::from_millis(retry_after_ms);
                    if retry_at > deadline {
                        return Err(DispatchError::RateLimitDenied(crate::error::RateLimitError::Denied {
                            model,
                            retry_after_ms,
                        }));
                    }
                    tokio::time::sleep(Duration::from_millis(retry_after_ms.min(1000))).await;
                }
            }
        }

        let channel = Channel::for_kind(msg.kind());
        let now_ms = self.clock.epoch_ms();
        let _ = self.event_log.record(&msg, now_ms, EventDirection::Sent);

        let tx = match channel {
            Channel::Spec => &self.spec_tx,
            Channel::Story => &self.story_tx,
            Channel::Questions => &self.questions_tx,
            Channel::Reply => &self.reply_tx,
        };

        match tokio::time::timeout(self.config.backpressure_timeout, tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DispatchError::Closed),
            Err(_) => Err(DispatchError::BackpressureTimeout { recipient: AgentId::supervisor(), channel: channel.name() }),
        }
    }

    /// Build and dispatch the REQUEUE message that is the only path by
    /// which a coder's failed story returns to the architect's pool (§4.1
    /// "REQUEUE protocol").
    ///
    /// The `story_id` is carried in `metadata["story_id"]`: `RequeuePayload`
    /// itself only names the coder (§3.1), so this is where the failed
    /// story's identity travels — an explicit deviation from the
    /// pseudocode's two-argument `SendRequeue(coder_id, reason)` signature,
    /// recorded in DESIGN.md.
    pub async fn send_requeue(&self, coder_agent_id: AgentId, story_id: impl Into<String>, reason: impl Into<String>) -> Result<(), DispatchError> {
        let architect_id = self.architect_id.lock().clone().ok_or_else(|| DispatchError::NoSuchRecipient(coder_agent_id.clone()))?;

        let payload = MessagePayload::Requeue(maestro_core::RequeuePayload { agent_id: coder_agent_id, reason: reason.into() });
        let msg = maestro_core::Message::new(AgentId::supervisor(), architect_id, self.clock.epoch_ms(), payload)?
            .with_metadata("story_id", story_id.into());

        self.dispatch_message(msg, 0.0).await
    }

    /// Publish a terminal-state notification (§4.1 "SubscribeTerminal").
    /// Driver-internal: called once an agent's driver reaches DONE/ERROR.
    pub fn publish_terminal(&self, agent_id: AgentId, state: TerminalState, context: HashMap<String, String>) {
        let _ = self.terminal_tx.send(TerminalNotification { agent_id, state, context });
    }

    /// Supervisor-only observation of terminal-state notifications (§4.1).
    pub fn subscribe_terminal(&self) -> broadcast::Receiver<TerminalNotification> {
        self.terminal_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
