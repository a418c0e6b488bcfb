// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent message envelope (§3.1).
//!
//! `kind` and `payload` are collapsed into a single tagged enum so that
//! invariant (ii) — "a mismatch between kind and payload is a programmer
//! error" — is enforced by the compiler rather than checked at runtime (see
//! SPEC_FULL.md §9 "Dynamic payload typing").

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

crate::define_id! {
    /// Unique identifier for a message. Unique process-wide (invariant i).
    pub struct MessageId("msg-");
}

/// The routing discriminator, reconstructed from `MessagePayload` by
/// `Message::kind()`. Exists purely for logging, metadata, and matching by
/// tests without destructuring the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Story,
    Response,
    Error,
    Request,
    Question,
    Shutdown,
    Spec,
    Requeue,
}

crate::simple_display! {
    MessageKind {
        Story => "story",
        Response => "response",
        Error => "error",
        Request => "request",
        Question => "question",
        Shutdown => "shutdown",
        Spec => "spec",
        Requeue => "requeue",
    }
}

/// A unit of work issued by the architect; carries a `story_id` used for
/// traceability and requeue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPayload {
    pub content: String,
    pub requirements: Vec<String>,
    pub story_id: String,
}

/// A coder-to-architect sidebar question (not an approval request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequestPayload {
    pub text: String,
    pub context: String,
}

/// The architect's reply to a `QuestionRequestPayload`, delivered as a
/// REQUEST message back to the asking agent's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponsePayload {
    pub answer_text: String,
}

/// A coder-to-architect sidebar approval request (the other QUESTION-kind
/// sub-shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequestPayload {
    pub request: String,
    pub reason: String,
    pub current_state: String,
}

/// Either sidebar shape carried by a QUESTION message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sidebar_kind", rename_all = "snake_case")]
pub enum QuestionPayload {
    Question(QuestionRequestPayload),
    Approval(ApprovalRequestPayload),
}

/// Returned to a sender when routing or processing fails (protocol errors,
/// §7) instead of silently dropping the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub original_message_id: MessageId,
}

/// The outcome of handling a STORY or SHUTDOWN, reported back to the
/// architect / supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub status: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// The REQUEUE control payload; `agent_id` is the coder whose story should
/// return to the pool, `reason` is a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequeuePayload {
    pub agent_id: AgentId,
    pub reason: String,
}

/// An inbound specification from outside the system, delivered to the
/// architect via the spec channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecPayload {
    pub content: String,
}

/// No fields; the SHUTDOWN kind is a pure control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownPayload {}

/// One variant per `MessageKind`, each carrying its matching payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum MessagePayload {
    Story(StoryPayload),
    Response(ResponsePayload),
    Error(ErrorPayload),
    Request(QuestionResponsePayload),
    Question(QuestionPayload),
    Shutdown(ShutdownPayload),
    Spec(SpecPayload),
    Requeue(RequeuePayload),
}

impl MessagePayload {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Story(_) => MessageKind::Story,
            MessagePayload::Response(_) => MessageKind::Response,
            MessagePayload::Error(_) => MessageKind::Error,
            MessagePayload::Request(_) => MessageKind::Request,
            MessagePayload::Question(_) => MessageKind::Question,
            MessagePayload::Shutdown(_) => MessageKind::Shutdown,
            MessagePayload::Spec(_) => MessageKind::Spec,
            MessagePayload::Requeue(_) => MessageKind::Requeue,
        }
    }
}

/// The full message envelope (§3.1). Treated as immutable once dispatched;
/// `Clone` gives consumers that need to mutate a view of it a deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub parent_id: Option<MessageId>,
    pub from: AgentId,
    pub to: AgentId,
    pub timestamp_ms: u64,
    pub payload: MessagePayload,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Message {
    /// Construct a new message, enforcing invariant (iii) `from != to`.
    pub fn new(
        from: AgentId,
        to: AgentId,
        timestamp_ms: u64,
        payload: MessagePayload,
    ) -> Result<Self, InvalidMessage> {
        if from == to {
            return Err(InvalidMessage::SameSenderAndRecipient(from));
        }
        Ok(Self { id: MessageId::new(), parent_id: None, from, to, timestamp_ms, payload, metadata: HashMap::new() })
    }

    /// Construct a reply, automatically chaining `parent_id` to `self.id`.
    pub fn reply(
        &self,
        from: AgentId,
        timestamp_ms: u64,
        payload: MessagePayload,
    ) -> Result<Self, InvalidMessage> {
        let mut msg = Message::new(from, self.from.clone(), timestamp_ms, payload)?;
        msg.parent_id = Some(self.id);
        Ok(msg)
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Construction-time invariant violations for `Message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidMessage {
    SameSenderAndRecipient(AgentId),
}

impl fmt::Display for InvalidMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMessage::SameSenderAndRecipient(id) => {
                write!(f, "message from and to must differ, got {id} for both")
            }
        }
    }
}

impl std::error::Error for InvalidMessage {}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
