// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentType;

fn coder() -> AgentId {
    AgentId::new(AgentType::Coder, "001")
}

fn architect() -> AgentId {
    AgentId::new(AgentType::Architect, "main")
}

fn story_payload() -> MessagePayload {
    MessagePayload::Story(StoryPayload {
        content: "Create health endpoint".into(),
        requirements: vec!["returns 200".into()],
        story_id: "001".into(),
    })
}

#[test]
fn new_rejects_same_sender_and_recipient() {
    let err = Message::new(coder(), coder(), 0, story_payload()).unwrap_err();
    assert_eq!(err, InvalidMessage::SameSenderAndRecipient(coder()));
}

#[test]
fn new_assigns_unique_ids() {
    let a = Message::new(architect(), coder(), 0, story_payload()).unwrap();
    let b = Message::new(architect(), coder(), 0, story_payload()).unwrap();
    assert_ne!(a.id, b.id);
}

#[test]
fn kind_matches_payload_variant() {
    let msg = Message::new(architect(), coder(), 0, story_payload()).unwrap();
    assert_eq!(msg.kind(), MessageKind::Story);
}

#[test]
fn reply_chains_parent_id_and_flips_direction() {
    let story = Message::new(architect(), coder(), 0, story_payload()).unwrap();
    let response = story
        .reply(
            coder(),
            1,
            MessagePayload::Response(ResponsePayload { status: "completed".into(), data: Default::default() }),
        )
        .unwrap();

    assert_eq!(response.parent_id, Some(story.id));
    assert_eq!(response.from, coder());
    assert_eq!(response.to, architect());
}

#[test]
fn with_metadata_inserts_entries() {
    let msg = Message::new(architect(), coder(), 0, story_payload()).unwrap().with_metadata("story_id", "001");
    assert_eq!(msg.metadata.get("story_id"), Some(&"001".to_string()));
}

#[test]
fn message_serde_roundtrip_preserves_kind_tag() {
    let msg = Message::new(architect(), coder(), 42, story_payload()).unwrap();
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"kind\":\"story\""));

    let parsed: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn requeue_payload_carries_agent_id_and_reason() {
    let msg = Message::new(
        AgentId::supervisor(),
        architect(),
        0,
        MessagePayload::Requeue(RequeuePayload { agent_id: coder(), reason: "max retries exceeded".into() }),
    )
    .unwrap();
    assert_eq!(msg.from, AgentId::supervisor());
    assert_eq!(msg.kind(), MessageKind::Requeue);
}
