// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentType;

fn agent_id() -> AgentId {
    AgentId::new(AgentType::Coder, "001")
}

#[test]
fn new_blob_has_empty_state_data_and_no_session() {
    let blob = AgentStateBlob::new(agent_id(), "plan", 100);
    assert_eq!(blob.current_state, "plan");
    assert!(blob.state_data.is_empty());
    assert_eq!(blob.session_id, None);
}

#[test]
fn advance_preserves_agent_id_and_session_but_updates_state() {
    let blob = AgentStateBlob::new(agent_id(), "plan", 100).session_id("sess-1");
    let mut data = HashMap::new();
    data.insert("plan".to_string(), "add health endpoint".to_string());

    let next = blob.advance("code", data.clone(), 200);

    assert_eq!(next.agent_id, agent_id());
    assert_eq!(next.current_state, "code");
    assert_eq!(next.state_data, data);
    assert_eq!(next.session_id, Some("sess-1".to_string()));
    assert_eq!(next.updated_at_ms, 200);
}

#[test]
fn blob_serde_roundtrip() {
    let blob = AgentStateBlob::new(agent_id(), "plan", 100).context_summary("initial plan drafted");
    let json = serde_json::to_string(&blob).unwrap();
    let parsed: AgentStateBlob = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, blob);
}
