// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn agent_id_display() {
    let id = AgentId::new(AgentType::Coder, "001");
    assert_eq!(id.to_string(), "coder:001");
}

#[test]
fn agent_id_equality() {
    let id1 = AgentId::new(AgentType::Coder, "001");
    let id2 = AgentId::new(AgentType::Coder, "001");
    let id3 = AgentId::new(AgentType::Coder, "002");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
}

#[test]
fn agent_id_parse_roundtrip() {
    let id = AgentId::parse("architect:main").unwrap();
    assert_eq!(id.agent_type(), AgentType::Architect);
    assert_eq!(id.instance(), "main");
    assert_eq!(id.as_str(), "architect:main");
}

#[test]
fn agent_id_parse_rejects_missing_colon() {
    assert!(AgentId::parse("coder").is_err());
}

#[test]
fn agent_id_parse_rejects_empty_instance() {
    assert!(AgentId::parse("coder:").is_err());
}

#[test]
fn agent_id_parse_rejects_unknown_type() {
    assert!(AgentId::parse("reviewer:001").is_err());
}

#[test]
fn agent_id_serde() {
    let id = AgentId::new(AgentType::Pm, "lead");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"pm:lead\"");

    let parsed: AgentId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn agent_id_serde_rejects_malformed_string() {
    let result: Result<AgentId, _> = serde_json::from_str("\"not-an-agent-id\"");
    assert!(result.is_err());
}

#[test]
fn agent_type_display() {
    assert_eq!(AgentType::Architect.to_string(), "architect");
    assert_eq!(AgentType::Coder.to_string(), "coder");
    assert_eq!(AgentType::Pm.to_string(), "pm");
}

#[test]
fn terminal_state_display() {
    assert_eq!(TerminalState::Done.to_string(), "done");
    assert_eq!(TerminalState::Error.to_string(), "error");
}

#[test]
fn signal_from_tool_name_recognizes_signal_tools() {
    assert_eq!(Signal::from_tool_name("maestro_done"), Some(Signal::Done));
    assert_eq!(Signal::from_tool_name("maestro_submit_plan"), Some(Signal::PlanComplete));
    assert_eq!(Signal::from_tool_name("maestro_question"), Some(Signal::Question));
    assert_eq!(Signal::from_tool_name("maestro_story_complete"), Some(Signal::StoryComplete));
    assert_eq!(Signal::from_tool_name("maestro_error"), Some(Signal::Error));
}

#[test]
fn signal_from_tool_name_ignores_non_signal_tools() {
    assert_eq!(Signal::from_tool_name("read_file"), None);
    assert_eq!(Signal::from_tool_name("maestro_helper_not_a_signal"), None);
}

#[test]
fn signal_terminal_state_mapping() {
    assert_eq!(Signal::Done.terminal_state(), Some(TerminalState::Done));
    assert_eq!(Signal::StoryComplete.terminal_state(), Some(TerminalState::Done));
    assert_eq!(Signal::Error.terminal_state(), Some(TerminalState::Error));
    assert_eq!(Signal::Timeout.terminal_state(), Some(TerminalState::Error));
    assert_eq!(Signal::Inactivity.terminal_state(), Some(TerminalState::Error));
    assert_eq!(Signal::PlanComplete.terminal_state(), None);
    assert_eq!(Signal::Question.terminal_state(), None);
}
