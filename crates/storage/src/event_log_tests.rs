// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use maestro_core::{AgentId, AgentType, Message, MessagePayload, StoryPayload};

fn story_message() -> Message {
    Message::new(
        AgentId::new(AgentType::Architect, "main"),
        AgentId::new(AgentType::Coder, "001"),
        0,
        MessagePayload::Story(StoryPayload { content: "do it".into(), requirements: vec![], story_id: "001".into() }),
    )
    .expect("from != to")
}

#[test]
fn record_creates_one_segment_per_hour() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = FileEventLog::open(dir.path()).expect("open");
    let msg = story_message();

    // 2024-01-01T00:30:00Z
    log.record(&msg, 1_704_069_000_000, EventDirection::Sent).expect("record");
    // same hour
    log.record(&msg, 1_704_069_600_000, EventDirection::Delivered).expect("record");
    // next hour: 2024-01-01T01:10:00Z
    log.record(&msg, 1_704_072_600_000, EventDirection::Delivered).expect("record");

    let mut files: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    files.sort();
    assert_eq!(files.len(), 2);
}

#[test]
fn completed_segments_excludes_current_hour() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = FileEventLog::open(dir.path()).expect("open");
    let msg = story_message();

    log.record(&msg, 1_704_069_000_000, EventDirection::Sent).expect("record");
    log.record(&msg, 1_704_072_600_000, EventDirection::Sent).expect("record");

    let completed = log.completed_segments();
    assert_eq!(completed.len(), 1);
}

#[test]
fn read_segment_roundtrips_records_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = FileEventLog::open(dir.path()).expect("open");
    let msg = story_message();

    log.record(&msg, 1_704_069_000_000, EventDirection::Sent).expect("record");
    log.record(&msg, 1_704_069_100_000, EventDirection::Delivered).expect("record");
    // force rotation so the first segment is "completed"
    log.record(&msg, 1_704_072_600_000, EventDirection::Sent).expect("record");

    let completed = log.completed_segments();
    assert_eq!(completed.len(), 1);
    let records = read_segment(&completed[0]).expect("read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].direction, EventDirection::Sent);
    assert_eq!(records[1].direction, EventDirection::Delivered);
    assert_eq!(records[0].message.id, msg.id);
}
