// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use maestro_core::{AgentId, AgentType};

fn blob() -> AgentStateBlob {
    AgentStateBlob::new(AgentId::new(AgentType::Coder, "001"), "planning", 0)
}

#[test]
fn get_on_empty_store_returns_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    assert!(store.get(&AgentId::new(AgentType::Coder, "001")).expect("get").is_none());
}

#[test]
fn put_then_get_roundtrips_exactly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    let blob = blob();

    store.put(&blob).expect("put");
    let read = store.get(&blob.agent_id).expect("get").expect("present");
    assert_eq!(read, blob);
}

#[test]
fn put_overwrites_previous_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    let blob = blob();
    store.put(&blob).expect("put");

    let advanced = blob.advance("coding", Default::default(), 10);
    store.put(&advanced).expect("put");

    let read = store.get(&blob.agent_id).expect("get").expect("present");
    assert_eq!(read, advanced);
}

#[test]
fn roundtrip_survives_reopening_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blob = blob();
    {
        let store = FileStateStore::open(dir.path()).expect("open");
        store.put(&blob).expect("put");
    }
    let reopened = FileStateStore::open(dir.path()).expect("reopen");
    let read = reopened.get(&blob.agent_id).expect("get").expect("present");
    assert_eq!(read, blob);
}

#[test]
fn delete_removes_the_blob() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    let blob = blob();
    store.put(&blob).expect("put");

    store.delete(&blob.agent_id).expect("delete");
    assert!(store.get(&blob.agent_id).expect("get").is_none());
}

#[test]
fn delete_on_missing_blob_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    store.delete(&AgentId::new(AgentType::Coder, "999")).expect("delete is idempotent");
}

#[test]
fn agent_id_colon_is_sanitized_in_file_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStateStore::open(dir.path()).expect("open");
    let blob = blob();
    store.put(&blob).expect("put");

    let entries: Vec<_> = std::fs::read_dir(dir.path()).expect("read_dir").map(|e| e.unwrap().file_name()).collect();
    assert!(entries.iter().any(|n| n.to_string_lossy() == "coder-001.json"));
}
