// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn resource_limits_defaults_match_spec() {
    let limits = ResourceLimits::default();
    assert_eq!(limits.cpus, 2.0);
    assert_eq!(limits.memory_mib, 2048);
    assert_eq!(limits.pids_limit, 1024);
}

#[test]
fn tmpfs_defaults_match_spec() {
    let tmpfs = TmpfsMounts::default();
    assert_eq!(tmpfs.home_mib, 100);
    assert_eq!(tmpfs.cache_mib, 100);
}

#[test]
fn container_config_builder_sets_read_only() {
    let cfg = ContainerConfig::new("maestro-agent:latest", "/tmp/work").read_only(true);
    assert!(cfg.read_only);
    assert_eq!(cfg.workdir, std::path::PathBuf::from("/tmp/work"));
}

#[test]
fn container_config_accumulates_ro_mounts() {
    let cfg = ContainerConfig::new("maestro-agent:latest", "/tmp/work")
        .with_ro_mount(RoMount { host_path: "/tmp/coder-001".into(), container_path: "/mnt/coders/coder-001".into() })
        .with_ro_mount(RoMount { host_path: "/tmp/coder-002".into(), container_path: "/mnt/coders/coder-002".into() });
    assert_eq!(cfg.ro_mounts.len(), 2);
}

#[test]
fn container_config_serde_roundtrip() {
    let cfg = ContainerConfig::new("maestro-agent:latest", "/tmp/work").network_none(true);
    let json = serde_json::to_string(&cfg).unwrap();
    let parsed: ContainerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, cfg);
}
