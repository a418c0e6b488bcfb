use super::*;
use crate::proxy::FakeMcpProxyProvider;
use crate::registry::ContainerRegistry;
use crate::runtime_cli::ContainerRuntime;
use maestro_core::{ContainerConfig, RoMount};

fn executor() -> DockerContainerExecutor<FakeMcpProxyProvider> {
    DockerContainerExecutor::new(ContainerRuntime::Docker, ContainerRegistry::new(), FakeMcpProxyProvider { bytes: vec![] })
}

#[test]
fn build_run_args_applies_mandatory_hardening_flags() {
    let exec = executor();
    let config = ContainerConfig::new("maestro-agent:latest", "/host/workspace");
    let args = exec.build_run_args(&config, "maestro-coder-001");

    assert!(args.contains(&"--read-only".to_string()));
    assert!(args.windows(2).any(|w| w == ["--security-opt".to_string(), "no-new-privileges".to_string()]));
    assert!(args.windows(2).any(|w| w == ["--user".to_string(), "1000:1000".to_string()]));
    assert!(args.windows(2).any(|w| w == ["--pids-limit".to_string(), "1024".to_string()]));
    assert!(args.windows(2).any(|w| w == ["--name".to_string(), "maestro-coder-001".to_string()]));
    assert_eq!(args.last().map(String::as_str), Some("infinity"));
}

#[test]
fn build_run_args_omits_network_none_unless_requested() {
    let exec = executor();
    let config = ContainerConfig::new("maestro-agent:latest", "/host/workspace");
    let args = exec.build_run_args(&config, "maestro-coder-001");
    assert!(!args.contains(&"--network".to_string()));

    let networked_off = config.network_none(true);
    let args = exec.build_run_args(&networked_off, "maestro-coder-001");
    assert!(args.windows(2).any(|w| w == ["--network".to_string(), "none".to_string()]));
}

#[test]
fn build_run_args_mounts_workdir_read_write_by_default() {
    let exec = executor();
    let config = ContainerConfig::new("maestro-agent:latest", "/host/workspace");
    let args = exec.build_run_args(&config, "maestro-coder-001");
    assert!(args.contains(&"/host/workspace:/workspace".to_string()));
}

#[test]
fn build_run_args_mounts_workdir_read_only_when_configured() {
    let exec = executor();
    let config = ContainerConfig::new("maestro-agent:latest", "/host/workspace").read_only(true);
    let args = exec.build_run_args(&config, "maestro-architect-main");
    assert!(args.contains(&"/host/workspace:/workspace:ro".to_string()));
}

#[test]
fn build_run_args_includes_ro_mounts_for_architect_style_configs() {
    let exec = executor();
    let config = ContainerConfig::new("maestro-agent:latest", "/host/workspace")
        .with_ro_mount(RoMount { host_path: "/host/coders/coder-001".into(), container_path: "/mnt/coders/coder-001".into() });
    let args = exec.build_run_args(&config, "maestro-architect-main");
    assert!(args.contains(&"/host/coders/coder-001:/mnt/coders/coder-001:ro".to_string()));
}

#[test]
fn generate_auth_token_is_64_hex_chars() {
    let token = generate_auth_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_auth_token_is_not_constant() {
    assert_ne!(generate_auth_token(), generate_auth_token());
}
