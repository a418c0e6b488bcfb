// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary installed into every agent container by
//! `ContainerExecutor::install_mcp_proxy` (§4.3). Bridges the container's
//! MCP-speaking stdio to the host-resident MCP server named by
//! `MCP_HOST_ADDR`, authenticating with `MCP_AUTH_TOKEN`.
//!
//! Usage: `mcp-proxy [--check]`. With `--check`, only the auth handshake
//! runs and the process exits 0/1 without bridging stdio — used for the
//! container's health check.

use std::process::ExitCode;

fn main() -> ExitCode {
    let check_only = std::env::args().skip(1).any(|arg| arg == "--check");

    let addr = match std::env::var("MCP_HOST_ADDR") {
        Ok(addr) => addr,
        Err(_) => {
            eprintln!("mcp-proxy: MCP_HOST_ADDR is not set");
            return ExitCode::FAILURE;
        }
    };
    let auth_token = match std::env::var("MCP_AUTH_TOKEN") {
        Ok(token) => token,
        Err(_) => {
            eprintln!("mcp-proxy: MCP_AUTH_TOKEN is not set");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("mcp-proxy: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = if check_only {
        runtime.block_on(maestro_mcp::proxy::check(&addr, &auth_token))
    } else {
        runtime.block_on(maestro_mcp::proxy::run(&addr, &auth_token))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mcp-proxy: {e}");
            ExitCode::FAILURE
        }
    }
}
