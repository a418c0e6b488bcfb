// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-mcp: the tool-bridge MCP server (§4.4) — an in-process JSON-RPC
//! 2.0 host exposing tools to the containerized LLM over a line-delimited
//! TCP channel, plus the stdio⇄TCP proxy binary copied into each container.

pub mod effect;
pub mod error;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod server;
pub mod tool;

pub use effect::{EffectSlot, ProcessEffect};
pub use error::McpError;
pub use protocol::{RpcError, RpcRequest, RpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION};
pub use registry::ToolRegistry;
pub use server::McpServer;
pub use tool::{ContentBlock, Tool, ToolDescriptor, ToolOutput};
