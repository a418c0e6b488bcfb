// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the MCP server (§4.4, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to bind MCP listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("unknown tool {0:?}")]
    UnknownTool(String),

    #[error("tool {name:?} failed: {reason}")]
    ToolFailed { name: String, reason: String },

    #[error("invalid arguments for tool {name:?}: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("failed to connect to MCP server at {addr}: {source}")]
    Connect { addr: String, #[source] source: std::io::Error },

    #[error("MCP server rejected auth token")]
    AuthRejected,

    #[error("i/o error bridging MCP proxy stdio: {0}")]
    Io(#[source] std::io::Error),
}
