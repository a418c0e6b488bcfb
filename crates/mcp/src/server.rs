// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The MCP TCP server (§4.4, §6).
//!
//! **Server internals (this port).** One `tokio::spawn`ed task per accepted
//! connection, mirroring the reference daemon's dual-listener accept loop;
//! each connection task races request handling against disconnect detection
//! with `tokio::select!` so a dropped proxy process cannot wedge a server
//! task forever.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::error::McpError;
use crate::protocol::{RpcError, RpcRequest, RpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION};
use crate::registry::ToolRegistry;

#[derive(Debug, Deserialize)]
struct AuthLine {
    auth: String,
}

#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// The tool-bridge MCP server (§4.4). Binds `127.0.0.1:0` and serves one
/// agent's tool calls for the lifetime of a single LLM-runner invocation
/// (§3.5: its lifetime is strictly shorter than the executor's container).
pub struct McpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    auth_token: String,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub async fn bind(auth_token: impl Into<String>, registry: Arc<ToolRegistry>) -> Result<Self, McpError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(McpError::Bind)?;
        let local_addr = listener.local_addr().map_err(McpError::Bind)?;
        Ok(Self { listener, local_addr, auth_token: auth_token.into(), registry })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `cancel` fires, spawning one task per
    /// connection.
    pub async fn serve(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let auth_token = self.auth_token.clone();
                            let registry = Arc::clone(&self.registry);
                            let conn_cancel = cancel.child_token();
                            tokio::spawn(async move {
                                tracing::debug!(%peer, "mcp connection accepted");
                                handle_connection(stream, auth_token, registry, conn_cancel).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "mcp accept failed");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("mcp server shutting down");
                    break;
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, auth_token: String, registry: Arc<ToolRegistry>, cancel: CancellationToken) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut first_line = String::new();
    let read_result = tokio::select! {
        r = reader.read_line(&mut first_line) => r,
        _ = cancel.cancelled() => return,
    };
    if matches!(read_result, Ok(0) | Err(_)) {
        return;
    }

    let authenticated = serde_json::from_str::<AuthLine>(first_line.trim_end()).map(|a| a.auth) == Ok(auth_token.clone());
    if !authenticated {
        let _ = write_half
            .write_all(format!("{}\n", json!({"authenticated": false, "error": "invalid auth token"})).as_bytes())
            .await;
        return;
    }
    if write_half.write_all(format!("{}\n", json!({"authenticated": true})).as_bytes()).await.is_err() {
        return;
    }

    let mut line = String::new();
    loop {
        line.clear();
        let read_result = tokio::select! {
            r = reader.read_line(&mut line) => r,
            _ = cancel.cancelled() => return,
        };
        match read_result {
            Ok(0) => return, // EOF: proxy process disconnected
            Ok(_) => {}
            Err(_) => return,
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = handle_request(trimmed, &registry).await;
        if let Some(response) = response {
            if write_half.write_all(response.to_line().as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

async fn handle_request(line: &str, registry: &ToolRegistry) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => return Some(RpcResponse::err(None, RpcError::new(PARSE_ERROR, format!("parse error: {e}")))),
    };

    match request.method.as_str() {
        "initialize" => Some(RpcResponse::ok(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": { "name": "maestro-mcp", "version": env!("CARGO_PKG_VERSION") },
                "capabilities": { "tools": {} },
            }),
        )),
        "notifications/initialized" => None,
        "tools/list" => Some(RpcResponse::ok(request.id, json!({ "tools": registry.list() }))),
        "tools/call" => Some(handle_tools_call(request, registry).await),
        other => Some(RpcResponse::err(request.id, RpcError::new(METHOD_NOT_FOUND, format!("unknown method {other:?}")))),
    }
}

async fn handle_tools_call(request: RpcRequest, registry: &ToolRegistry) -> RpcResponse {
    let params: ToolsCallParams = match serde_json::from_value(request.params) {
        Ok(p) => p,
        Err(e) => return RpcResponse::err(request.id, RpcError::new(INVALID_PARAMS, format!("invalid tools/call params: {e}"))),
    };

    match registry.call(&params.name, params.arguments).await {
        Ok((output, effect)) => {
            let content: Vec<Value> =
                output.content.iter().map(|c| serde_json::to_value(c).unwrap_or(Value::Null)).collect();
            let mut result = json!({ "content": content, "isError": output.is_error });
            if let Some(effect) = effect {
                result["_maestro_effect"] = serde_json::to_value(&effect).unwrap_or(Value::Null);
            }
            RpcResponse::ok(request.id, result)
        }
        Err(McpError::UnknownTool(name)) => {
            RpcResponse::err(request.id, RpcError::new(INVALID_PARAMS, format!("unknown tool {name:?}")))
        }
        Err(e) => RpcResponse::ok(request.id, json!({ "content": [{"type": "text", "text": e.to_string()}], "isError": true })),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
