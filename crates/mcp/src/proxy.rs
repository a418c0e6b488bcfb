// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stdio⇄TCP proxy (§4.3, §4.4): the binary copied into every container
//! at `install_mcp_proxy` time. The containerized LLM CLI speaks MCP over
//! its own stdin/stdout; this proxy bridges that to the host-resident
//! [`crate::server::McpServer`] over `host.docker.internal:<port>`, so the
//! tool implementations never run inside the container's trust boundary.

use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::McpError;

/// Connect to `addr`, send the auth line, and return once the server has
/// confirmed `{"authenticated":true}`. Used both by [`run`] and by
/// `--check` invocations that only verify connectivity.
async fn authenticate(addr: &str, auth_token: &str) -> Result<TcpStream, McpError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| McpError::Connect { addr: addr.to_string(), source })?;

    let auth_line = format!("{}\n", serde_json::json!({ "auth": auth_token }));
    stream.write_all(auth_line.as_bytes()).await.map_err(McpError::Io)?;

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut reply = String::new();
    reader.read_line(&mut reply).await.map_err(McpError::Io)?;

    let value: Value = serde_json::from_str(reply.trim()).unwrap_or(Value::Null);
    if value.get("authenticated") != Some(&Value::Bool(true)) {
        return Err(McpError::AuthRejected);
    }

    Ok(reader.into_inner().unsplit(write_half))
}

/// Perform only the auth handshake, for container health checks (`--check`).
pub async fn check(addr: &str, auth_token: &str) -> Result<(), McpError> {
    authenticate(addr, auth_token).await.map(|_| ())
}

/// Bridge stdin/stdout to the MCP server at `addr` until either side closes.
pub async fn run(addr: &str, auth_token: &str) -> Result<(), McpError> {
    let stream = authenticate(addr, auth_token).await?;
    let (mut server_read, mut server_write) = stream.into_split();

    let mut stdin = io::stdin();
    let mut stdout = io::stdout();

    let to_server = async {
        io::copy(&mut stdin, &mut server_write).await?;
        server_write.shutdown().await
    };
    let from_server = io::copy(&mut server_read, &mut stdout);

    tokio::select! {
        result = to_server => result.map_err(McpError::Io)?,
        result = from_server => { result.map_err(McpError::Io)?; }
    }

    Ok(())
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
