use super::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::registry::ToolRegistry;
use crate::server::McpServer;

async fn start_fake_server(auth_token: &str) -> (String, CancellationToken) {
    let server = McpServer::bind(auth_token.to_string(), Arc::new(ToolRegistry::new())).await.expect("bind");
    let addr = server.local_addr().to_string();
    let cancel = CancellationToken::new();
    let serve_cancel = cancel.clone();
    tokio::spawn(async move { server.serve(serve_cancel).await });
    (addr, cancel)
}

#[tokio::test]
async fn check_succeeds_against_matching_token() {
    let (addr, cancel) = start_fake_server("good-token").await;
    check(&addr, "good-token").await.expect("auth succeeds");
    cancel.cancel();
}

#[tokio::test]
async fn check_fails_against_mismatched_token() {
    let (addr, cancel) = start_fake_server("good-token").await;
    let err = check(&addr, "wrong-token").await.unwrap_err();
    assert!(matches!(err, McpError::AuthRejected));
    cancel.cancel();
}

#[tokio::test]
async fn check_fails_when_nothing_is_listening() {
    let err = check("127.0.0.1:1", "any-token").await.unwrap_err();
    assert!(matches!(err, McpError::Connect { .. }));
}
