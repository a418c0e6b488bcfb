// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Tool` trait hosted-tool implementations register against (§4.4).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpError;

/// Static metadata for `tools/list` (§4.4).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A single block of a tool's `content` result (§4.4: `{content:[{type:"text",text:…}]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// The result of a `tools/call` invocation, before the server folds in the
/// `_maestro_effect` field for signal tools.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }], is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }], is_error: true }
    }
}

/// A host-resident tool exposed to the containerized LLM over MCP.
///
/// Ordinary tools (file read/write, shell) implement this directly.
/// `maestro_*` signal tools (§4.4) are handled specially by
/// [`crate::registry::ToolRegistry`] and never need a `Tool` impl of their
/// own — the registry synthesizes their acknowledgement.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn call(&self, arguments: Value) -> Result<ToolOutput, McpError>;
}
