// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool host (§4.4): ordinary tools dispatch to a registered [`Tool`]
//! impl; `maestro_*` signal tool names never need a registered impl — their
//! invocation is itself the agent's terminal act, so the registry
//! synthesizes the acknowledgement and records the effect.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use maestro_core::Signal;

use crate::effect::{EffectSlot, ProcessEffect};
use crate::error::McpError;
use crate::tool::{Tool, ToolDescriptor, ToolOutput};

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    effects: EffectSlot,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new(), effects: EffectSlot::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.descriptor().name, tool);
    }

    pub fn effects(&self) -> &EffectSlot {
        &self.effects
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Invoke `name` with `arguments`. Returns the tool output plus the
    /// effect this call produced, if `name` was a recognized `maestro_*`
    /// signal tool (§4.4).
    pub async fn call(&self, name: &str, arguments: Value) -> Result<(ToolOutput, Option<ProcessEffect>), McpError> {
        if let Some(signal) = Signal::from_tool_name(name) {
            let effect = ProcessEffect { signal, data: arguments };
            self.effects.record(effect.clone());
            return Ok((ToolOutput::text(format!("recorded signal {signal}")), Some(effect)));
        }

        let tool = self.tools.get(name).ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        let output = tool.call(arguments).await?;
        Ok((output, None))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
