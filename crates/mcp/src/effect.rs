// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signal-tool effect slot (§4.4, §8 invariant 7).
//!
//! `ConsumeLastEffect`'s "exactly once" guarantee is implemented as
//! `Option::take()` under a `parking_lot::Mutex`, never a flag-plus-clear
//! pair that could race.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use maestro_core::Signal;

/// The state-machine signal produced by a `maestro_*` tool call, recorded by
/// the server and consumed by whoever is watching for the agent's terminal
/// act (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEffect {
    pub signal: Signal,
    pub data: Value,
}

/// Holds at most one unconsumed [`ProcessEffect`] (§4.4).
#[derive(Default)]
pub struct EffectSlot {
    last: Mutex<Option<ProcessEffect>>,
}

impl EffectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new effect, overwriting any unconsumed prior one.
    pub fn record(&self, effect: ProcessEffect) {
        *self.last.lock() = Some(effect);
    }

    /// Atomically return and clear the last recorded effect (§8 invariant 7:
    /// "observable exactly once").
    pub fn consume_last_effect(&self) -> Option<ProcessEffect> {
        self.last.lock().take()
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
