// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit data types shared between the dispatcher and the rate limiter
//! (§3.3, §4.6). The reservation/refill algorithm itself lives in
//! `maestro_runtime::rate_limiter`, which is the only writer of
//! `ModelCounters`.

use serde::{Deserialize, Serialize};

/// Per-model limits, supplied by configuration (one entry per model name
/// the system is configured to talk to).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_tokens_per_minute: f64,
    pub max_budget_per_day_usd: f64,
}

impl RateLimitConfig {
    pub fn new(max_tokens_per_minute: f64, max_budget_per_day_usd: f64) -> Self {
        Self { max_tokens_per_minute, max_budget_per_day_usd }
    }

    /// Token refill rate in tokens/second implied by the per-minute cap.
    pub fn refill_per_second(&self) -> f64 {
        self.max_tokens_per_minute / 60.0
    }
}

/// Live counters for one model (§3.3). `last_refill_ms` is the clock
/// reading the counters were last brought up to date at; the runtime's
/// rate limiter owns all mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelCounters {
    pub tokens_available: f64,
    pub budget_spent_usd_today: f64,
    pub last_refill_ms: u64,
}

impl ModelCounters {
    /// Fresh counters for a model: bucket starts full, no budget spent yet.
    pub fn fresh(config: &RateLimitConfig, now_ms: u64) -> Self {
        Self { tokens_available: config.max_tokens_per_minute, budget_spent_usd_today: 0.0, last_refill_ms: now_ms }
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
