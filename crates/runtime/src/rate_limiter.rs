// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The token-per-minute / daily-USD-budget rate limiter (§4.6).
//!
//! **Implementation note (this port).** Refill arithmetic is computed
//! lazily on every `reserve`/`settle` call from `clock.now()` deltas, behind
//! a `parking_lot::Mutex<HashMap<String, ModelCounters>>` keyed by model
//! name so per-model serialization is just per-entry locking. A single
//! background task performs only the UTC-midnight budget reset sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use maestro_core::{Clock, ModelCounters, RateLimitConfig};

use crate::error::RateLimitError;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Outcome of a [`RateLimiter::reserve`] call (§4.6 "`Reserve(model,
/// estimated_tokens) -> (granted, retry_after?)`").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReserveOutcome {
    Granted,
    Denied { retry_after_ms: u64 },
}

struct Inner<C: Clock> {
    clock: C,
    configs: HashMap<String, RateLimitConfig>,
    counters: Mutex<HashMap<String, ModelCounters>>,
}

/// Per-model token-bucket and daily-budget enforcer, shared by every
/// dispatcher instance and every agent (§4.6).
pub struct RateLimiter<C: Clock> {
    inner: Arc<Inner<C>>,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock + 'static> RateLimiter<C> {
    /// Construct a limiter configured with one [`RateLimitConfig`] per
    /// model, and start the midnight budget-reset task.
    pub fn new(clock: C, configs: HashMap<String, RateLimitConfig>) -> Self {
        let inner = Arc::new(Inner { clock, configs, counters: Mutex::new(HashMap::new()) });
        let reset_task = tokio::spawn(midnight_reset_loop(Arc::clone(&inner)));
        Self { inner, reset_task: Mutex::new(Some(reset_task)) }
    }

    /// Reserve `estimated_tokens` against `model`'s bucket, refilling first
    /// from elapsed wall-clock time (§4.6 steps i-iii).
    pub fn reserve(&self, model: &str, estimated_tokens: f64) -> Result<ReserveOutcome, RateLimitError> {
        let config = self.inner.configs.get(model).ok_or_else(|| RateLimitError::UnknownModel(model.to_string()))?;
        let now_ms = self.inner.clock.epoch_ms();

        let mut counters = self.inner.counters.lock();
        let entry = counters.entry(model.to_string()).or_insert_with(|| ModelCounters::fresh(config, now_ms));
        refill(entry, config, now_ms);

        let budget_ok = entry.budget_spent_usd_today < config.max_budget_per_day_usd;
        if entry.tokens_available >= estimated_tokens && budget_ok {
            entry.tokens_available -= estimated_tokens;
            return Ok(ReserveOutcome::Granted);
        }

        let tokens_needed = (estimated_tokens - entry.tokens_available).max(0.0);
        let refill_wait_ms = if config.refill_per_second() > 0.0 {
            ((tokens_needed / config.refill_per_second()) * 1000.0).ceil() as u64
        } else {
            u64::MAX
        };
        let retry_after_ms = if budget_ok {
            refill_wait_ms
        } else {
            // Budget exhausted for the day: nothing to do before midnight.
            next_midnight_ms(now_ms) - now_ms
        };

        Ok(ReserveOutcome::Denied { retry_after_ms })
    }

    /// Record the actual cost of a completed call (§4.6). The token delta is
    /// not refunded — only the USD budget is adjusted; reservations are
    /// pessimistic and intentionally not refunded on delivery failure (see
    /// DESIGN.md).
    pub fn settle(&self, model: &str, _actual_tokens: f64, actual_cost_usd: f64) -> Result<(), RateLimitError> {
        let config = self.inner.configs.get(model).ok_or_else(|| RateLimitError::UnknownModel(model.to_string()))?;
        let now_ms = self.inner.clock.epoch_ms();

        let mut counters = self.inner.counters.lock();
        let entry = counters.entry(model.to_string()).or_insert_with(|| ModelCounters::fresh(config, now_ms));
        refill(entry, config, now_ms);
        entry.budget_spent_usd_today += actual_cost_usd;
        Ok(())
    }

    /// Snapshot of a model's current counters, for tests and diagnostics.
    pub fn counters(&self, model: &str) -> Option<ModelCounters> {
        self.inner.counters.lock().get(model).copied()
    }

    /// Stop the midnight-reset background task.
    pub fn close(&self) {
        if let Some(handle) = self.reset_task.lock().take() {
            handle.abort();
        }
    }
}

impl<C: Clock> Drop for RateLimiter<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.reset_task.lock().take() {
            handle.abort();
        }
    }
}

fn refill(entry: &mut ModelCounters, config: &RateLimitConfig, now_ms: u64) {
    let elapsed_ms = now_ms.saturating_sub(entry.last_refill_ms);
    if elapsed_ms == 0 {
        return;
    }
    let refilled = config.refill_per_second() * (elapsed_ms as f64 / 1000.0);
    entry.tokens_available = (entry.tokens_available + refilled).min(config.max_tokens_per_minute);
    entry.last_refill_ms = now_ms;
}

fn next_midnight_ms(now_ms: u64) -> u64 {
    (now_ms / MS_PER_DAY + 1) * MS_PER_DAY
}

async fn midnight_reset_loop<C: Clock>(inner: Arc<Inner<C>>) {
    loop {
        let now_ms = inner.clock.epoch_ms();
        let wait_ms = next_midnight_ms(now_ms).saturating_sub(now_ms).max(1);
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        let mut counters = inner.counters.lock();
        for counter in counters.values_mut() {
            counter.budget_spent_usd_today = 0.0;
        }
        tracing::info!(models = counters.len(), "rate limiter budgets reset at UTC midnight");
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
