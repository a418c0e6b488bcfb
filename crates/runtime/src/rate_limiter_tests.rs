use super::*;
use maestro_core::FakeClock;
use std::time::Duration;

fn configs(max_tokens_per_minute: f64, max_budget_per_day_usd: f64) -> HashMap<String, RateLimitConfig> {
    let mut configs = HashMap::new();
    configs.insert("claude-sonnet".to_string(), RateLimitConfig::new(max_tokens_per_minute, max_budget_per_day_usd));
    configs
}

#[tokio::test]
async fn grants_reservations_within_the_bucket() {
    let limiter = RateLimiter::new(FakeClock::new(), configs(300.0, 100.0));
    for _ in 0..3 {
        assert_eq!(limiter.reserve("claude-sonnet", 100.0).unwrap(), ReserveOutcome::Granted);
    }
    limiter.close();
}

#[tokio::test]
async fn denies_once_the_bucket_is_exhausted_and_reports_retry_after() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(clock.clone(), configs(300.0, 100.0));
    for _ in 0..3 {
        limiter.reserve("claude-sonnet", 100.0).unwrap();
    }
    // S4: a 4th 100-token reservation within the same window must be denied.
    let outcome = limiter.reserve("claude-sonnet", 100.0).unwrap();
    assert!(matches!(outcome, ReserveOutcome::Denied { .. }));
    limiter.close();
}

#[tokio::test]
async fn refills_deterministically_as_the_clock_advances() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(clock.clone(), configs(300.0, 100.0));
    for _ in 0..3 {
        limiter.reserve("claude-sonnet", 100.0).unwrap();
    }
    assert!(matches!(limiter.reserve("claude-sonnet", 100.0).unwrap(), ReserveOutcome::Denied { .. }));

    // Full 60s elapses: the bucket should have refilled back to capacity.
    clock.advance(Duration::from_secs(60));
    assert_eq!(limiter.reserve("claude-sonnet", 100.0).unwrap(), ReserveOutcome::Granted);
    limiter.close();
}

#[tokio::test]
async fn denies_once_daily_budget_is_exhausted_even_with_tokens_available() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(clock.clone(), configs(1_000_000.0, 1.0));
    limiter.settle("claude-sonnet", 0.0, 1.0).unwrap();

    let outcome = limiter.reserve("claude-sonnet", 1.0).unwrap();
    assert!(matches!(outcome, ReserveOutcome::Denied { .. }));
    limiter.close();
}

#[tokio::test]
async fn settle_does_not_refund_reserved_tokens() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(clock, configs(300.0, 100.0));
    limiter.reserve("claude-sonnet", 100.0).unwrap();
    limiter.settle("claude-sonnet", 10.0, 0.01).unwrap();

    let counters = limiter.counters("claude-sonnet").expect("counters recorded");
    assert_eq!(counters.tokens_available, 200.0);
    limiter.close();
}

#[tokio::test]
async fn unknown_model_is_an_error() {
    let limiter = RateLimiter::new(FakeClock::new(), configs(300.0, 100.0));
    let err = limiter.reserve("unconfigured-model", 1.0).unwrap_err();
    assert!(matches!(err, RateLimitError::UnknownModel(name) if name == "unconfigured-model"));
    limiter.close();
}
