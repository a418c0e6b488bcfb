use super::*;
use tokio::time;

struct ScriptedProcess {
    lines: std::collections::VecDeque<String>,
    killed: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[async_trait]
impl LlmProcess for ScriptedProcess {
    async fn next_line(&mut self) -> Result<Option<String>, LlmRunnerError> {
        Ok(self.lines.pop_front())
    }

    async fn kill(&mut self) {
        self.killed.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

struct ScriptedSource {
    lines: Vec<String>,
    killed: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl LlmProcessSource for ScriptedSource {
    fn spawn(&self, _invocation: &LlmInvocation, _session_id: &str) -> Result<Box<dyn LlmProcess>, LlmRunnerError> {
        Ok(Box::new(ScriptedProcess { lines: self.lines.clone().into(), killed: std::sync::Arc::clone(&self.killed) }))
    }
}

/// A process that never produces a line and never terminates on its own —
/// exercises the inactivity monitor (S5-style).
struct SilentProcess;
#[async_trait]
impl LlmProcess for SilentProcess {
    async fn next_line(&mut self) -> Result<Option<String>, LlmRunnerError> {
        std::future::pending().await
    }
    async fn kill(&mut self) {}
}

struct SilentSource;
impl LlmProcessSource for SilentSource {
    fn spawn(&self, _invocation: &LlmInvocation, _session_id: &str) -> Result<Box<dyn LlmProcess>, LlmRunnerError> {
        Ok(Box::new(SilentProcess))
    }
}

fn invocation() -> LlmInvocation {
    let mut inv = LlmInvocation::new("maestro-coder-1", "claude-sonnet", "/tmp/mcp.json", "do the thing");
    inv.total_timeout = Duration::from_secs(5);
    inv.inactivity_timeout = Duration::from_millis(50);
    inv
}

fn done_event() -> String {
    serde_json::json!({
        "type": "assistant",
        "message": {"content": [{"type": "tool_use", "name": "maestro_done", "input": {"summary": "all finished"}}]}
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn extracts_done_signal_from_a_signal_tool_call() {
    let source = ScriptedSource { lines: vec![done_event()], killed: Default::default() };
    let runner = LlmRunner::new(Box::new(source));
    let result = runner.run(invocation(), CancellationToken::new()).await.unwrap();
    assert!(matches!(result.signal, Signal::Done));
    assert_eq!(result.summary.as_deref(), Some("all finished"));
    assert_eq!(result.response_count, 1);
}

#[tokio::test(start_paused = true)]
async fn completing_without_a_signal_tool_is_an_error() {
    let line = serde_json::json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "hi"}]}}).to_string();
    let source = ScriptedSource { lines: vec![line], killed: Default::default() };
    let runner = LlmRunner::new(Box::new(source));
    let result = runner.run(invocation(), CancellationToken::new()).await.unwrap();
    assert!(matches!(result.signal, Signal::Error));
    assert_eq!(result.error.as_deref(), Some("completed without calling a signal tool"));
}

#[tokio::test(start_paused = true)]
async fn an_explicit_error_event_is_surfaced_verbatim() {
    let line = serde_json::json!({"type": "error", "message": "the model refused"}).to_string();
    let source = ScriptedSource { lines: vec![line], killed: Default::default() };
    let runner = LlmRunner::new(Box::new(source));
    let result = runner.run(invocation(), CancellationToken::new()).await.unwrap();
    assert!(matches!(result.signal, Signal::Error));
    assert_eq!(result.error.as_deref(), Some("the model refused"));
}

#[tokio::test(start_paused = true)]
async fn a_silent_subprocess_is_killed_on_inactivity_timeout() {
    let runner = LlmRunner::new(Box::new(SilentSource));
    let handle = tokio::spawn(async move { runner.run(invocation(), CancellationToken::new()).await });
    time::advance(Duration::from_millis(100)).await;
    let result = handle.await.unwrap().unwrap();
    assert!(matches!(result.signal, Signal::Inactivity));
}

#[tokio::test(start_paused = true)]
async fn a_silent_subprocess_eventually_hits_the_total_timeout_if_inactivity_never_fires() {
    let mut inv = invocation();
    inv.inactivity_timeout = Duration::from_secs(3600); // longer than total_timeout
    let runner = LlmRunner::new(Box::new(SilentSource));
    let handle = tokio::spawn(async move { runner.run(inv, CancellationToken::new()).await });
    time::advance(Duration::from_secs(6)).await;
    let result = handle.await.unwrap().unwrap();
    assert!(matches!(result.signal, Signal::Timeout));
}

#[tokio::test(start_paused = true)]
async fn external_cancellation_stops_the_run_and_kills_the_process() {
    let killed = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let source = ScriptedSource { lines: vec![], killed: std::sync::Arc::clone(&killed) };
    let runner = LlmRunner::new(Box::new(source));
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let handle = tokio::spawn(async move { runner.run(invocation(), cancel_clone).await });
    cancel.cancel();
    let result = handle.await.unwrap().unwrap();
    assert!(matches!(result.signal, Signal::Timeout));
}
