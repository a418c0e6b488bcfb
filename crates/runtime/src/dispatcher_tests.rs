use super::*;
use maestro_core::{AgentId, AgentType, FakeClock, MessagePayload, RateLimitConfig, SpecPayload, StoryPayload};
use maestro_storage::EventLogError;
use std::sync::Mutex as StdMutex;

#[derive(Default)]
struct RecordingSink {
    records: StdMutex<Vec<(EventDirection, MessageKind)>>,
}

impl EventLogSink for RecordingSink {
    fn record(&self, message: &Message, _recorded_at_ms: u64, direction: EventDirection) -> Result<(), EventLogError> {
        self.records.lock().unwrap().push((direction, message.kind()));
        Ok(())
    }
}

fn architect() -> AgentId {
    AgentId::new(AgentType::Architect, "0")
}

fn coder(n: &str) -> AgentId {
    AgentId::new(AgentType::Coder, n)
}

fn unlimited_configs() -> HashMap<String, RateLimitConfig> {
    let mut configs = HashMap::new();
    configs.insert("claude-sonnet".to_string(), RateLimitConfig::new(1_000_000.0, 1_000_000.0));
    configs
}

fn new_dispatcher() -> (Arc<Dispatcher<FakeClock>>, Arc<RecordingSink>, Arc<RateLimiter<FakeClock>>) {
    let clock = FakeClock::new();
    let rate_limiter = Arc::new(RateLimiter::new(clock.clone(), unlimited_configs()));
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = Dispatcher::new(Arc::clone(&rate_limiter), Arc::clone(&sink) as Arc<dyn EventLogSink>, clock, DispatcherConfig::default(), CancellationToken::new());
    (dispatcher, sink, rate_limiter)
}

#[tokio::test]
async fn dispatches_a_spec_message_to_the_attached_architect() {
    let (dispatcher, sink, rate_limiter) = new_dispatcher();
    let architect = architect();
    let mut inbox = dispatcher.attach(architect.clone(), "claude-sonnet").unwrap();

    let msg = Message::new(AgentId::supervisor(), architect.clone(), 0, MessagePayload::Spec(SpecPayload { content: "build a thing".into() })).unwrap();
    dispatcher.dispatch_message(msg.clone(), 10.0).await.unwrap();

    let delivered = tokio::time::timeout(Duration::from_secs(1), inbox.recv()).await.unwrap().unwrap();
    assert_eq!(delivered.id, msg.id);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let records = sink.records.lock().unwrap();
    assert!(records.contains(&(EventDirection::Sent, MessageKind::Spec)));
    assert!(records.contains(&(EventDirection::Delivered, MessageKind::Spec)));
    rate_limiter.close();
}

#[tokio::test]
async fn dispatch_to_unattached_recipient_is_rejected() {
    let (dispatcher, _sink, rate_limiter) = new_dispatcher();
    let msg = Message::new(AgentId::supervisor(), coder("1"), 0, MessagePayload::Story(StoryPayload { content: "x".into(), requirements: vec![], story_id: "s1".into() })).unwrap();

    let err = dispatcher.dispatch_message(msg, 10.0).await.unwrap_err();
    assert!(matches!(err, DispatchError::NoSuchRecipient(id) if id == coder("1")));
    rate_limiter.close();
}

#[tokio::test]
async fn detaching_an_agent_bounces_pending_messages_as_error() {
    let (dispatcher, _sink, rate_limiter) = new_dispatcher();
    let architect = architect();
    let mut architect_inbox = dispatcher.attach(architect.clone(), "claude-sonnet").unwrap();
    let coder_id = coder("1");
    let _coder_inbox = dispatcher.attach(coder_id.clone(), "claude-sonnet").unwrap();

    let msg = Message::new(architect.clone(), coder_id.clone(), 0, MessagePayload::Story(StoryPayload { content: "x".into(), requirements: vec![], story_id: "s1".into() })).unwrap();
    dispatcher.detach(&coder_id);
    dispatcher.dispatch_message(msg, 10.0).await.unwrap_err();

    let bounced = tokio::time::timeout(Duration::from_secs(1), architect_inbox.recv()).await.unwrap().unwrap();
    assert_eq!(bounced.kind(), MessageKind::Error);
    rate_limiter.close();
}

#[tokio::test]
async fn send_requeue_addresses_the_registered_architect() {
    let (dispatcher, _sink, rate_limiter) = new_dispatcher();
    let architect = architect();
    dispatcher.set_architect(architect.clone());
    let mut architect_inbox = dispatcher.attach(architect.clone(), "claude-sonnet").unwrap();
    let coder_id = coder("1");

    dispatcher.send_requeue(coder_id.clone(), "story-42", "timed out").await.unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(1), architect_inbox.recv()).await.unwrap().unwrap();
    assert_eq!(msg.kind(), MessageKind::Requeue);
    assert_eq!(msg.metadata.get("story_id").map(String::as_str), Some("story-42"));
    rate_limiter.close();
}

#[tokio::test]
async fn subscribers_observe_published_terminal_notifications() {
    let (dispatcher, _sink, rate_limiter) = new_dispatcher();
    let mut rx = dispatcher.subscribe_terminal();
    let coder_id = coder("1");
    dispatcher.publish_terminal(coder_id.clone(), TerminalState::Done, HashMap::new());

    let notification = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(notification.agent_id, coder_id);
    assert_eq!(notification.state, TerminalState::Done);
    rate_limiter.close();
}

#[tokio::test]
async fn dispatch_message_reports_rate_limit_denial_when_deadline_is_short() {
    let clock = FakeClock::new();
    let mut configs = HashMap::new();
    configs.insert("claude-sonnet".to_string(), RateLimitConfig::new(1.0, 100.0));
    let rate_limiter = Arc::new(RateLimiter::new(clock.clone(), configs));
    let sink = Arc::new(RecordingSink::default());
    let mut cfg = DispatcherConfig::default();
    cfg.rate_limit_wait = Duration::from_millis(1);
    let dispatcher = Dispatcher::new(Arc::clone(&rate_limiter), sink as Arc<dyn EventLogSink>, clock, cfg, CancellationToken::new());

    let architect = architect();
    let _inbox = dispatcher.attach(architect.clone(), "claude-sonnet").unwrap();
    // Exhaust the tiny bucket.
    rate_limiter.reserve("claude-sonnet", 1.0).unwrap();

    let msg = Message::new(AgentId::supervisor(), architect, 0, MessagePayload::Spec(SpecPayload { content: "x".into() })).unwrap();
    let err = dispatcher.dispatch_message(msg, 100.0).await.unwrap_err();
    assert!(matches!(err, DispatchError::RateLimitDenied(_)));
    rate_limiter.close();
}
