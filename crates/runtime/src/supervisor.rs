// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owns agent lifecycle: bootstraps drivers via an injected agent factory,
//! watches terminal notifications, and applies the fixed restart-policy
//! matrix (§4.7).
//!
//! **Implementation note (this port).** The restart-policy matrix is a
//! plain `match`, not a runtime-configurable table — the matrix is fixed
//! and overriding it is out of scope. The supervisor
//! subscribes to `Dispatcher::subscribe_terminal` at construction time,
//! before any agent is attached, and runs a single task looping on that
//! receiver; this loop is the supervisor's one coordination point, so no
//! two restart actions for the same agent race each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use maestro_core::{AgentId, AgentType, Clock, TerminalState};
use maestro_executor::ContainerExecutor;

use crate::dispatcher::Dispatcher;
use crate::error::SupervisorError;

/// The outcome of applying the restart-policy matrix to one terminal
/// notification (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartAction {
    RestartAgent,
    FatalShutdown,
    RestartAndRequeue,
}

/// Pure function over the fixed restart-policy matrix (§4.7):
///
/// | Agent     | DONE         | ERROR              |
/// |-----------|--------------|---------------------|
/// | Coder     | RestartAgent | RestartAndRequeue    |
/// | Architect | RestartAgent | FatalShutdown        |
/// | PM        | RestartAgent | FatalShutdown        |
pub fn restart_action(agent_type: AgentType, terminal: TerminalState) -> RestartAction {
    match (agent_type, terminal) {
        (_, TerminalState::Done) => RestartAction::RestartAgent,
        (AgentType::Coder, TerminalState::Error) => RestartAction::RestartAndRequeue,
        (AgentType::Architect | AgentType::Pm, TerminalState::Error) => RestartAction::FatalShutdown,
        (AgentType::Supervisor, _) => RestartAction::FatalShutdown,
    }
}

/// A running driver task, as produced by [`AgentFactory::new_agent`].
pub struct RunningAgent {
    pub cancel: CancellationToken,
    pub join: JoinHandle<()>,
}

/// External collaborator that configures and starts one agent's driver
/// (§6 "Agent factory"): model selection, work directories, LLM factory,
/// and dispatcher attachment are all its responsibility. Agent-specific
/// state graphs are out of scope here (§1); a production `maestro-*`
/// deployment supplies its own implementation.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn new_agent(&self, agent_id: AgentId, agent_type: AgentType, cancel: CancellationToken) -> Result<RunningAgent, SupervisorError>;
}

struct Attached {
    agent_type: AgentType,
    cancel: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

/// Owns agent lifecycle (§4.7).
pub struct Supervisor<C: Clock> {
    dispatcher: Arc<Dispatcher<C>>,
    executor: Arc<dyn ContainerExecutor>,
    factory: Arc<dyn AgentFactory>,
    agents: Mutex<HashMap<AgentId, Attached>>,
    cancel: CancellationToken,
    shutdown_deadline: Duration,
    restart_loop: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock + 'static> Supervisor<C> {
    pub fn new(
        dispatcher: Arc<Dispatcher<C>>,
        executor: Arc<dyn ContainerExecutor>,
        factory: Arc<dyn AgentFactory>,
        shutdown_deadline: Duration,
    ) -> Arc<Self> {
        let supervisor = Arc::new(Self {
            dispatcher,
            executor,
            factory,
            agents: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            shutdown_deadline,
            restart_loop: Mutex::new(None),
        });

        // Subscribe before any agent is attached (§4.7 "Bootstrapping").
        let terminal_rx = supervisor.dispatcher.subscribe_terminal();
        let task = tokio::spawn(Arc::clone(&supervisor).run_restart_loop(terminal_rx));
        *supervisor.restart_loop.lock() = Some(task);
        supervisor
    }

    /// Start (or restart) one agent and register it.
    pub async fn attach_agent(&self, agent_id: AgentId, agent_type: AgentType) -> Result<(), SupervisorError> {
        let child_cancel = self.cancel.child_token();
        let running = self.factory.new_agent(agent_id.clone(), agent_type, child_cancel.clone()).await?;
        self.agents.lock().insert(agent_id, Attached { agent_type, cancel: child_cancel, join: Mutex::new(Some(running.join)) });
        Ok(())
    }

    async fn run_restart_loop(self: Arc<Self>, mut terminal_rx: tokio::sync::broadcast::Receiver<crate::dispatcher::TerminalNotification>) {
        loop {
            let notification = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                n = terminal_rx.recv() => match n {
                    Ok(n) => n,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "supervisor missed terminal notifications (lagged)");
                        continue;
                    }
                },
            };

            let Some(agent_type) = self.agents.lock().get(&notification.agent_id).map(|a| a.agent_type) else {
                tracing::warn!(agent_id = %notification.agent_id, "terminal notification for an agent we never attached");
                continue;
            };

            let action = restart_action(agent_type, notification.state);
            tracing::info!(agent_id = %notification.agent_id, ?action, state = ?notification.state, "applying restart policy");

            match action {
                RestartAction::RestartAgent => {
                    if let Err(err) = self.restart_agent(&notification.agent_id, agent_type).await {
                        tracing::error!(agent_id = %notification.agent_id, error = %err, "failed to restart agent");
                    }
                }
                RestartAction::RestartAndRequeue => {
                    let reason = notification.context.get("error").cloned().unwrap_or_else(|| "agent reached ERROR".to_string());
                    let story_id = notification.context.get("story_id").cloned().unwrap_or_default();
                    if let Err(err) = self.dispatcher.send_requeue(notification.agent_id.clone(), story_id, reason).await {
                        tracing::error!(agent_id = %notification.agent_id, error = %err, "failed to send requeue");
                    }
                    if let Err(err) = self.restart_agent(&notification.agent_id, agent_type).await {
                        tracing::error!(agent_id = %notification.agent_id, error = %err, "failed to restart agent after requeue");
                    }
                }
                RestartAction::FatalShutdown => {
                    self.fatal_shutdown().await;
                    break;
                }
            }
        }
    }

    async fn restart_agent(&self, agent_id: &AgentId, agent_type: AgentType) -> Result<(), SupervisorError> {
        let _ = self.executor.stop_container(agent_id).await;
        if let Some(attached) = self.agents.lock().remove(agent_id) {
            attached.cancel.cancel();
            if let Some(join) = attached.join.lock().take() {
                let _ = join.await;
            }
        }
        self.dispatcher.detach(agent_id);
        self.attach_agent(agent_id.clone(), agent_type).await
    }

    /// Tear down every attached agent: SHUTDOWN, wait (bounded), stop
    /// containers, stop the dispatcher (§4.7 "FatalShutdown").
    async fn fatal_shutdown(&self) {
        tracing::error!("fatal shutdown triggered");
        let agent_ids: Vec<AgentId> = self.agents.lock().keys().cloned().collect();

        for agent_id in &agent_ids {
            let supervisor_id = AgentId::supervisor();
            let msg = maestro_core::Message::new(
                supervisor_id,
                agent_id.clone(),
                0,
                maestro_core::MessagePayload::Shutdown(maestro_core::ShutdownPayload {}),
            );
            if let Ok(msg) = msg {
                if let Err(err) = self.dispatcher.dispatch_message(msg, 0.0).await {
                    tracing::warn!(%agent_id, error = %err, "failed to dispatch shutdown");
                }
            }
        }

        for agent_id in &agent_ids {
            let join_handle = self.agents.lock().get(agent_id).and_then(|a| a.join.lock().take());
            if let Some(join) = join_handle {
                if tokio::time::timeout(self.shutdown_deadline, join).await.is_err() {
                    tracing::warn!(%agent_id, "shutdown deadline elapsed");
                }
            }
            let _ = self.executor.stop_container(agent_id).await;
        }

        self.agents.lock().clear();
        self.cancel.cancel();
    }

    /// External trigger for an orderly full shutdown (e.g. SIGTERM).
    pub async fn shutdown(&self) {
        self.fatal_shutdown().await;
    }
}

impl<C: Clock> Drop for Supervisor<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.restart_loop.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
