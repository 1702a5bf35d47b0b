//! Streaming event orchestrator.
//!
//! [`Orchestrator::attach`] subscribes to one run's event stream and turns it
//! into Step Log mutations for a single message. Each run is driven by its
//! own task: events are handled strictly in order, a handler's store work
//! settles before the next event is read, and [`RunHandle::abort`] stops the
//! run between events.

pub mod context;
pub mod control;
pub mod guard;
pub mod types;
pub mod watchdog;

pub use context::{render_snapshot, Flow, RunContext, RunPhase};
pub use control::{ConversationLookup, NoopControl, RunControl, ToolOutputSink, UserTurn};
pub use guard::ToolCallGuard;
pub use types::*;
pub use watchdog::IdleWatchdog;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{Result, StepStreamError};
use crate::store::StepStore;
use crate::stream::EventStream;

/// Cloneable abort control for an in-flight run.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Ask the run to stop. Returns `false` if it was already asked.
    pub fn abort(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Handle for an in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    message_id: String,
    abort: AbortHandle,
    result_rx: oneshot::Receiver<RunResult>,
    unresponsive: watch::Receiver<bool>,
    shared_context: Option<UserTurn>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Stop the run. The event being handled finishes; nothing after it is applied.
    pub fn abort(&self) -> bool {
        self.abort.abort()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Whether the message is currently flagged as unresponsive.
    pub fn is_unresponsive(&self) -> bool {
        *self.unresponsive.borrow()
    }

    /// Subscribe to the unresponsive flag.
    pub fn unresponsive(&self) -> watch::Receiver<bool> {
        self.unresponsive.clone()
    }

    /// The prior user turn recovered when the run was attached.
    pub fn shared_context(&self) -> Option<&UserTurn> {
        self.shared_context.as_ref()
    }

    pub async fn wait(self) -> RunResult {
        self.result_rx
            .await
            .unwrap_or_else(|_| RunResult::canceled())
    }
}

/// Attaches run streams to per-message Step Logs.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn StepStore>,
    config: OrchestratorConfig,
    control: Arc<dyn RunControl>,
    lookup: Option<Arc<dyn ConversationLookup>>,
    step_sink: Option<StepEventSink>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn StepStore>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            config,
            control: Arc::new(NoopControl),
            lookup: None,
            step_sink: None,
        }
    }

    pub fn with_control(mut self, control: Arc<dyn RunControl>) -> Self {
        self.control = control;
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn ConversationLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_step_sink(mut self, sink: StepEventSink) -> Self {
        self.step_sink = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<dyn StepStore> {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Subscribe to a run's events for `message_id`.
    ///
    /// The message must already be registered with the store. The returned
    /// handle owns the abort control, the unresponsive flag, and the result.
    pub async fn attach(&self, message_id: impl Into<String>, stream: EventStream) -> Result<RunHandle> {
        let message_id = message_id.into();
        let existing = self.store.steps(&message_id).await?.len();
        let run_id = Uuid::new_v4();

        let (watchdog, unresponsive) = if existing == 0 {
            IdleWatchdog::arm(self.config.idle_timeout, self.store.clone(), message_id.clone())
        } else {
            IdleWatchdog::disarmed()
        };

        let shared_context = match &self.lookup {
            Some(lookup) => lookup.find_last_user_turn(&message_id).await,
            None => None,
        };

        let context = RunContext::new(
            run_id,
            message_id.clone(),
            self.store.clone(),
            self.control.clone(),
            self.config.tool_call_limit,
        )
        .with_watchdog(watchdog)
        .with_step_sink(self.step_sink.clone());

        let token = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();
        let task_token = token.clone();
        tokio::spawn(async move {
            tracing::debug!(run_id = %run_id, message_id = %context.message_id(), "run attached");
            let result = drive(context, stream, task_token).await;
            let _ = result_tx.send(result);
        });

        Ok(RunHandle {
            run_id,
            message_id,
            abort: AbortHandle { token },
            result_rx,
            unresponsive,
            shared_context,
        })
    }
}

/// Consume `stream` until a terminal event, an error, the end of the stream,
/// or cancellation. The stream is dropped on every exit path.
pub async fn drive(mut context: RunContext, mut stream: EventStream, cancel: CancellationToken) -> RunResult {
    let result = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break RunResult::canceled(),
            next = stream.next() => next,
        };
        // Events buffered behind an abort must not reach the Step Log.
        if cancel.is_cancelled() {
            break RunResult::canceled();
        }
        let Some(item) = next else {
            break RunResult::completed();
        };
        let outcome = match item {
            Ok(event) => context.handle(event).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(Flow::Continue) => {}
            Ok(Flow::Finish(result)) => break result,
            Err(err) => {
                if let Err(close_err) = context.close_open_step().await {
                    tracing::warn!(
                        run_id = %context.run_id(),
                        message_id = %context.message_id(),
                        error = %close_err,
                        "could not complete the open message step"
                    );
                }
                break fatal_result(&context, err);
            }
        }
    };
    drop(stream);

    let result = context.finish(result);
    tracing::debug!(
        run_id = %context.run_id(),
        message_id = %context.message_id(),
        status = ?result.status,
        steps = result.steps_created,
        "run finished"
    );
    context.control().run_finished(context.message_id(), &result);
    result
}

fn fatal_result(context: &RunContext, err: StepStreamError) -> RunResult {
    tracing::warn!(
        run_id = %context.run_id(),
        message_id = %context.message_id(),
        error = %err,
        "run failed"
    );
    RunResult::fatal(&err)
}

#[cfg(test)]
mod tests;
