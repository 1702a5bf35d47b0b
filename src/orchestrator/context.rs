//! Per-run dispatcher state and event handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::control::RunControl;
use super::guard::ToolCallGuard;
use super::types::{RunId, RunResult, StepChange, StepEvent, StepEventSink};
use super::watchdog::IdleWatchdog;
use crate::error::{Result, SerializedError, StepStreamError};
use crate::store::{StepPatch, StepStore};
use crate::types::{
    MessageContent, MessageContentPart, NewStep, RunStreamEvent, StreamEvent, ThreadMessage,
    ToolCall, RUN_FAILED_EVENT, RUN_REQUIRES_ACTION_EVENT,
};

const RUN_FAILED_MESSAGE: &str = "Thread run failed";

/// Where the run is in the message lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// No message step is open.
    Idle,
    /// A message step is open and receiving deltas.
    Streaming { step_id: String },
}

/// What the driver should do after an event.
#[derive(Debug)]
pub enum Flow {
    Continue,
    Finish(RunResult),
}

/// Mutable state of one run, handed to every handler.
pub struct RunContext {
    run_id: RunId,
    message_id: String,
    store: Arc<dyn StepStore>,
    control: Arc<dyn RunControl>,
    guard: ToolCallGuard,
    phase: RunPhase,
    steps_created: usize,
    watchdog: Option<IdleWatchdog>,
    emitter: StepEventEmitter,
}

impl RunContext {
    pub fn new(
        run_id: RunId,
        message_id: impl Into<String>,
        store: Arc<dyn StepStore>,
        control: Arc<dyn RunControl>,
        tool_call_limit: usize,
    ) -> Self {
        Self {
            run_id,
            message_id: message_id.into(),
            store,
            control,
            guard: ToolCallGuard::new(tool_call_limit),
            phase: RunPhase::Idle,
            steps_created: 0,
            watchdog: None,
            emitter: StepEventEmitter::new(run_id, None),
        }
    }

    pub fn with_watchdog(mut self, watchdog: IdleWatchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn with_step_sink(mut self, sink: Option<StepEventSink>) -> Self {
        self.emitter = StepEventEmitter::new(self.run_id, sink);
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn current_message_step(&self) -> Option<&str> {
        match &self.phase {
            RunPhase::Streaming { step_id } => Some(step_id),
            RunPhase::Idle => None,
        }
    }

    pub fn tool_calls(&self) -> usize {
        self.guard.count()
    }

    pub fn steps_created(&self) -> usize {
        self.steps_created
    }

    pub fn control(&self) -> &Arc<dyn RunControl> {
        &self.control
    }

    /// Attach the step count to a terminal result.
    pub fn finish(&self, result: RunResult) -> RunResult {
        result.with_steps_created(self.steps_created)
    }

    /// Complete the open message step, if any, and return to idle.
    pub async fn close_open_step(&mut self) -> Result<()> {
        let RunPhase::Streaming { step_id } = std::mem::replace(&mut self.phase, RunPhase::Idle)
        else {
            return Ok(());
        };
        self.store.complete_step(&self.message_id, &step_id).await?;
        self.emitter.emit(&self.message_id, &step_id, StepChange::Completed);
        Ok(())
    }

    /// Apply one event to the Step Log.
    ///
    /// Errors are fatal for the run; the caller turns them into a failed result.
    pub async fn handle(&mut self, event: StreamEvent) -> Result<Flow> {
        tracing::debug!(
            run_id = %self.run_id,
            message_id = %self.message_id,
            event = event.name(),
            "stream event"
        );
        match event {
            StreamEvent::MessageCreated(message) => self.on_message_created(&message).await,
            StreamEvent::MessageDelta { snapshot, .. } => self.on_message_delta(&snapshot).await,
            StreamEvent::MessageDone(_) => self.on_message_done().await,
            StreamEvent::TextDone(_) | StreamEvent::ImageFileDone(_) => Ok(Flow::Continue),
            StreamEvent::ToolCallDone(call) => self.on_tool_call_done(&call).await,
            StreamEvent::Event(event) => self.on_run_event(&event).await,
            StreamEvent::Abort => Ok(Flow::Finish(RunResult::canceled())),
            StreamEvent::Error { message } => {
                tracing::warn!(
                    run_id = %self.run_id,
                    message_id = %self.message_id,
                    error = %message,
                    "stream reported an error"
                );
                self.control.stream_error(&self.message_id, &message);
                Ok(Flow::Continue)
            }
            StreamEvent::End => Ok(Flow::Finish(RunResult::completed())),
        }
    }

    async fn on_message_created(&mut self, message: &ThreadMessage) -> Result<Flow> {
        if let RunPhase::Streaming { step_id } = &self.phase {
            tracing::warn!(
                run_id = %self.run_id,
                previous_step = %step_id,
                provider_message = %message.id,
                "message created while another message step is open"
            );
        }
        let step_id = self.append(NewStep::message()).await?;
        self.phase = RunPhase::Streaming { step_id };
        Ok(Flow::Continue)
    }

    async fn on_message_delta(&mut self, snapshot: &ThreadMessage) -> Result<Flow> {
        let RunPhase::Streaming { step_id } = &self.phase else {
            return Err(StepStreamError::InvalidState(
                "message delta without an open message step".to_string(),
            ));
        };
        let step_id = step_id.clone();
        let messages = render_snapshot(snapshot)?;
        self.store
            .update_step(&self.message_id, &step_id, StepPatch::Messages(messages))
            .await?;
        self.emitter.emit(&self.message_id, &step_id, StepChange::Updated);
        Ok(Flow::Continue)
    }

    async fn on_message_done(&mut self) -> Result<Flow> {
        if self.phase == RunPhase::Idle {
            tracing::warn!(
                run_id = %self.run_id,
                message_id = %self.message_id,
                "message done without an open message step"
            );
            return Ok(Flow::Continue);
        }
        self.close_open_step().await?;
        Ok(Flow::Continue)
    }

    async fn on_tool_call_done(&mut self, call: &ToolCall) -> Result<Flow> {
        let count = self.guard.record().map_err(|err| {
            tracing::warn!(
                run_id = %self.run_id,
                message_id = %self.message_id,
                limit = self.guard.limit(),
                "tool call limit exceeded"
            );
            err
        })?;

        if !call.is_function() {
            tracing::debug!(
                run_id = %self.run_id,
                call_id = %call.id,
                kind = ?call.kind,
                "skipping non-function tool call"
            );
            return Ok(Flow::Continue);
        }
        let function = call
            .function
            .as_ref()
            .ok_or_else(|| StepStreamError::MalformedToolCall {
                call_id: call.id.clone(),
            })?;

        let parameters: serde_json::Value = serde_json::from_str(&function.arguments).map_err(
            |source| StepStreamError::InvalidToolArguments {
                call_id: call.id.clone(),
                source,
            },
        )?;
        let step_id = self
            .append(NewStep::tool(call.id.clone(), function.name.clone(), parameters))
            .await?;
        tracing::debug!(
            run_id = %self.run_id,
            step_id = %step_id,
            tool = %function.name,
            count,
            "tool step created"
        );
        Ok(Flow::Continue)
    }

    async fn on_run_event(&mut self, event: &RunStreamEvent) -> Result<Flow> {
        match event.event.as_str() {
            RUN_FAILED_EVENT => {
                let stack = SerializedError::from_payload(&event.data);
                let error = if stack.message.is_empty() {
                    RUN_FAILED_MESSAGE.to_string()
                } else {
                    format!("{RUN_FAILED_MESSAGE}: {}", stack.message)
                };
                self.close_open_step().await?;
                self.append(NewStep::error(RUN_FAILED_MESSAGE, stack)).await?;
                self.guard.reset();
                tracing::warn!(run_id = %self.run_id, message_id = %self.message_id, "run failed");
                Ok(Flow::Finish(RunResult::reported_failure(error)))
            }
            RUN_REQUIRES_ACTION_EVENT => {
                let count = event
                    .required_tool_calls()
                    .map(|calls| calls.iter().filter(|call| call.is_function()).count())
                    .unwrap_or(0);
                if count > 0 {
                    self.control.function_calls_required(&self.message_id, count);
                }
                Ok(Flow::Continue)
            }
            other => {
                tracing::debug!(run_id = %self.run_id, event = other, "ignoring run event");
                Ok(Flow::Continue)
            }
        }
    }

    async fn append(&mut self, step: NewStep) -> Result<String> {
        let step_id = self.store.add_step(&self.message_id, step).await?;
        self.steps_created += 1;
        if let Some(watchdog) = &self.watchdog {
            watchdog.step_appended();
        }
        self.emitter.emit(&self.message_id, &step_id, StepChange::Added);
        Ok(step_id)
    }
}

/// Render a provider message snapshot into step content.
///
/// Only text parts are renderable; anything else is a fatal content error.
pub fn render_snapshot(snapshot: &ThreadMessage) -> Result<Vec<MessageContent>> {
    snapshot
        .content
        .iter()
        .map(|part| match part {
            MessageContentPart::Text { text } => Ok(MessageContent::raw_text(text.clone())),
            other => Err(StepStreamError::UnsupportedContent(other.kind().to_string())),
        })
        .collect()
}

struct StepEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<StepEventSink>,
}

impl StepEventEmitter {
    fn new(run_id: RunId, sink: Option<StepEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    fn emit(&self, message_id: &str, step_id: &str, change: StepChange) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(StepEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            message_id: message_id.to_string(),
            step_id: step_id.to_string(),
            change,
        });
    }
}
