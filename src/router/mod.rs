//! Step content router.
//!
//! Classifies a stored step by its type and, for workflow and action steps,
//! by the nested `type` discriminant, then hands it to the matching method of
//! a [`StepConsumer`]. Nested kinds without a dedicated handler fall back to a
//! generic rendering of the whole step.

pub mod render;

pub use render::{render_generic, TextRenderer};

use serde::Serialize;

use crate::error::Result;
use crate::orchestrator::UserTurn;
use crate::types::{
    ActionKind, ActionStepParams, ErrorStepParams, MessageStepParams, Step, StepContent,
    ToolStepParams, WorkflowKind, WorkflowStepParams,
};

/// Classification of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route<'a> {
    Message(&'a MessageStepParams),
    Tool(&'a ToolStepParams),
    SearchWorkflow(&'a WorkflowStepParams),
    QaWorkflow(&'a WorkflowStepParams),
    SearchAction(&'a ActionStepParams),
    QaAction(&'a ActionStepParams),
    FileAction(&'a ActionStepParams),
    RetryAction(&'a ActionStepParams),
    Error(&'a ErrorStepParams),
    /// No dedicated handler for the nested kind.
    Generic,
}

impl Route<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Tool(_) => "tool",
            Self::SearchWorkflow(_) => "search_workflow",
            Self::QaWorkflow(_) => "qa_workflow",
            Self::SearchAction(_) => "search_action",
            Self::QaAction(_) => "qa_action",
            Self::FileAction(_) => "file_action",
            Self::RetryAction(_) => "retry_action",
            Self::Error(_) => "error",
            Self::Generic => "generic",
        }
    }
}

/// Classify `step` without rendering it.
pub fn classify(step: &Step) -> Route<'_> {
    match &step.content {
        StepContent::Message(params) => Route::Message(params),
        StepContent::Tool(params) => Route::Tool(params),
        StepContent::Workflow(params) => match params.workflow.kind() {
            WorkflowKind::Search => Route::SearchWorkflow(params),
            WorkflowKind::Qa => Route::QaWorkflow(params),
            WorkflowKind::Other(_) => Route::Generic,
        },
        StepContent::Action(params) => match params.action.kind() {
            ActionKind::Search => Route::SearchAction(params),
            ActionKind::Qa => Route::QaAction(params),
            ActionKind::File => Route::FileAction(params),
            ActionKind::Retry => Route::RetryAction(params),
            ActionKind::Other(_) => Route::Generic,
        },
        StepContent::Error(params) => Route::Error(params),
    }
}

/// Scroll capabilities of the surface rendering a message.
pub trait ScrollControl: Send + Sync {
    fn scroll_to_end(&self) {}
    fn pause_scroll(&self) {}
    fn resume_scroll(&self) {}
}

/// Surface without scrolling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScroll;

impl ScrollControl for NoScroll {}

/// Per-message context handed to every consumer call.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    pub message_id: &'a str,
    /// Shared context of the user turn that prompted the message.
    pub shared_context: Option<&'a UserTurn>,
    pub scroll: &'a dyn ScrollControl,
}

impl<'a> RouteContext<'a> {
    pub fn new(message_id: &'a str) -> Self {
        Self {
            message_id,
            shared_context: None,
            scroll: &NoScroll,
        }
    }

    pub fn with_shared_context(mut self, shared_context: Option<&'a UserTurn>) -> Self {
        self.shared_context = shared_context;
        self
    }

    pub fn with_scroll(mut self, scroll: &'a dyn ScrollControl) -> Self {
        self.scroll = scroll;
        self
    }
}

/// Per-kind step handlers.
pub trait StepConsumer {
    type Output;

    fn message(&mut self, step: &Step, params: &MessageStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn tool(&mut self, step: &Step, params: &ToolStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn search_workflow(&mut self, step: &Step, params: &WorkflowStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn qa_workflow(&mut self, step: &Step, params: &WorkflowStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn search_action(&mut self, step: &Step, params: &ActionStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn qa_action(&mut self, step: &Step, params: &ActionStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn file_action(&mut self, step: &Step, params: &ActionStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn retry_action(&mut self, step: &Step, params: &ActionStepParams, cx: &RouteContext<'_>) -> Self::Output;

    fn error(&mut self, step: &Step, params: &ErrorStepParams, cx: &RouteContext<'_>) -> Self::Output;

    /// Fallback for nested kinds without a handler; `rendered` is the
    /// pretty-printed JSON of the whole step.
    fn generic(&mut self, step: &Step, rendered: String, cx: &RouteContext<'_>) -> Self::Output;
}

/// Dispatch `step` to the consumer method matching its classification.
pub fn route<C: StepConsumer>(step: &Step, consumer: &mut C, cx: &RouteContext<'_>) -> Result<C::Output> {
    let output = match classify(step) {
        Route::Message(params) => consumer.message(step, params, cx),
        Route::Tool(params) => consumer.tool(step, params, cx),
        Route::SearchWorkflow(params) => consumer.search_workflow(step, params, cx),
        Route::QaWorkflow(params) => consumer.qa_workflow(step, params, cx),
        Route::SearchAction(params) => consumer.search_action(step, params, cx),
        Route::QaAction(params) => consumer.qa_action(step, params, cx),
        Route::FileAction(params) => consumer.file_action(step, params, cx),
        Route::RetryAction(params) => consumer.retry_action(step, params, cx),
        Route::Error(params) => consumer.error(step, params, cx),
        Route::Generic => {
            tracing::debug!(step_id = %step.id, step_type = ?step.step_type(), "no handler, rendering generically");
            consumer.generic(step, render_generic(step)?, cx)
        }
    };
    Ok(output)
}

/// Route summary of a step, as printed by the replay tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub step_id: String,
    pub route: &'static str,
}

impl RouteSummary {
    pub fn of(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            route: classify(step).name(),
        }
    }
}
