//! Step Log store contract.
//!
//! Every Step Log mutation in the crate goes through [`StepStore`]. The
//! dispatcher is one writer; an external tool executor attaching outputs is the
//! other. Hosts with their own persistence implement the trait; the
//! [`InMemoryStepStore`] covers everything else.

pub mod memory;

pub use memory::InMemoryStepStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{MessageContent, NewStep, Step, StepContent, StepStatus};

/// Partial update merged into a step's `params`.
///
/// Each variant targets one step type; fields left as `None` keep their
/// current value.
#[derive(Debug, Clone, PartialEq)]
pub enum StepPatch {
    /// Full replacement of a message step's rendered content.
    Messages(Vec<MessageContent>),
    /// Output produced by the external executor for a tool step.
    ToolOutput(String),
    Workflow {
        search_results_step_id: Option<String>,
        search_results_count: Option<u64>,
        indexed: Option<bool>,
    },
    Action {
        workflow: Option<Value>,
        output: Option<Value>,
    },
}

impl StepPatch {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Messages(_) => "messages",
            Self::ToolOutput(_) => "tool output",
            Self::Workflow { .. } => "workflow",
            Self::Action { .. } => "action",
        }
    }
}

/// Outcome of applying a patch to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// The step is completed and the patch targets frozen content.
    Frozen,
    /// The patch does not fit the step's type.
    Mismatch,
}

/// Merge `patch` into `step` following the Step Log rules.
pub fn apply_patch(step: &mut Step, patch: StepPatch) -> PatchOutcome {
    let completed = step.status == StepStatus::Completed;
    match (&mut step.content, patch) {
        (StepContent::Message(_), StepPatch::Messages(_)) if completed => PatchOutcome::Frozen,
        (StepContent::Message(params), StepPatch::Messages(messages)) => {
            params.messages = messages;
            PatchOutcome::Applied
        }
        (StepContent::Tool(params), StepPatch::ToolOutput(output)) => {
            params.output = Some(output);
            PatchOutcome::Applied
        }
        (
            StepContent::Workflow(params),
            StepPatch::Workflow {
                search_results_step_id,
                search_results_count,
                indexed,
            },
        ) => {
            if search_results_step_id.is_some() {
                params.search_results_step_id = search_results_step_id;
            }
            if search_results_count.is_some() {
                params.search_results_count = search_results_count;
            }
            if indexed.is_some() {
                params.indexed = indexed;
            }
            PatchOutcome::Applied
        }
        (StepContent::Action(params), StepPatch::Action { workflow, output }) => {
            if workflow.is_some() {
                params.workflow = workflow;
            }
            if output.is_some() {
                params.output = output;
            }
            PatchOutcome::Applied
        }
        _ => PatchOutcome::Mismatch,
    }
}

/// Persistence/query API for per-message Step Logs.
#[async_trait]
pub trait StepStore: Send + Sync {
    /// Create an empty Step Log for a message. Registering twice is a no-op.
    async fn register_message(&self, message_id: &str) -> Result<()>;

    /// Append a step, assigning its id and timestamp.
    async fn add_step(&self, message_id: &str, step: NewStep) -> Result<String>;

    /// Merge a partial update into an existing step.
    async fn update_step(&self, message_id: &str, step_id: &str, patch: StepPatch) -> Result<()>;

    /// Mark a step completed. Completing an already completed step has no effect.
    async fn complete_step(&self, message_id: &str, step_id: &str) -> Result<()>;

    async fn get_step(&self, message_id: &str, step_id: &str) -> Option<Step>;

    /// The whole Step Log of a message, in insertion order.
    async fn steps(&self, message_id: &str) -> Result<Vec<Step>>;

    async fn step_count(&self, message_id: &str) -> usize {
        self.steps(message_id)
            .await
            .map(|steps| steps.len())
            .unwrap_or(0)
    }

    /// Find the tool step created for a provider call id.
    async fn find_tool_step(&self, message_id: &str, call_id: &str) -> Option<Step> {
        self.steps(message_id).await.ok()?.into_iter().find(|step| {
            step.as_tool()
                .map(|tool| tool.id == call_id)
                .unwrap_or(false)
        })
    }
}
