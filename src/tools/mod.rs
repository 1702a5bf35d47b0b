//! Tool output attachment.
//!
//! The dispatcher only records tool calls. Execution happens elsewhere; when an
//! executor has a result it goes through [`ToolOutputs`], which writes it into
//! the `TOOL_STEP`, submits it to the provider under the step's call id, and
//! then completes the step.

use std::sync::Arc;

use crate::error::{Result, StepStreamError};
use crate::orchestrator::ToolOutputSink;
use crate::store::{StepPatch, StepStore};
use crate::types::Step;

/// Writer for tool outputs produced outside the run.
#[derive(Clone)]
pub struct ToolOutputs {
    store: Arc<dyn StepStore>,
    sink: Arc<dyn ToolOutputSink>,
}

impl ToolOutputs {
    pub fn new(store: Arc<dyn StepStore>, sink: Arc<dyn ToolOutputSink>) -> Self {
        Self { store, sink }
    }

    /// Attach `output` to the tool step `step_id` of `message_id`.
    ///
    /// Returns the provider call id the output was submitted under.
    pub async fn attach(&self, message_id: &str, step_id: &str, output: impl Into<String>) -> Result<String> {
        let step = self
            .store
            .get_step(message_id, step_id)
            .await
            .ok_or_else(|| StepStreamError::UnknownStep {
                message_id: message_id.to_string(),
                step_id: step_id.to_string(),
            })?;
        self.write(message_id, &step, output.into()).await
    }

    /// Attach `output` to the tool step created for provider call `call_id`.
    pub async fn attach_by_call_id(&self, message_id: &str, call_id: &str, output: impl Into<String>) -> Result<String> {
        let step = self
            .store
            .find_tool_step(message_id, call_id)
            .await
            .ok_or_else(|| StepStreamError::UnknownStep {
                message_id: message_id.to_string(),
                step_id: call_id.to_string(),
            })?;
        self.write(message_id, &step, output.into()).await
    }

    async fn write(&self, message_id: &str, step: &Step, output: String) -> Result<String> {
        let Some(tool) = step.as_tool() else {
            return Err(StepStreamError::StepKindMismatch {
                step_id: step.id.clone(),
                actual: step.step_type().to_string(),
                patch: StepPatch::ToolOutput(String::new()).kind(),
            });
        };
        let call_id = tool.id.clone();

        self.store
            .update_step(message_id, &step.id, StepPatch::ToolOutput(output.clone()))
            .await?;
        // The step completes only once the provider has the output.
        self.sink.add_function_call_output(&call_id, &output).await?;
        self.store.complete_step(message_id, &step.id).await?;
        tracing::debug!(
            message_id = %message_id,
            step_id = %step.id,
            call_id = %call_id,
            "tool output attached"
        );
        Ok(call_id)
    }
}
