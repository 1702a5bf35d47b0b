//! Built-in renderings.

use serde_json::Value;

use super::{RouteContext, StepConsumer};
use crate::error::Result;
use crate::types::{
    snapshot_text, ActionStepParams, ErrorStepParams, MessageStepParams, Step, StepStatus,
    ToolStepParams, WorkflowStepParams,
};

/// Pretty-printed JSON of the whole step.
pub fn render_generic(step: &Step) -> Result<String> {
    Ok(serde_json::to_string_pretty(step)?)
}

/// One-line plain text rendering per step, for terminals and logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

fn status_marker(step: &Step) -> &'static str {
    match step.status {
        StepStatus::InProgress => "…",
        StepStatus::Completed => "✓",
    }
}

fn field<'v>(fields: &'v serde_json::Map<String, Value>, key: &str) -> &'v str {
    fields.get(key).and_then(Value::as_str).unwrap_or("")
}

impl StepConsumer for TextRenderer {
    type Output = String;

    fn message(&mut self, step: &Step, params: &MessageStepParams, _cx: &RouteContext<'_>) -> String {
        format!("{} {}", status_marker(step), snapshot_text(&params.messages))
    }

    fn tool(&mut self, step: &Step, params: &ToolStepParams, _cx: &RouteContext<'_>) -> String {
        match &params.output {
            Some(output) => format!("{} {}({}) -> {output}", status_marker(step), params.name, params.parameters),
            None => format!("{} {}({})", status_marker(step), params.name, params.parameters),
        }
    }

    fn search_workflow(&mut self, step: &Step, params: &WorkflowStepParams, _cx: &RouteContext<'_>) -> String {
        let count = params
            .search_results_count
            .map(|count| format!(" ({count} results)"))
            .unwrap_or_default();
        format!("{} search workflow{count}", status_marker(step))
    }

    fn qa_workflow(&mut self, step: &Step, params: &WorkflowStepParams, _cx: &RouteContext<'_>) -> String {
        let indexed = if params.indexed == Some(true) { " (indexed)" } else { "" };
        format!("{} qa workflow{indexed}", status_marker(step))
    }

    fn search_action(&mut self, step: &Step, params: &ActionStepParams, _cx: &RouteContext<'_>) -> String {
        format!("{} search: {}", status_marker(step), field(&params.action.fields, "query"))
    }

    fn qa_action(&mut self, step: &Step, params: &ActionStepParams, _cx: &RouteContext<'_>) -> String {
        format!("{} qa: {}", status_marker(step), field(&params.action.fields, "question"))
    }

    fn file_action(&mut self, step: &Step, params: &ActionStepParams, _cx: &RouteContext<'_>) -> String {
        format!("{} file: {}", status_marker(step), field(&params.action.fields, "name"))
    }

    fn retry_action(&mut self, step: &Step, _params: &ActionStepParams, _cx: &RouteContext<'_>) -> String {
        format!("{} retry", status_marker(step))
    }

    fn error(&mut self, _step: &Step, params: &ErrorStepParams, _cx: &RouteContext<'_>) -> String {
        if params.stack.message.is_empty() {
            format!("! {}", params.message)
        } else {
            format!("! {}: {}", params.message, params.stack.message)
        }
    }

    fn generic(&mut self, _step: &Step, rendered: String, _cx: &RouteContext<'_>) -> String {
        rendered
    }
}
