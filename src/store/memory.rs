//! In-memory Step Log store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{apply_patch, PatchOutcome, StepPatch, StepStore};
use crate::error::{Result, StepStreamError};
use crate::types::{NewStep, Step, StepStatus};

/// Step Logs keyed by message id, held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStepStore {
    logs: RwLock<HashMap<String, Vec<Step>>>,
}

impl InMemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every registered message.
    pub async fn message_ids(&self) -> Vec<String> {
        self.logs.read().await.keys().cloned().collect()
    }
}

fn unknown_step(message_id: &str, step_id: &str) -> StepStreamError {
    StepStreamError::UnknownStep {
        message_id: message_id.to_string(),
        step_id: step_id.to_string(),
    }
}

#[async_trait]
impl StepStore for InMemoryStepStore {
    async fn register_message(&self, message_id: &str) -> Result<()> {
        self.logs
            .write()
            .await
            .entry(message_id.to_string())
            .or_default();
        Ok(())
    }

    async fn add_step(&self, message_id: &str, step: NewStep) -> Result<String> {
        let mut logs = self.logs.write().await;
        let log = logs
            .get_mut(message_id)
            .ok_or_else(|| StepStreamError::UnknownMessage(message_id.to_string()))?;
        let id = Uuid::new_v4().to_string();
        log.push(Step {
            id: id.clone(),
            message_id: message_id.to_string(),
            timestamp: Utc::now(),
            status: step.status,
            content: step.content,
        });
        Ok(id)
    }

    async fn update_step(&self, message_id: &str, step_id: &str, patch: StepPatch) -> Result<()> {
        let mut logs = self.logs.write().await;
        let step = logs
            .get_mut(message_id)
            .and_then(|log| log.iter_mut().find(|step| step.id == step_id))
            .ok_or_else(|| unknown_step(message_id, step_id))?;
        let patch_kind = patch.kind();
        match apply_patch(step, patch) {
            PatchOutcome::Applied => Ok(()),
            PatchOutcome::Frozen => {
                tracing::debug!(
                    message_id,
                    step_id,
                    "ignoring late update to completed step"
                );
                Ok(())
            }
            PatchOutcome::Mismatch => Err(StepStreamError::StepKindMismatch {
                step_id: step_id.to_string(),
                actual: step.step_type().to_string(),
                patch: patch_kind,
            }),
        }
    }

    async fn complete_step(&self, message_id: &str, step_id: &str) -> Result<()> {
        let mut logs = self.logs.write().await;
        let step = logs
            .get_mut(message_id)
            .and_then(|log| log.iter_mut().find(|step| step.id == step_id))
            .ok_or_else(|| unknown_step(message_id, step_id))?;
        step.status = StepStatus::Completed;
        Ok(())
    }

    async fn get_step(&self, message_id: &str, step_id: &str) -> Option<Step> {
        self.logs
            .read()
            .await
            .get(message_id)?
            .iter()
            .find(|step| step.id == step_id)
            .cloned()
    }

    async fn steps(&self, message_id: &str) -> Result<Vec<Step>> {
        self.logs
            .read()
            .await
            .get(message_id)
            .cloned()
            .ok_or_else(|| StepStreamError::UnknownMessage(message_id.to_string()))
    }

    async fn step_count(&self, message_id: &str) -> usize {
        self.logs
            .read()
            .await
            .get(message_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageContent, StepContent, TextBlock};
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> Vec<MessageContent> {
        vec![MessageContent::raw_text(TextBlock::new(value))]
    }

    #[tokio::test]
    async fn add_step_requires_registered_message() {
        let store = InMemoryStepStore::new();
        let err = store.add_step("missing", NewStep::message()).await.unwrap_err();
        assert!(matches!(err, StepStreamError::UnknownMessage(id) if id == "missing"));
    }

    #[tokio::test]
    async fn message_updates_replace_the_snapshot() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let id = store.add_step("m", NewStep::message()).await.unwrap();

        store.update_step("m", &id, StepPatch::Messages(text("Hello"))).await.unwrap();
        store.update_step("m", &id, StepPatch::Messages(text("Hello world"))).await.unwrap();

        let step = store.get_step("m", &id).await.unwrap();
        assert_eq!(step.as_message().unwrap().messages, text("Hello world"));
    }

    #[tokio::test]
    async fn completed_message_content_is_frozen_but_tool_output_is_not() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let message_id = store.add_step("m", NewStep::message()).await.unwrap();
        let tool_id = store
            .add_step("m", NewStep::tool("call_1", "search", serde_json::json!({})))
            .await
            .unwrap();

        store.update_step("m", &message_id, StepPatch::Messages(text("final"))).await.unwrap();
        store.complete_step("m", &message_id).await.unwrap();
        store.update_step("m", &message_id, StepPatch::Messages(text("late"))).await.unwrap();

        store.complete_step("m", &tool_id).await.unwrap();
        store
            .update_step("m", &tool_id, StepPatch::ToolOutput("42".to_string()))
            .await
            .unwrap();

        let message = store.get_step("m", &message_id).await.unwrap();
        assert_eq!(message.as_message().unwrap().messages, text("final"));
        let tool = store.get_step("m", &tool_id).await.unwrap();
        assert_eq!(tool.as_tool().unwrap().output.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn complete_step_is_idempotent() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let id = store.add_step("m", NewStep::message()).await.unwrap();

        store.complete_step("m", &id).await.unwrap();
        let once = store.get_step("m", &id).await.unwrap();
        store.complete_step("m", &id).await.unwrap();
        let twice = store.get_step("m", &id).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn mismatched_patch_is_rejected() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let id = store.add_step("m", NewStep::message()).await.unwrap();
        let err = store
            .update_step("m", &id, StepPatch::ToolOutput("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StepStreamError::StepKindMismatch { .. }));
    }

    #[tokio::test]
    async fn unknown_step_is_reported() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let err = store.complete_step("m", "nope").await.unwrap_err();
        assert!(matches!(err, StepStreamError::UnknownStep { .. }));
        assert!(store.get_step("m", "nope").await.is_none());
    }

    #[tokio::test]
    async fn steps_preserve_insertion_order() {
        let store = InMemoryStepStore::new();
        store.register_message("m").await.unwrap();
        let first = store.add_step("m", NewStep::message()).await.unwrap();
        let second = store
            .add_step("m", NewStep::tool("call_1", "f", serde_json::json!({"a": 1})))
            .await
            .unwrap();
        let third = store.add_step("m", NewStep::message()).await.unwrap();

        let ids: Vec<String> = store.steps("m").await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second, third]);
        assert!(matches!(
            store.find_tool_step("m", "call_1").await.map(|s| s.content),
            Some(StepContent::Tool(_))
        ));
    }
}
