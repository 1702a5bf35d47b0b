//! Core run types for the orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StepStreamError;

/// Unique run identifier.
pub type RunId = Uuid;

/// Terminal run status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Canceled,
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunFailure {
    /// The provider reported the failure; an error step was recorded.
    Reported,
    /// The tool-call ceiling was crossed.
    ToolCallLimit,
    /// A local handler or transport error ended the run.
    Fatal,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Steps appended by this run's dispatcher.
    #[serde(default)]
    pub steps_created: usize,
    #[serde(default = "Utc::now")]
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed() -> Self {
        Self {
            status: RunStatus::Completed,
            failure: None,
            error: None,
            steps_created: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn canceled() -> Self {
        Self {
            status: RunStatus::Canceled,
            ..Self::completed()
        }
    }

    pub fn reported_failure(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            failure: Some(RunFailure::Reported),
            error: Some(error.into()),
            ..Self::completed()
        }
    }

    /// Failure raised locally while handling the stream.
    pub fn fatal(error: &StepStreamError) -> Self {
        let failure = if error.is_tool_call_limit() {
            RunFailure::ToolCallLimit
        } else {
            RunFailure::Fatal
        };
        Self {
            status: RunStatus::Failed,
            failure: Some(failure),
            error: Some(error.to_string()),
            ..Self::completed()
        }
    }

    pub(super) fn with_steps_created(mut self, steps_created: usize) -> Self {
        self.steps_created = steps_created;
        self
    }

    pub fn is_tool_call_limit(&self) -> bool {
        self.failure == Some(RunFailure::ToolCallLimit)
    }
}

/// Kind of Step Log mutation performed by a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepChange {
    Added,
    Updated,
    Completed,
}

/// Notification emitted after each Step Log mutation, for re-rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub step_id: String,
    pub change: StepChange,
}

/// Callback used for streaming step notifications.
pub type StepEventSink = Arc<dyn Fn(StepEvent) + Send + Sync>;
