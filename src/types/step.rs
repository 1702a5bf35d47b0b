//! Step records: the unit of the per-message Step Log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::SerializedError;

use super::content::{ActionDescriptor, MessageContent, WorkflowDescriptor};

/// Step lifecycle status. Only moves forward.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    InProgress,
    Completed,
}

/// Step discriminant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    MessageStep,
    ToolStep,
    WorkflowStep,
    ActionStep,
    ErrorStep,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MessageStepParams {
    #[serde(default)]
    pub messages: Vec<MessageContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolStepParams {
    /// Provider-issued tool call id.
    pub id: String,
    pub name: String,
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepParams {
    pub workflow: WorkflowDescriptor,
    #[serde(default)]
    pub context: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionStepParams {
    pub action: ActionDescriptor,
    #[serde(default)]
    pub context: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorStepParams {
    pub message: String,
    pub stack: SerializedError,
}

/// Variant payload of a step, fixed by its type.
#[derive(Debug, Clone, PartialEq)]
pub enum StepContent {
    Message(MessageStepParams),
    Tool(ToolStepParams),
    Workflow(WorkflowStepParams),
    Action(ActionStepParams),
    Error(ErrorStepParams),
}

impl StepContent {
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Message(_) => StepType::MessageStep,
            Self::Tool(_) => StepType::ToolStep,
            Self::Workflow(_) => StepType::WorkflowStep,
            Self::Action(_) => StepType::ActionStep,
            Self::Error(_) => StepType::ErrorStep,
        }
    }

    fn params_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Message(params) => serde_json::to_value(params),
            Self::Tool(params) => serde_json::to_value(params),
            Self::Workflow(params) => serde_json::to_value(params),
            Self::Action(params) => serde_json::to_value(params),
            Self::Error(params) => serde_json::to_value(params),
        }
    }

    fn from_parts(step_type: StepType, params: Value) -> Result<Self, serde_json::Error> {
        Ok(match step_type {
            StepType::MessageStep => Self::Message(serde_json::from_value(params)?),
            StepType::ToolStep => Self::Tool(serde_json::from_value(params)?),
            StepType::WorkflowStep => Self::Workflow(serde_json::from_value(params)?),
            StepType::ActionStep => Self::Action(serde_json::from_value(params)?),
            StepType::ErrorStep => Self::Error(serde_json::from_value(params)?),
        })
    }
}

/// Content and initial status of a step about to be appended.
///
/// Identity fields (`id`, `messageId`, `timestamp`) are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub status: StepStatus,
    pub content: StepContent,
}

impl NewStep {
    /// An empty, open message step.
    pub fn message() -> Self {
        Self {
            status: StepStatus::InProgress,
            content: StepContent::Message(MessageStepParams::default()),
        }
    }

    pub fn tool(call_id: impl Into<String>, name: impl Into<String>, parameters: Value) -> Self {
        Self {
            status: StepStatus::InProgress,
            content: StepContent::Tool(ToolStepParams {
                id: call_id.into(),
                name: name.into(),
                parameters,
                output: None,
            }),
        }
    }

    /// Errors are terminal, so error steps start out completed.
    pub fn error(message: impl Into<String>, stack: SerializedError) -> Self {
        Self {
            status: StepStatus::Completed,
            content: StepContent::Error(ErrorStepParams {
                message: message.into(),
                stack,
            }),
        }
    }

    pub fn workflow(workflow: WorkflowDescriptor, context: Value) -> Self {
        Self {
            status: StepStatus::InProgress,
            content: StepContent::Workflow(WorkflowStepParams {
                workflow,
                context,
                search_results_step_id: None,
                search_results_count: None,
                indexed: None,
            }),
        }
    }

    pub fn action(action: ActionDescriptor, context: Value) -> Self {
        Self {
            status: StepStatus::InProgress,
            content: StepContent::Action(ActionStepParams {
                action,
                context,
                workflow: None,
                output: None,
            }),
        }
    }
}

/// One record of a message's Step Log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepRecord", into = "StepRecord")]
pub struct Step {
    pub id: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
    pub content: StepContent,
}

impl Step {
    pub fn step_type(&self) -> StepType {
        self.content.step_type()
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    pub fn as_message(&self) -> Option<&MessageStepParams> {
        match &self.content {
            StepContent::Message(params) => Some(params),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolStepParams> {
        match &self.content {
            StepContent::Tool(params) => Some(params),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorStepParams> {
        match &self.content {
            StepContent::Error(params) => Some(params),
            _ => None,
        }
    }
}

/// Wire shape of a step: `{id, messageId, timestamp, status, type, params}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepRecord {
    id: String,
    message_id: String,
    timestamp: DateTime<Utc>,
    status: StepStatus,
    #[serde(rename = "type")]
    step_type: StepType,
    #[serde(default)]
    params: Value,
}

impl TryFrom<StepRecord> for Step {
    type Error = serde_json::Error;

    fn try_from(record: StepRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            content: StepContent::from_parts(record.step_type, record.params)?,
            id: record.id,
            message_id: record.message_id,
            timestamp: record.timestamp,
            status: record.status,
        })
    }
}

impl From<Step> for StepRecord {
    fn from(step: Step) -> Self {
        // Params are plain data; a failure here would mean a non-string map key.
        let params = step.content.params_value().unwrap_or(Value::Null);
        Self {
            step_type: step.content.step_type(),
            id: step.id,
            message_id: step.message_id,
            timestamp: step.timestamp,
            status: step.status,
            params,
        }
    }
}
