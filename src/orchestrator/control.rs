//! Capabilities the orchestrator consumes from its host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::types::RunResult;

/// Host-side reactions to run-level signals. Every method defaults to a no-op.
pub trait RunControl: Send + Sync {
    /// The provider is waiting on outputs for `count` function calls.
    fn function_calls_required(&self, _message_id: &str, _count: usize) {}

    /// The stream reported a transport-level error.
    fn stream_error(&self, _message_id: &str, _message: &str) {}

    fn run_finished(&self, _message_id: &str, _result: &RunResult) {}
}

/// Control that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopControl;

impl RunControl for NoopControl {}

/// Channel that submits tool outputs back to the provider.
#[async_trait]
pub trait ToolOutputSink: Send + Sync {
    async fn add_function_call_output(&self, call_id: &str, output: &str) -> Result<()>;
}

/// The user turn that prompted a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTurn {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Shared context carried across runs (selected items, library state).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Value>,
}

/// Lookup of earlier conversation turns.
#[async_trait]
pub trait ConversationLookup: Send + Sync {
    /// The latest user turn preceding `message_id`.
    async fn find_last_user_turn(&self, message_id: &str) -> Option<UserTurn>;
}
