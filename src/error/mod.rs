//! Error types for stepstream.

pub mod serialized;

pub use serialized::SerializedError;

use strum::IntoStaticStr;
use thiserror::Error;

/// Primary error type for all stepstream operations.
#[derive(Error, Debug, IntoStaticStr)]
pub enum StepStreamError {
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Unknown step {step_id} in message {message_id}")]
    UnknownStep { message_id: String, step_id: String },

    #[error("Step {step_id} is a {actual} and cannot take a {patch} update")]
    StepKindMismatch {
        step_id: String,
        actual: String,
        patch: &'static str,
    },

    #[error("Too many tool calls: limit of {limit} per run exceeded")]
    ToolCallLimitExceeded { limit: usize },

    #[error("Unsupported message content type: {0}")]
    UnsupportedContent(String),

    #[error("Invalid arguments for tool call {call_id}: {source}")]
    InvalidToolArguments {
        call_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tool call {call_id} has no function payload")]
    MalformedToolCall { call_id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad error category used to decide how a failure surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Ends the run; never retried automatically.
    FatalRun,
    /// A Step Log lookup or mutation was rejected.
    Store,
    Configuration,
    Serialization,
}

impl StepStreamError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownMessage(_) | Self::UnknownStep { .. } | Self::StepKindMismatch { .. } => {
                ErrorCategory::Store
            }
            Self::ToolCallLimitExceeded { .. }
            | Self::UnsupportedContent(_)
            | Self::InvalidToolArguments { .. }
            | Self::MalformedToolCall { .. }
            | Self::Transport(_)
            | Self::InvalidState(_) => ErrorCategory::FatalRun,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Configuration(_) | Self::Io(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether this error signals a runaway tool loop rather than a bad call.
    pub fn is_tool_call_limit(&self) -> bool {
        matches!(self, Self::ToolCallLimitExceeded { .. })
    }

    /// Stable variant name, used as the `name` of serialized snapshots.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_fatal_run(&self) -> bool {
        self.category() == ErrorCategory::FatalRun
    }

    /// Snapshot this error into its JSON-safe form.
    pub fn serialize(&self) -> SerializedError {
        SerializedError::from_error(self)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StepStreamError>;
