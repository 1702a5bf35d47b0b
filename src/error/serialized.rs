//! JSON-safe failure snapshots.
//!
//! Failures reported by the upstream provider (and local errors that need to
//! be rendered or logged) are flattened into a [`SerializedError`]: a plain
//! structure that keeps the name, message, code and cause chain, and drops
//! anything that cannot be represented as JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StepStreamError;

const MAX_CAUSE_DEPTH: usize = 16;
const DEFAULT_NAME: &str = "Error";

/// Structural copy of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedError {
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<SerializedError>>,
    /// Remaining payload fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SerializedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
            cause: None,
            extra: Map::new(),
        }
    }

    /// Walk a `std::error::Error` source chain.
    pub fn from_std(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::from_std_at(error, 0)
    }

    fn from_std_at(error: &(dyn std::error::Error + 'static), depth: usize) -> Self {
        let name = match error.downcast_ref::<StepStreamError>() {
            Some(err) => err.name(),
            None => DEFAULT_NAME,
        };
        let mut serialized = Self::new(name, error.to_string());
        if depth < MAX_CAUSE_DEPTH {
            serialized.cause = error
                .source()
                .map(|source| Box::new(Self::from_std_at(source, depth + 1)));
        }
        serialized
    }

    pub fn from_error(error: &StepStreamError) -> Self {
        Self::from_std(error)
    }

    /// Snapshot an arbitrary failure payload.
    ///
    /// Objects keep their fields; `name`, `message`, `code` and `cause` are
    /// lifted into the typed slots. Provider run objects report their reason
    /// under `last_error`, which is used when no top-level message exists.
    pub fn from_payload(payload: &Value) -> Self {
        Self::from_payload_at(payload, 0)
    }

    fn from_payload_at(payload: &Value, depth: usize) -> Self {
        let Value::Object(fields) = payload else {
            return Self::new(DEFAULT_NAME, as_text(payload).unwrap_or_default());
        };

        let mut extra = fields.clone();
        let name = take_text(&mut extra, "name").unwrap_or_else(|| DEFAULT_NAME.to_string());
        let last_error = fields.get("last_error").and_then(Value::as_object);
        let message = take_text(&mut extra, "message")
            .or_else(|| last_error.and_then(|err| err.get("message")).and_then(as_text))
            .unwrap_or_default();
        let code = take_text(&mut extra, "code")
            .or_else(|| last_error.and_then(|err| err.get("code")).and_then(as_text));
        let cause = match extra.remove("cause") {
            Some(Value::Null) | None => None,
            Some(_) if depth >= MAX_CAUSE_DEPTH => None,
            Some(cause) => Some(Box::new(Self::from_payload_at(&cause, depth + 1))),
        };

        Self {
            name,
            message,
            code,
            cause,
            extra,
        }
    }

    /// Iterate this error and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &SerializedError> {
        std::iter::successors(Some(self), |err| err.cause.as_deref())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.message.clone()))
    }
}

/// Remove `key` from `fields` and render it as text. The key never stays in
/// the extra map, so it cannot shadow the typed slot when serialized.
fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    fields.remove(key).as_ref().and_then(as_text)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
