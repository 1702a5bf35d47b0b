//! Rendered content carried inside steps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// A block of assistant text with its provider annotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TextBlock {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

impl TextBlock {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotations: Vec::new(),
        }
    }
}

/// Parameters of a `TEXT` content entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TextParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Value>>,
}

/// Widget kinds a message entry can embed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WidgetKind {
    Search,
    Qa,
}

/// One entry of a `MESSAGE_STEP`'s `params.messages` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageContent {
    Text(TextParams),
    Image(String),
    Widget { widget: WidgetKind, message: Value },
}

impl MessageContent {
    /// A text entry holding the raw provider text block.
    pub fn raw_text(block: TextBlock) -> Self {
        Self::Text(TextParams {
            raw: Some(block),
            ..TextParams::default()
        })
    }

    /// Plain text of this entry, if it is textual.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(params) => params
                .raw
                .as_ref()
                .map(|raw| raw.value.as_str())
                .or(params.message.as_deref()),
            Self::Image(_) | Self::Widget { .. } => None,
        }
    }
}

/// Concatenated text of a rendered message snapshot.
pub fn snapshot_text(messages: &[MessageContent]) -> String {
    messages.iter().filter_map(MessageContent::text).collect()
}

/// Workflow kinds with a dedicated handler.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowKind {
    Search,
    Qa,
    #[strum(default)]
    Other(String),
}

/// Action kinds with a dedicated handler.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Search,
    Qa,
    File,
    Retry,
    #[strum(default)]
    Other(String),
}

/// Workflow request attached to a `WORKFLOW_STEP`.
///
/// Only the `type` discriminant is interpreted; every other field is kept
/// verbatim for the handler that owns the workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl WorkflowDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
            .parse()
            .unwrap_or_else(|_| WorkflowKind::Other(self.kind.clone()))
    }
}

/// Action request attached to an `ACTION_STEP`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActionDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
            .parse()
            .unwrap_or_else(|_| ActionKind::Other(self.kind.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_content_uses_type_and_params_keys() {
        let content = MessageContent::raw_text(TextBlock::new("Hello"));
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({"type": "TEXT", "params": {"raw": {"value": "Hello", "annotations": []}}})
        );
    }

    #[test]
    fn unknown_nested_kinds_are_kept() {
        assert_eq!(WorkflowDescriptor::new("qa").kind(), WorkflowKind::Qa);
        assert_eq!(
            WorkflowDescriptor::new("summarize").kind(),
            WorkflowKind::Other("summarize".to_string())
        );
        assert_eq!(ActionDescriptor::new("retry").kind(), ActionKind::Retry);
        assert_eq!(
            ActionDescriptor::new("export").kind(),
            ActionKind::Other("export".to_string())
        );
    }

    #[test]
    fn descriptor_fields_round_trip_verbatim() {
        let raw = json!({"type": "search", "query": "rust", "limit": 3});
        let descriptor: WorkflowDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(descriptor.kind(), WorkflowKind::Search);
        assert_eq!(serde_json::to_value(&descriptor).unwrap(), raw);
    }
}
