//! Inbound run events and their provider payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::TextBlock;

/// Assistant message envelope carried by message events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThreadMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: Vec<MessageContentPart>,
}

impl ThreadMessage {
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: vec![MessageContentPart::Text {
                text: TextBlock::new(text),
            }],
        }
    }
}

/// Image reference produced by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageFileRef {
    pub file_id: String,
}

/// One content part of a provider message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentPart {
    Text {
        text: TextBlock,
    },
    ImageFile {
        image_file: ImageFileRef,
    },
    ImageUrl {
        image_url: Value,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Unknown,
}

impl MessageContentPart {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ImageFile { .. } => "image_file",
            Self::ImageUrl { .. } => "image_url",
            Self::Refusal { .. } => "refusal",
            Self::Unknown => "unknown",
        }
    }
}

/// Incremental message delta. Only informational: handlers render from the
/// accompanying snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MessageDelta {
    #[serde(default)]
    pub content: Vec<Value>,
}

/// Tool call kinds reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallKind {
    Function,
    CodeInterpreter,
    FileSearch,
    #[serde(other)]
    Other,
}

/// Function name and raw JSON argument string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Tool call descriptor: `{id, type, function?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ToolCallKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCall>,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ToolCallKind::Function,
            function: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == ToolCallKind::Function
    }
}

/// Run-level event names the dispatcher interprets.
pub const RUN_FAILED_EVENT: &str = "thread.run.failed";
pub const RUN_REQUIRES_ACTION_EVENT: &str = "thread.run.requires_action";

/// Generic named event with an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStreamEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RunStreamEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn run_failed(data: Value) -> Self {
        Self::new(RUN_FAILED_EVENT, data)
    }

    /// Tool calls requested by a `submit_tool_outputs` action, if any.
    pub fn required_tool_calls(&self) -> Option<Vec<ToolCall>> {
        let action = self.data.get("required_action")?;
        let action: RequiredAction = serde_json::from_value(action.clone()).ok()?;
        match action {
            RequiredAction::SubmitToolOutputs { submit_tool_outputs } => {
                Some(submit_tool_outputs.tool_calls)
            }
            RequiredAction::Other => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequiredAction {
    SubmitToolOutputs {
        submit_tool_outputs: SubmitToolOutputs,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

/// Named events delivered by a run's stream, in causal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum StreamEvent {
    MessageCreated(ThreadMessage),
    MessageDelta {
        #[serde(default)]
        delta: MessageDelta,
        snapshot: ThreadMessage,
    },
    MessageDone(ThreadMessage),
    TextDone(TextBlock),
    ImageFileDone(ImageFileRef),
    ToolCallDone(ToolCall),
    Event(RunStreamEvent),
    Abort,
    Error {
        message: String,
    },
    End,
}

impl StreamEvent {
    /// Delta event carrying the given full snapshot.
    pub fn delta(snapshot: ThreadMessage) -> Self {
        Self::MessageDelta {
            delta: MessageDelta::default(),
            snapshot,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "messageCreated",
            Self::MessageDelta { .. } => "messageDelta",
            Self::MessageDone(_) => "messageDone",
            Self::TextDone(_) => "textDone",
            Self::ImageFileDone(_) => "imageFileDone",
            Self::ToolCallDone(_) => "toolCallDone",
            Self::Event(_) => "event",
            Self::Abort => "abort",
            Self::Error { .. } => "error",
            Self::End => "end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_parse_from_named_envelope() {
        let event: StreamEvent = serde_json::from_value(json!({
            "event": "toolCallDone",
            "data": {
                "id": "call_1",
                "type": "function",
                "function": {"name": "search", "arguments": "{\"q\":\"rust\"}"}
            }
        }))
        .unwrap();
        assert_eq!(event, StreamEvent::ToolCallDone(ToolCall::function("call_1", "search", "{\"q\":\"rust\"}")));

        let end: StreamEvent = serde_json::from_value(json!({"event": "end"})).unwrap();
        assert_eq!(end, StreamEvent::End);
    }

    #[test]
    fn unknown_content_parts_parse_as_unknown() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg",
            "content": [{"type": "hologram", "hologram": {}}]
        }))
        .unwrap();
        assert_eq!(message.content, vec![MessageContentPart::Unknown]);
    }

    #[test]
    fn required_tool_calls_are_extracted() {
        let event = RunStreamEvent::new(
            RUN_REQUIRES_ACTION_EVENT,
            json!({
                "required_action": {
                    "type": "submit_tool_outputs",
                    "submit_tool_outputs": {
                        "tool_calls": [
                            {"id": "a", "type": "function", "function": {"name": "f", "arguments": "{}"}},
                            {"id": "b", "type": "code_interpreter"}
                        ]
                    }
                }
            }),
        );
        let calls = event.required_tool_calls().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.iter().filter(|call| call.is_function()).count(), 1);
    }
}
