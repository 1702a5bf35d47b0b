//! End-to-end runs through the public API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use stepstream::prelude::*;
use stepstream::router::{classify, TextRenderer};
use stepstream::types::{ToolCall, TextBlock};

#[derive(Default)]
struct RecordingSink {
    submitted: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ToolOutputSink for RecordingSink {
    async fn add_function_call_output(&self, call_id: &str, output: &str) -> Result<()> {
        self.submitted
            .lock()
            .unwrap()
            .push((call_id.to_string(), output.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn tool_call_round_trip_through_executor() {
    let store = Arc::new(InMemoryStepStore::new());
    store.register_message("msg").await.unwrap();
    let orchestrator = Orchestrator::new(store.clone(), OrchestratorConfig::default());

    let (events, stream) = stepstream::stream::channel();
    let handle = orchestrator.attach("msg", stream).await.unwrap();
    events.send(StreamEvent::ToolCallDone(ToolCall::function(
        "call_1",
        "search_library",
        r#"{"query":"ownership"}"#,
    )));
    events.send(StreamEvent::End);
    let result = handle.wait().await;
    assert_eq!(result.status, RunStatus::Completed);

    let sink = Arc::new(RecordingSink::default());
    let outputs = ToolOutputs::new(store.clone(), sink.clone());
    outputs
        .attach_by_call_id("msg", "call_1", "2 documents")
        .await
        .unwrap();

    let steps = store.steps("msg").await.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(classify(&steps[0]).name(), "tool");
    let line = route(&steps[0], &mut TextRenderer, &RouteContext::new("msg")).unwrap();
    assert_eq!(line, "✓ search_library({\"query\":\"ownership\"}) -> 2 documents");
    assert_eq!(
        *sink.submitted.lock().unwrap(),
        vec![("call_1".to_string(), "2 documents".to_string())]
    );
}

#[tokio::test]
async fn recorded_stream_replays_into_a_step_log() {
    let lines = [
        json!({"event": "messageCreated", "data": {"id": "m", "content": []}}),
        json!({"event": "messageDelta", "data": {"snapshot": {"id": "m", "content": [{"type": "text", "text": {"value": "Hello"}}]}}}),
        json!({"event": "textDone", "data": {"value": "Hello"}}),
        json!({"event": "messageDone", "data": {"id": "m"}}),
        json!({"event": "end"}),
    ]
    .iter()
    .map(|line| line.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let store = Arc::new(InMemoryStepStore::new());
    store.register_message("msg").await.unwrap();
    let orchestrator = Orchestrator::new(store.clone(), OrchestratorConfig::default());
    let stream = stepstream::stream::from_json_lines(std::io::Cursor::new(lines.into_bytes()));

    let result = orchestrator.attach("msg", stream).await.unwrap().wait().await;
    assert_eq!(result.status, RunStatus::Completed);

    let steps = store.steps("msg").await.unwrap();
    assert_eq!(steps.len(), 1);
    let message = steps[0].as_message().unwrap();
    assert_eq!(
        message.messages,
        vec![stepstream::types::MessageContent::raw_text(TextBlock::new("Hello"))]
    );
}
