//! Tests for wire shapes of steps and events.

use pretty_assertions::assert_eq;
use serde_json::json;
use stepstream::types::*;

#[test]
fn tool_step_wire_shape() {
    let step: Step = serde_json::from_value(json!({
        "id": "step_1",
        "messageId": "msg_1",
        "timestamp": "2024-05-01T12:00:00Z",
        "status": "IN_PROGRESS",
        "type": "TOOL_STEP",
        "params": {"id": "call_1", "name": "search", "parameters": {"q": "rust"}}
    }))
    .unwrap();

    assert_eq!(step.step_type(), StepType::ToolStep);
    let tool = step.as_tool().unwrap();
    assert_eq!(tool.id, "call_1");
    assert_eq!(tool.parameters, json!({"q": "rust"}));
    assert!(tool.output.is_none());

    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value["messageId"], json!("msg_1"));
    assert_eq!(value["type"], json!("TOOL_STEP"));
    assert!(value["params"].get("output").is_none());
}

#[test]
fn workflow_and_action_steps_keep_unknown_fields() {
    let step: Step = serde_json::from_value(json!({
        "id": "step_2",
        "messageId": "msg_1",
        "timestamp": "2024-05-01T12:00:00Z",
        "status": "COMPLETED",
        "type": "WORKFLOW_STEP",
        "params": {
            "workflow": {"type": "search", "query": "rust async"},
            "context": {},
            "searchResultsStepId": "step_3",
            "searchResultsCount": 12
        }
    }))
    .unwrap();

    let StepContent::Workflow(params) = &step.content else {
        panic!("expected workflow step");
    };
    assert_eq!(params.workflow.kind(), WorkflowKind::Search);
    assert_eq!(params.workflow.fields["query"], json!("rust async"));
    assert_eq!(params.search_results_count, Some(12));

    let action = ActionDescriptor::new("translate");
    assert_eq!(action.kind(), ActionKind::Other("translate".to_string()));
}

#[test]
fn message_step_content_entries() {
    let params: MessageStepParams = serde_json::from_value(json!({
        "messages": [
            {"type": "TEXT", "params": {"raw": {"value": "Hello", "annotations": []}}},
            {"type": "IMAGE", "params": "file_1"},
            {"type": "WIDGET", "params": {"widget": "search", "message": {}}}
        ]
    }))
    .unwrap();

    assert_eq!(params.messages.len(), 3);
    assert_eq!(params.messages[0].text(), Some("Hello"));
    assert_eq!(params.messages[1], MessageContent::Image("file_1".to_string()));
    assert_eq!(snapshot_text(&params.messages), "Hello");
}

#[test]
fn run_events_parse_from_recorded_envelopes() {
    let failed: StreamEvent = serde_json::from_value(json!({
        "event": "event",
        "data": {"event": "thread.run.failed", "data": {"last_error": {"message": "x"}}}
    }))
    .unwrap();
    let StreamEvent::Event(event) = failed else {
        panic!("expected run event");
    };
    assert_eq!(event.event, RUN_FAILED_EVENT);

    let error: StreamEvent =
        serde_json::from_value(json!({"event": "error", "data": {"message": "reset"}})).unwrap();
    assert_eq!(
        error,
        StreamEvent::Error {
            message: "reset".to_string()
        }
    );
    assert_eq!(error.name(), "error");
}
