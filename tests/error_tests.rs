//! Tests for the error system.

use serde_json::json;
use stepstream::error::*;

#[test]
fn error_categories_are_stable_for_major_variants() {
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();
    let cases = vec![
        (
            StepStreamError::ToolCallLimitExceeded { limit: 5 },
            ErrorCategory::FatalRun,
        ),
        (
            StepStreamError::UnsupportedContent("image_file".to_string()),
            ErrorCategory::FatalRun,
        ),
        (
            StepStreamError::MalformedToolCall {
                call_id: "call_1".to_string(),
            },
            ErrorCategory::FatalRun,
        ),
        (
            StepStreamError::Transport("reset".to_string()),
            ErrorCategory::FatalRun,
        ),
        (
            StepStreamError::UnknownMessage("m".to_string()),
            ErrorCategory::Store,
        ),
        (
            StepStreamError::Configuration("bad".to_string()),
            ErrorCategory::Configuration,
        ),
        (
            StepStreamError::Serialization(serde_error),
            ErrorCategory::Serialization,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error.category(), expected, "category for {error}");
        assert_eq!(error.is_fatal_run(), expected == ErrorCategory::FatalRun);
    }
}

#[test]
fn tool_call_limit_is_distinguishable() {
    let limit = StepStreamError::ToolCallLimitExceeded { limit: 5 };
    assert!(limit.is_tool_call_limit());
    assert_eq!(
        limit.to_string(),
        "Too many tool calls: limit of 5 per run exceeded"
    );

    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let bad_args = StepStreamError::InvalidToolArguments {
        call_id: "call_1".to_string(),
        source,
    };
    assert!(!bad_args.is_tool_call_limit());
    assert!(bad_args.is_fatal_run());
}

#[test]
fn serialized_error_keeps_the_source_chain() {
    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error = StepStreamError::InvalidToolArguments {
        call_id: "call_7".to_string(),
        source,
    };

    let serialized = error.serialize();
    assert_eq!(serialized.name, "InvalidToolArguments");
    assert!(serialized.message.contains("call_7"));
    let chain: Vec<&SerializedError> = serialized.chain().collect();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].name, "Error");

    let value = serialized.to_value();
    assert_eq!(value["name"], json!("InvalidToolArguments"));
    assert!(value["cause"]["message"].is_string());
}

#[test]
fn serialized_payload_is_json_safe() {
    let payload = json!({
        "name": "RunError",
        "message": "server_error",
        "code": "500",
        "cause": {"message": "upstream timeout", "cause": null},
        "attempt": 3
    });
    let serialized = SerializedError::from_payload(&payload);
    assert_eq!(serialized.name, "RunError");
    assert_eq!(serialized.code.as_deref(), Some("500"));
    assert_eq!(serialized.cause.as_ref().unwrap().message, "upstream timeout");
    assert_eq!(serialized.extra["attempt"], json!(3));

    let round_trip: SerializedError = serde_json::from_value(serialized.to_value()).unwrap();
    assert_eq!(round_trip, serialized);
}
