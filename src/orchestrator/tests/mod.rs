use super::*;

use std::sync::Mutex;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::{timeout, Duration};

use crate::store::InMemoryStepStore;
use crate::types::{
    snapshot_text, MessageContentPart, RunStreamEvent, StepStatus, StepType, StreamEvent,
    ThreadMessage, ToolCall,
};

mod support;

use support::{
    capture_steps, created, delta, done, registered_store, run_events, tool_call,
    CapturingControl, MESSAGE_ID,
};
