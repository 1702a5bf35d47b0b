use super::*;

pub(super) const MESSAGE_ID: &str = "msg_1";

pub(super) async fn registered_store() -> Arc<InMemoryStepStore> {
    let store = Arc::new(InMemoryStepStore::new());
    store
        .register_message(MESSAGE_ID)
        .await
        .expect("register message");
    store
}

pub(super) fn created() -> StreamEvent {
    StreamEvent::MessageCreated(ThreadMessage {
        id: "provider_msg".to_string(),
        content: Vec::new(),
    })
}

pub(super) fn delta(text: &str) -> StreamEvent {
    StreamEvent::delta(ThreadMessage::text("provider_msg", text))
}

pub(super) fn done() -> StreamEvent {
    StreamEvent::MessageDone(ThreadMessage::default())
}

pub(super) fn tool_call(id: &str, arguments: &str) -> StreamEvent {
    StreamEvent::ToolCallDone(ToolCall::function(id, "search", arguments))
}

/// Attach `events` to the shared test message and wait for the run.
pub(super) async fn run_events(orchestrator: &Orchestrator, events: Vec<StreamEvent>) -> RunResult {
    let handle = orchestrator
        .attach(MESSAGE_ID, crate::stream::from_events(events))
        .await
        .expect("attach run");
    timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("run wait timeout")
}

pub(super) fn capture_steps() -> (StepEventSink, Arc<Mutex<Vec<StepEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::<StepEvent>::new()));
    let sink_events = events.clone();
    let sink: StepEventSink = Arc::new(move |event| {
        if let Ok(mut guard) = sink_events.lock() {
            guard.push(event);
        }
    });
    (sink, events)
}

#[derive(Default)]
pub(super) struct CapturingControl {
    pub function_calls: Mutex<Vec<(String, usize)>>,
    pub stream_errors: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<RunStatus>>,
}

impl RunControl for CapturingControl {
    fn function_calls_required(&self, message_id: &str, count: usize) {
        self.function_calls
            .lock()
            .unwrap()
            .push((message_id.to_string(), count));
    }

    fn stream_error(&self, _message_id: &str, message: &str) {
        self.stream_errors.lock().unwrap().push(message.to_string());
    }

    fn run_finished(&self, _message_id: &str, result: &RunResult) {
        self.finished.lock().unwrap().push(result.status);
    }
}

pub(super) struct StaticLookup(pub UserTurn);

#[async_trait::async_trait]
impl ConversationLookup for StaticLookup {
    async fn find_last_user_turn(&self, _message_id: &str) -> Option<UserTurn> {
        Some(self.0.clone())
    }
}
