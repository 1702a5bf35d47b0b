//! Event stream sources.
//!
//! A run is consumed as an [`EventStream`]. Items are yielded in the order the
//! provider produced them; an `Err` item is a transport failure and ends the run.

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::StepStreamError;
use crate::types::StreamEvent;

/// Boxed stream of run events.
pub type EventStream = BoxStream<'static, Result<StreamEvent, StepStreamError>>;

/// Stream over a fixed list of events.
pub fn from_events(events: Vec<StreamEvent>) -> EventStream {
    stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Push side of a [`channel`] stream.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Result<StreamEvent, StepStreamError>>,
}

impl EventSender {
    /// Queue an event. Returns `false` once the run has dropped its stream.
    pub fn send(&self, event: StreamEvent) -> bool {
        self.tx.send(Ok(event)).is_ok()
    }

    /// Queue a transport failure.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.tx
            .send(Err(StepStreamError::Transport(message.into())))
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Stream fed by an [`EventSender`]. Dropping every sender ends the stream.
pub fn channel() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, UnboundedReceiverStream::new(rx).boxed())
}

/// Parse one line of a JSON Lines event log.
pub fn parse_event_line(line: &str) -> Result<StreamEvent, StepStreamError> {
    Ok(serde_json::from_str(line)?)
}

/// Stream events from a JSON Lines reader, one `{"event", "data"}` object per line.
///
/// Blank lines are skipped. The first unreadable or unparsable line is yielded
/// as an error and ends the stream.
pub fn from_json_lines<R>(reader: R) -> EventStream
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    let events = async_stream::stream! {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_event_line(line) {
                        Ok(event) => yield Ok(event),
                        Err(err) => {
                            yield Err(err);
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    yield Err(StepStreamError::Io(err));
                    break;
                }
            }
        }
    };
    Box::pin(events)
}
