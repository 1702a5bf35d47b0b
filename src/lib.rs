//! Stepstream: streaming event orchestrator for assistant runs.
//!
//! Consumes the event stream of an assistant run and records it as an ordered
//! Step Log per message: streamed message text, tool calls, run failures.
//! A per-run guard caps tool calls, an idle watchdog flags messages that stay
//! empty for too long, and the router hands stored steps to per-kind
//! renderers.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stepstream::prelude::*;
//!
//! # async fn example() -> stepstream::error::Result<()> {
//! let store = Arc::new(InMemoryStepStore::new());
//! store.register_message("msg_1").await?;
//!
//! let orchestrator = Orchestrator::new(store.clone(), OrchestratorConfig::default());
//! let (events, stream) = stepstream::stream::channel();
//! let handle = orchestrator.attach("msg_1", stream).await?;
//!
//! events.send(StreamEvent::MessageCreated(ThreadMessage::text("m", "")));
//! events.send(StreamEvent::End);
//! let result = handle.wait().await;
//! println!("{:?}: {} steps", result.status, store.steps("msg_1").await?.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod router;
pub mod store;
pub mod stream;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
