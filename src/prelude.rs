//! Convenience re-exports for common use.

pub use crate::config::OrchestratorConfig;
pub use crate::error::{Result, StepStreamError};
pub use crate::orchestrator::{
    Orchestrator, RunControl, RunHandle, RunResult, RunStatus, ToolOutputSink,
};
pub use crate::router::{route, RouteContext, StepConsumer};
pub use crate::store::{InMemoryStepStore, StepStore};
pub use crate::stream::EventStream;
pub use crate::tools::ToolOutputs;
pub use crate::types::{NewStep, Step, StepStatus, StepType, StreamEvent, ThreadMessage};
