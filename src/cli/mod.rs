//! CLI entry point for stepstream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::BufReader;

use crate::config::{AssistantSettings, OrchestratorConfig};
use crate::error::Result;
use crate::orchestrator::{Orchestrator, RunResult};
use crate::router::{route, RouteContext, RouteSummary, TextRenderer};
use crate::store::{InMemoryStepStore, StepStore};
use crate::stream;
use crate::types::Step;

/// Stepstream CLI
#[derive(Parser, Debug)]
#[command(name = "stepstream", version, about = "Replay assistant run streams into step logs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded event stream through the orchestrator
    Replay(ReplayArgs),
    /// Print the resolved configuration
    Config,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// JSON Lines file with one `{"event", "data"}` object per line
    pub path: PathBuf,

    /// Message id the steps are recorded under
    #[arg(long, default_value = "replay")]
    pub message_id: String,

    /// Tool calls allowed before the run fails
    #[arg(long)]
    pub tool_call_limit: Option<usize>,

    /// Idle bound before the message is flagged unresponsive
    #[arg(long)]
    pub idle_timeout_ms: Option<u64>,

    /// Print the router classification of each step
    #[arg(long)]
    pub route: bool,

    /// Print one line of text per step instead of JSON
    #[arg(long)]
    pub text: bool,
}

impl ReplayArgs {
    /// Command-line values layered over `base`.
    pub fn config(&self, base: OrchestratorConfig) -> Result<OrchestratorConfig> {
        let mut config = base;
        if let Some(limit) = self.tool_call_limit {
            config.tool_call_limit = limit;
        }
        if let Some(ms) = self.idle_timeout_ms {
            config.idle_timeout = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub message_id: String,
    pub result: RunResult,
    pub unresponsive: bool,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteSummary>>,
}

impl ReplayReport {
    /// One line per step, rendered through the router.
    pub fn render_text(&self) -> Result<Vec<String>> {
        let cx = RouteContext::new(&self.message_id);
        self.steps
            .iter()
            .map(|step| route(step, &mut TextRenderer, &cx))
            .collect()
    }
}

/// Replay the recorded stream at `args.path` against an in-memory store.
pub async fn handle_replay(args: &ReplayArgs, base: OrchestratorConfig) -> Result<ReplayReport> {
    let config = args.config(base)?;
    let file = tokio::fs::File::open(&args.path).await?;
    let events = stream::from_json_lines(BufReader::new(file));

    let store = Arc::new(InMemoryStepStore::new());
    store.register_message(&args.message_id).await?;
    let orchestrator = Orchestrator::new(store.clone(), config);

    let handle = orchestrator.attach(args.message_id.clone(), events).await?;
    let mut unresponsive = handle.unresponsive();
    let result = handle.wait().await;

    let steps = store.steps(&args.message_id).await?;
    if steps.is_empty() {
        // An empty log is flagged once the idle bound runs out.
        let _ = unresponsive.wait_for(|flag| *flag).await;
    }
    let routes = args
        .route
        .then(|| steps.iter().map(RouteSummary::of).collect());
    let unresponsive = *unresponsive.borrow();
    Ok(ReplayReport {
        message_id: args.message_id.clone(),
        result,
        unresponsive,
        steps,
        routes,
    })
}

/// Resolved configuration, as printed by `stepstream config`.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub orchestrator: OrchestratorConfig,
    pub assistant: AssistantSettings,
    pub provider: &'static str,
}

pub fn handle_config() -> ConfigReport {
    let assistant = AssistantSettings::from_env();
    ConfigReport {
        orchestrator: *OrchestratorConfig::global(),
        provider: assistant.provider_name(),
        assistant,
    }
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
