//! Stepstream CLI binary entry point.

use clap::Parser;
use stepstream::cli::{Cli, Commands, ReplayArgs};
use stepstream::config::OrchestratorConfig;
use stepstream::orchestrator::RunStatus;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => handle_replay(args).await,
        Commands::Config => handle_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_replay(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report = stepstream::cli::handle_replay(&args, *OrchestratorConfig::global()).await?;

    if args.text {
        for line in report.render_text()? {
            println!("{line}");
        }
        if let Some(routes) = &report.routes {
            for summary in routes {
                eprintln!("{} -> {}", summary.step_id, summary.route);
            }
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if report.result.status == RunStatus::Failed {
        if let Some(err) = report.result.error {
            return Err(err.into());
        }
    }

    Ok(())
}

fn handle_config() -> Result<(), Box<dyn std::error::Error>> {
    let report = stepstream::cli::handle_config();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
