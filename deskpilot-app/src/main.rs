use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use deskpilot_core::EngineError;
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(about = "Human-in-the-loop desktop automation agent", long_about = None)]
struct Cli {
    /// What the agent should do.
    #[arg(required = true)]
    prompt: Vec<String>,

    /// Classify the prompt once and run a single strategy instead of the
    /// planned multi-step workflow.
    #[arg(long)]
    single: bool,

    /// Path to the configuration file.
    #[arg(long, default_value = "deskpilot.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              Deskpilot Automation Agent                          ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let config = Config::load(&cli.config)?;
    let prompt = cli.prompt.join(" ");

    let result = if cli.single {
        bootstrap::build_router(&config).run(&prompt).await
    } else {
        bootstrap::build_orchestrator(&config).run(&prompt).await
    };

    let report = match result {
        Ok(report) => report,
        Err(EngineError::PlanRejected) => {
            println!("🛑 Execution plan rejected. Nothing was run.");
            return Ok(ExitCode::FAILURE);
        }
        Err(EngineError::ConsoleClosed) => {
            println!("🛑 Console input closed. Stopping.");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
