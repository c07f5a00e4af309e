//! `seqflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `demo`  — run the built-in demonstration workflow and print its result.
//! - `shape` — print the keys the demonstration workflow produces.

mod config;
mod demo;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{InMemoryWorkflowRunner, WorkflowRunner};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "seqflow",
    about = "Run declared step sequences with conditions and repeats",
    version
)]
struct Cli {
    /// Enable debug output.
    #[arg(long, global = true)]
    debug: bool,

    /// Runner configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cap on executions of one runnable within a pass.
    #[arg(long, global = true, env = "SEQFLOW_MAX_REPEATS")]
    max_repeats: Option<u32>,

    /// Cap on passes over a repeating workflow.
    #[arg(long, global = true, env = "SEQFLOW_MAX_PASSES")]
    max_passes: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the demonstration workflow.
    Demo {
        /// Initial input as a JSON object.
        #[arg(long, default_value = demo::DEMO_INPUT)]
        input: String,
    },
    /// Print the demonstration workflow's result shape.
    Shape,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    match cli.command {
        Command::Demo { input } => {
            let config =
                config::load_runner_config(cli.config.as_deref(), cli.max_repeats, cli.max_passes)?;
            let input: Value = serde_json::from_str(&input).context("--input is not valid JSON")?;

            let workflow = demo::demo_workflow();
            let runner = InMemoryWorkflowRunner::with_config(config);
            let run_id = runner.run(&workflow, input).await?;
            info!(run_id = %run_id, "demo finished");

            let result = runner.get_result(&run_id)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Shape => {
            let workflow = demo::demo_workflow();
            println!("{}", serde_json::to_string_pretty(workflow.shape())?);
        }
    }

    Ok(())
}
