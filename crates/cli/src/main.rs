//! LuxRig agent runner.
//!
//! Usage:
//!   luxrig list
//!   luxrig run code --task '{"action": "review", "code": "eval(x)"}'
//!   luxrig run revenue --task-file optimize.json
//!   luxrig memory task --limit 5
//!   luxrig reset research
//!
//! # Environment Variables
//!
//! - `LUXRIG_CONFIG` - Path to the TOML config file
//! - `LUXRIG_LLM_API_KEY` - API key for the language model endpoint
//! - `RUST_LOG` - Log filter (default: info,luxrig_agents=debug)

mod config;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use config::AppConfig;
use luxrig_agents::AgentRegistry;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "luxrig")]
#[command(author, version, about = "Run LuxRig agents from the command line", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "LUXRIG_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the agent types and their capabilities
    List,

    /// Run one task on an agent and print the result as JSON
    Run {
        /// Agent type, e.g. `research` or `code`
        agent_type: String,

        /// Task as inline JSON
        #[arg(long, conflicts_with = "task_file")]
        task: Option<String>,

        /// Read the task JSON from a file
        #[arg(long)]
        task_file: Option<PathBuf>,
    },

    /// Print an agent's most recent memory entries
    Memory {
        agent_type: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Clear an agent's memory, including durable history
    Reset { agent_type: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,luxrig_agents=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let registry = config.build_registry().await?;

    match cli.command {
        Command::List => list(&registry),
        Command::Run {
            agent_type,
            task,
            task_file,
        } => run(&registry, &agent_type, task, task_file).await,
        Command::Memory { agent_type, limit } => {
            let agent = registry.spawn_agent(&agent_type).await?;
            let entries = agent.recent_memory(limit).await;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        Command::Reset { agent_type } => {
            let agent = registry.spawn_agent(&agent_type).await?;
            agent.reset().await;
            println!("Cleared memory for {}", agent.id());
            Ok(())
        }
    }
}

fn list(registry: &AgentRegistry) -> anyhow::Result<()> {
    for agent_type in registry.available_types() {
        let agent = registry.create_agent(agent_type)?;
        let capabilities: Vec<&str> = agent.capabilities().iter().map(|c| c.as_str()).collect();
        println!("{agent_type:<12} {:<20} {}", agent.name(), capabilities.join(", "));
    }
    Ok(())
}

async fn run(
    registry: &AgentRegistry,
    agent_type: &str,
    task: Option<String>,
    task_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let raw = match (task, task_file) {
        (Some(task), _) => task,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read task file '{}'", path.display()))?,
        (None, None) => bail!("Provide a task with --task or --task-file"),
    };
    let task: serde_json::Value = serde_json::from_str(&raw).context("Task is not valid JSON")?;

    let agent = registry.spawn_agent(agent_type).await?;
    let result = agent.execute_json(task).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
