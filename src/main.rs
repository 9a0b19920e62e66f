mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use keel::config::KeelConfig;

#[derive(Parser)]
#[command(name = "keel", version, about = "Retrieval-augmented execution core for agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one agent execution against a message
    Ask {
        /// Agent identifier (doubles as the vector namespace)
        #[arg(long)]
        agent: String,
        /// The user message
        message: String,
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// System prompt for the agent
        #[arg(long, default_value = "You are a helpful assistant.")]
        system_prompt: String,
        /// Model identifier
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// Sampling temperature
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,
        /// Maximum tokens to generate
        #[arg(long, default_value_t = 1024)]
        max_tokens: u32,
        /// Disable document grounding for this agent
        #[arg(long)]
        no_retrieval: bool,
    },
    /// Ingest a document for an agent
    Ingest {
        /// Agent identifier (doubles as the vector namespace)
        #[arg(long)]
        agent: String,
        /// Path to the document to ingest
        file: PathBuf,
        /// Flat JSON object of metadata, e.g. '{"source": "manual"}'
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Check configuration and connectivity to the backing services
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = KeelConfig::load()?;

    let filter = EnvFilter::try_new(&config.runtime.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Ask {
            agent,
            message,
            session,
            system_prompt,
            model,
            temperature,
            max_tokens,
            no_retrieval,
        } => {
            let profile = keel::engine::types::AgentConfig {
                id: agent.clone(),
                name: agent,
                system_prompt,
                model,
                temperature,
                max_tokens,
                provider: config.provider.kind.clone(),
                retrieval_enabled: !no_retrieval,
            };
            cli::ask(&config, &profile, session, &message).await?;
        }
        Command::Ingest {
            agent,
            file,
            metadata,
        } => {
            cli::ingest(&config, &agent, &file, metadata.as_deref()).await?;
        }
        Command::Doctor => {
            cli::doctor(&config).await?;
        }
    }

    Ok(())
}
