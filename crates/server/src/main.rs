//! sift CLI
//!
//! Main entry point for the sift binary.
//! Serves the web-search answer pipeline, or runs it once from the terminal.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand};
use sift_core::{config::AppConfig, logging};
use std::path::PathBuf;
use tracing::Instrument;

/// sift - web search, ranking and streamed LLM answers
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Answer questions from ranked web search results", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./sift.yaml when present)
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider (ollama, gemini)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP / WebSocket server
    Serve(ServeCommand),

    /// Answer one question from the terminal
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let (bind, pacing_ms) = match &cli.command {
        Commands::Serve(cmd) => (cmd.bind.clone(), cmd.pacing_ms),
        Commands::Ask(_) => (None, None),
    };
    let config = config.with_overrides(
        bind,
        pacing_ms,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.validate().context("invalid configuration")?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("sift starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("LLM: {} / {}", config.llm.provider, config.llm.model_name());
    tracing::debug!(
        "Search: {} (max {} results), ranking: {}",
        config.search.provider,
        config.search.max_results,
        config.ranking.strategy
    );

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
