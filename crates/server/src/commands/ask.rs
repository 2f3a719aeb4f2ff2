//! Ask command handler.
//!
//! Runs the pipeline once: ranked source URLs go to stderr, the answer to
//! stdout.

use clap::Args;
use futures::StreamExt;
use sift_core::{config::AppConfig, AppResult, Query};
use sift_server::Pipeline;
use std::io::Write;

/// Answer one question from the terminal
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Wait for the full answer instead of streaming fragments
    #[arg(long)]
    pub no_stream: bool,

    /// Print the answer and ranked sources as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Ask command options: {:?}", self);

        let query = Query::parse(&self.query)?;
        let pipeline = Pipeline::from_config(config)?;

        if self.json || self.no_stream {
            self.handle_aggregate(&pipeline, &query).await
        } else {
            self.handle_streaming(&pipeline, &query).await
        }
    }

    async fn handle_aggregate(&self, pipeline: &Pipeline, query: &Query) -> AppResult<()> {
        let response = pipeline.answer(query).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_sources(response.sources.iter().map(|s| s.url.as_str()));
            println!("{}", response.answer);
        }
        Ok(())
    }

    async fn handle_streaming(&self, pipeline: &Pipeline, query: &Query) -> AppResult<()> {
        let sources = pipeline.retrieve(query).await?;
        print_sources(sources.iter().map(|s| s.url.as_str()));

        let mut fragments = pipeline.stream_answer(query, &sources).await?;
        let mut stdout = std::io::stdout();
        let mut fragment_count = 0;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            print!("{}", fragment);
            stdout.flush()?;
            fragment_count += 1;
        }
        println!();

        tracing::debug!(fragments = fragment_count, "Streaming complete");
        Ok(())
    }
}

fn print_sources<'a>(urls: impl Iterator<Item = &'a str>) {
    for (i, url) in urls.enumerate() {
        eprintln!("[{}] {}", i + 1, url);
    }
    eprintln!();
}
