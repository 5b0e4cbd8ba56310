//! Paper Digest — Binary Entrypoint
//! Loads configuration, wires the arXiv provider and the LLM client, and
//! runs one pipeline invocation. Pass `--resume` to restart from the
//! candidates checkpoint of a previous run.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paper_digest::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use paper_digest::ingest::arxiv::ArxivProvider;
use paper_digest::llm::{DynLlmClient, OpenAiClient};
use paper_digest::pipeline;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("paper_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut resume = false;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    for arg in std::env::args().skip(1) {
        if arg == "--resume" {
            resume = true;
        } else {
            config_path = arg;
        }
    }

    let cfg = PipelineConfig::from_path(&config_path)?;
    let llm: DynLlmClient = Arc::new(OpenAiClient::from_env(cfg.model.clone())?);

    let report = if resume {
        pipeline::resume(&cfg, &llm).await?
    } else {
        let provider = ArxivProvider::new()?;
        pipeline::run(&cfg, &provider, &llm).await?
    };

    println!(
        "Report for {} to {}: {} papers across {} topics",
        report.date_range.start,
        report.date_range.end,
        report.paper_count,
        report.topics.len()
    );
    for group in &report.groups {
        println!("  {}: {} papers", group.topic, group.papers.len());
    }
    Ok(())
}
