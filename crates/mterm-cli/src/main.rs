mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mterm::completions::openai::{OpenAiConfig, OpenAiProvider};
use mterm::config::load_provider_configs;
use mterm::conversation::Conversation;
use mterm::dispatcher::ToolDispatcher;
use mterm::providers::connect_all;
use mterm::session_log::SessionLog;

use crate::session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model to use
    #[arg(short, long, default_value = "gpt-4o")]
    model: String,

    /// Path to the tool-provider configuration file
    #[arg(short, long, default_value = "mcp.json")]
    config: PathBuf,

    /// OpenAI API key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Do not mirror the transcript to session.jsonl
    #[arg(long)]
    no_session_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mterm=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let completions = match cli.api_key.clone() {
        Some(api_key) => {
            let host = std::env::var("OPENAI_HOST")
                .unwrap_or_else(|_| "https://api.openai.com".to_string());
            OpenAiProvider::new(OpenAiConfig { host, api_key })?
        }
        None => OpenAiProvider::from_env()
            .context("provide an API key via --api-key or OPENAI_API_KEY")?,
    };

    let configs = load_provider_configs(&cli.config);
    let (providers, registry) = connect_all(&configs).await;
    let dispatcher = ToolDispatcher::new(Arc::new(registry), providers);

    let session_log = (!cli.no_session_log).then(SessionLog::in_current_dir);
    let conversation = Conversation::new(
        Box::new(completions),
        dispatcher,
        cli.model.clone(),
        session_log,
    );

    let mut session = Session::new(conversation);
    session.start().await
}
