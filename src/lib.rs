use anyhow::Result;
use colored::Colorize;
use dotenvy::dotenv;
use std::sync::Arc;

pub mod attachments;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod logger;
pub mod openai;
pub mod orchestrator;
pub mod publisher;
pub mod relay;
pub mod remote;
pub mod sandbox;
pub mod session;
pub mod utils;

/// Run the application: load `.env`, load config, validate secrets and
/// serve the dashboard until the process exits.
pub async fn run() -> Result<()> {
    // Load environment variables from .env
    dotenv().ok();

    let config = config::AppConfig::load();
    let secrets = config::Secrets::from_env()?;

    let client = Arc::new(openai::OpenAiClient::new(&config, &secrets));
    let port = config.port;
    let state = Arc::new(dashboard::DashboardState::new(config, &secrets, client)?);

    println!(
        "{} {}",
        "Client dashboard:".bright_cyan().bold(),
        format!("http://127.0.0.1:{port}").underline()
    );
    dashboard::start_dashboard(state, port).await
}

// Re-exports for library consumers: common useful types
pub use config::{AppConfig, Secrets};
pub use error::AssistantError;
pub use orchestrator::{TurnOrchestrator, TurnReport};
pub use relay::{EventStream, RunEvent, RunStatus};
pub use remote::RemoteClient;
