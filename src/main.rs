//! Taskhub - Main Server
//!
//! Work-task hub: issue-link resolution plus task-scoped chat channels.

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskhub::tracker::resolve_link;
use taskhub::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskhub")]
#[command(about = "Work-task hub server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the hub server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Resolve a tracker link and print the work items as JSON
    Resolve {
        /// Tracker URL to resolve
        link: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,taskhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            config.server_port = port;
            taskhub::start_server(config).await
        }
        Commands::Resolve { link } => run_resolve(config, &link).await,
    }
}

async fn run_resolve(config: Config, link: &str) -> Result<()> {
    let tracker = taskhub::tracker::JiraClient::new(
        &config.tracker_base_url,
        &config.tracker_email,
        &config.tracker_api_token,
        std::time::Duration::from_secs(config.tracker_timeout_secs),
        &config.tracker_start_date_field,
    )?;

    let resolution = resolve_link(
        link,
        &config.tracker_base_url,
        &tracker,
        &CancellationToken::new(),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&resolution.items)?);
    if resolution.truncated {
        eprintln!("(result truncated)");
    }
    Ok(())
}
