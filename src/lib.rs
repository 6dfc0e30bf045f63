//! Taskhub
//!
//! A work-task hub with:
//! - Issue-link resolution against a Jira-compatible tracker (direct issue
//!   links, JQL queries, project boards)
//! - Task-scoped chat channels over WebSocket with history replay
//! - An in-memory work-task registry deduplicated by tracker key

pub mod api;
pub mod chat;
pub mod error;
pub mod tasks;
pub mod tracker;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub tracker: TrackerYamlConfig,
    pub chat: ChatYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Tracker configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerYamlConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub request_timeout_secs: u64,
    /// Custom field id carrying the issue start date.
    pub start_date_field: String,
}

impl Default for TrackerYamlConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            request_timeout_secs: 30,
            start_date_field: "customfield_10015".into(),
        }
    }
}

/// Chat configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatYamlConfig {
    /// Number of messages replayed to a joining participant.
    pub history_page_size: usize,
}

impl Default for ChatYamlConfig {
    fn default() -> Self {
        Self {
            history_page_size: 200,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub tracker_base_url: String,
    pub tracker_email: String,
    pub tracker_api_token: String,
    pub tracker_timeout_secs: u64,
    pub tracker_start_date_field: String,
    pub chat_history_page_size: usize,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            tracker_base_url: std::env::var("TRACKER_BASE_URL").unwrap_or(yaml.tracker.base_url),
            tracker_email: std::env::var("TRACKER_EMAIL").unwrap_or(yaml.tracker.email),
            tracker_api_token: std::env::var("TRACKER_API_TOKEN").unwrap_or(yaml.tracker.api_token),
            tracker_timeout_secs: std::env::var("TRACKER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.tracker.request_timeout_secs),
            tracker_start_date_field: std::env::var("TRACKER_START_DATE_FIELD")
                .unwrap_or(yaml.tracker.start_date_field),
            chat_history_page_size: std::env::var("CHAT_HISTORY_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.chat.history_page_size),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Server bootstrap
// ============================================================================

/// Build state and serve the API until the listener is closed.
pub async fn start_server(config: Config) -> Result<()> {
    let tracker = Arc::new(tracker::JiraClient::new(
        &config.tracker_base_url,
        &config.tracker_email,
        &config.tracker_api_token,
        std::time::Duration::from_secs(config.tracker_timeout_secs),
        &config.tracker_start_date_field,
    )?);

    let store = Arc::new(chat::ChannelStore::new());
    let hub = Arc::new(chat::ChatHub::new(store, config.chat_history_page_size));
    let tasks = Arc::new(tasks::WorkTaskStore::new());

    let state = Arc::new(api::ServerState {
        hub,
        tasks,
        tracker,
        config: config.clone(),
    });

    let router = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, router)
        .await
        .context("Server error")?;
    Ok(())
}
