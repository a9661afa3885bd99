use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Upper bound on document length in characters
    pub max_content_length: Option<usize>,

    /// Document content at startup
    #[serde(default)]
    pub initial_text: String,

    /// Broadcasts buffered per connection before a slow client starts skipping
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Updates waiting to be applied before senders are held back
    #[serde(default = "default_update_queue_capacity")]
    pub update_queue_capacity: usize,

    /// How long an issued but unconnected user id stays active
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        envy::from_env::<Config>().map_err(ConfigError::EnvError)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Default tracing filter when RUST_LOG is not set
    pub fn log_filter(&self) -> String {
        format!(
            "colab_markdown={lvl},tower_http={lvl},axum::rejection=trace,{lvl}",
            lvl = self.log_level
        )
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            max_content_length: None,
            initial_text: String::new(),
            broadcast_capacity: default_broadcast_capacity(),
            update_queue_capacity: default_update_queue_capacity(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colab-markdown".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_update_queue_capacity() -> usize {
    1024
}

fn default_session_idle_secs() -> u64 {
    60 * 60
}
