//! Configuration loading.
//!
//! Layered the usual way, lowest priority first: built-in defaults, an
//! optional YAML config file, `RAGCHAT_`-prefixed environment variables
//! (`__` separates sections, e.g. `RAGCHAT_API__BASE_URL`), then explicit
//! CLI flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::ApiConfig;
use crate::chat::ChatTuning;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "RAGCHAT_CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend base URL, e.g. http://localhost:8000/api
    #[arg(long, env = "RAGCHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Timeout in seconds for non-streaming requests
    #[arg(long, env = "RAGCHAT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Session to open at startup (most recent one otherwise)
    #[arg(long)]
    pub session: Option<String>,

    /// Use the single-shot chat endpoint instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

/// Fully resolved application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub chat: ChatSettings,
}

/// Backend connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Chat request and rendering settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    pub top_k: usize,
    pub memory_limit: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub history_limit: usize,
    pub streaming: bool,
}

impl AppConfig {
    /// Resolve configuration from defaults, file, environment, and CLI.
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("api.base_url", "http://localhost:8000/api")?
            .set_default("api.timeout_secs", 30)?
            .set_default("chat.top_k", 5)?
            .set_default("chat.memory_limit", 5)?
            .set_default("chat.max_tokens", 1000)?
            .set_default("chat.temperature", 0.7)?
            .set_default("chat.history_limit", 50)?
            .set_default("chat.streaming", true)?;

        // Explicit file beats the conventional ./ragchat.yaml fallback.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("ragchat").required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("RAGCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(base_url) = &cli.base_url {
            builder = builder.set_override("api.base_url", base_url.as_str())?;
        }
        if let Some(timeout) = cli.timeout_secs {
            builder = builder.set_override("api.timeout_secs", timeout)?;
        }
        if cli.no_stream {
            builder = builder.set_override("chat.streaming", false)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Connection settings for [`crate::api::ApiClient`].
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Request knobs for [`crate::chat::ChatView`].
    #[must_use]
    pub fn tuning(&self) -> ChatTuning {
        ChatTuning {
            top_k: self.chat.top_k,
            memory_limit: self.chat.memory_limit,
            max_tokens: self.chat.max_tokens,
            temperature: self.chat.temperature,
        }
    }
}
