//! Configuration schema for Tavern.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fallback greeting shown when a character has no short greeting.
pub const DEFAULT_FALLBACK_GREETING: &str = "Hi! How can I help you today? 😊";
/// Assistant text appended when reply generation fails.
pub const DEFAULT_SEND_FAILURE_REPLY: &str = "Sorry, I had trouble responding. Please try again.";

/// Root config for the Tavern client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TavernConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TavernConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> TavernConfigBuilder {
        TavernConfigBuilder::new()
    }
}

/// Builder for assembling a `TavernConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct TavernConfigBuilder {
    config: TavernConfig,
}

impl TavernConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: TavernConfig::default(),
        }
    }

    /// Replace the backend API configuration.
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.config.api = api;
        self
    }

    /// Override only the API base url.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    /// Replace the chat text configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the identity configuration.
    pub fn identity(mut self, identity: IdentityConfig) -> Self {
        self.config.identity = identity;
        self
    }

    /// Replace the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Finalize and return the built `TavernConfig`.
    pub fn build(self) -> TavernConfig {
        self.config
    }
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tavern/{}", env!("CARGO_PKG_VERSION"))
}

/// Text used by the chat orchestrator for synthesized assistant turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    #[serde(default = "default_fallback_greeting")]
    pub fallback_greeting: String,
    #[serde(default = "default_send_failure_reply")]
    pub send_failure_reply: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_greeting: default_fallback_greeting(),
            send_failure_reply: default_send_failure_reply(),
        }
    }
}

fn default_fallback_greeting() -> String {
    DEFAULT_FALLBACK_GREETING.to_string()
}

fn default_send_failure_reply() -> String {
    DEFAULT_SEND_FAILURE_REPLY.to_string()
}

/// Location of the stored credential.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Token file path; defaults to `~/.tavern/token.json` when unset.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl IdentityConfig {
    /// Configured token path, or the default under the user home.
    pub fn resolved_token_path(&self) -> Option<PathBuf> {
        self.token_path
            .clone()
            .or_else(crate::loader::default_token_path)
    }
}

/// Log output settings for binaries.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log file; binaries that own the terminal write here instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: Option<String>,
}
