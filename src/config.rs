use crate::error::{ChatError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::time::Duration;

const DEFAULT_USER_ID: &str = "1";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum silence between two body reads; `0` disables the check
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl StreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn parse_secs(name: &str, value: String) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|e| ChatError::ConfigError(format!("Invalid {} value: {}", name, e)))
}

impl ChatConfig {
    /// Configuration with defaults for everything but the service URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ChatConfig {
            server: ServerConfig {
                base_url: base_url.into(),
                user_id: default_user_id(),
            },
            stream: StreamConfig::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("AGENT_CHAT_BASE_URL")
            .map_err(|_| ChatError::ConfigError("AGENT_CHAT_BASE_URL not set".to_string()))?;

        let user_id = env::var("AGENT_CHAT_USER_ID").unwrap_or_else(|_| default_user_id());

        let connect_timeout_secs = match env::var("AGENT_CHAT_CONNECT_TIMEOUT") {
            Ok(value) => parse_secs("AGENT_CHAT_CONNECT_TIMEOUT", value)?,
            Err(_) => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        let idle_timeout_secs = match env::var("AGENT_CHAT_IDLE_TIMEOUT") {
            Ok(value) => parse_secs("AGENT_CHAT_IDLE_TIMEOUT", value)?,
            Err(_) => DEFAULT_IDLE_TIMEOUT_SECS,
        };

        Ok(ChatConfig {
            server: ServerConfig { base_url, user_id },
            stream: StreamConfig {
                connect_timeout_secs,
                idle_timeout_secs,
            },
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        let mut config: ChatConfig = toml::from_str(&contents)
            .map_err(|e| ChatError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        if let Ok(base_url) = env::var("AGENT_CHAT_BASE_URL") {
            config.server.base_url = base_url;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = self.server.base_url.trim();
        if base_url.is_empty() {
            return Err(ChatError::ConfigError("Base URL is empty".to_string()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ChatError::ConfigError(format!(
                "Base URL must start with http:// or https://: {}",
                base_url
            )));
        }

        if self.server.user_id.trim().is_empty() {
            return Err(ChatError::ConfigError("User ID is empty".to_string()));
        }

        if self.stream.connect_timeout_secs == 0 {
            return Err(ChatError::ConfigError(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
