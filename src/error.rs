use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conversation setup failed: {0}")]
    Setup(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Stream stalled: no data for {0:?}")]
    StreamStalled(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ChatError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ChatError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
