use std::io;

use thiserror::Error;

/// Bad operator input. Prompts show the message and ask again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("tunnel '{0}' not found")]
    NotFound(String),

    #[error("tunnel '{0}' already exists")]
    DuplicateName(String),

    #[error("tunnel '{0}' is already running")]
    AlreadyRunning(String),

    #[error("tunnel '{0}' is not running")]
    NotRunning(String),

    #[error("{0}")]
    ExternalTool(String),

    #[error("authentication with Cloudflare failed: {0}")]
    Auth(String),

    #[error("cloudflared is not installed (looked for '{0}')")]
    NotInstalled(String),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TunnelError>;
