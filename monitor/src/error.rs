//! Error types for the monitor crate

use shared::WireError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while querying the server over UDP
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not resolve {0}")]
    Resolve(String),

    #[error("query I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("query timed out while {0}")]
    Timeout(&'static str),

    #[error("malformed query reply: {0}")]
    Malformed(#[from] WireError),
}

impl QueryError {
    /// Network trouble as opposed to a server speaking nonsense
    pub fn is_transient(&self) -> bool {
        !matches!(self, QueryError::Malformed(_))
    }
}

/// Failures while running a console command
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("could not resolve {0}")]
    Resolve(String),

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("console timed out while {0}")]
    Timeout(&'static str),

    #[error("auth response was {0} bytes, expected 14")]
    ShortResponse(usize),

    #[error("malformed console reply: {0}")]
    Malformed(#[from] WireError),

    #[error("console authentication rejected, is the password right?")]
    AuthRejected,
}

/// Failures while loading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file \"{0}\" doesn't exist")]
    NotFound(PathBuf),

    #[error("can't read config file \"{path}\": {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no host specified in config")]
    MissingHost,
}

/// Failures while updating the external notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected Telegram API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Telegram API answered ok without a message")]
    MissingResult,

    #[error("can't store message id: {0}")]
    Store(#[from] std::io::Error),

    #[error("can't encode message id: {0}")]
    Encode(#[from] bincode::Error),
}

/// Conditions that stop the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("console authentication rejected, monitoring stopped")]
    AuthRejected,
}
