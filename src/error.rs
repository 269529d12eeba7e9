use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound message that could not be parsed or carries an unknown kind
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reading or usage entry missing both unit representations
    #[error("Malformed sample: {0}")]
    MalformedSample(String),

    /// Duplex channel failed to open, dropped, or refused a write
    #[error("Channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
