use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid clipping thresholds: {0}")]
    InvalidThresholdSpec(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, PulseError>;
