use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum NodeError {
    #[error("Link command failed: {0}")]
    LinkCommand(String),

    #[error("Time synchronization failed: {0}")]
    TimeSync(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Master replied with HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GPIO error on pin {pin}: {message}")]
    Gpio { pin: u32, message: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
