use thiserror::Error;

/// Errors that can escape the bridge core.
///
/// Almost everything in the bridge is non-fatal and handled in place;
/// these surface the few conditions that are not (bind failure, invalid
/// startup configuration) plus the string-typed categories the delivery
/// pipeline converts into queue entries.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
