//! Error types for the training and checkpoint-sync runtime

use thiserror::Error;

/// Result type alias using the runtime Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the training runtime
#[derive(Error, Debug)]
pub enum Error {
    // Pre-flight errors: missing credentials, missing local directories
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // Remote provider failure distinct from not-found
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Remote key absent; expected during resume, drives the fresh-start branch
    #[error("Remote key not found: {key}")]
    KeyNotFound { key: String },

    // Unparseable remote key encountered while scanning a listing
    #[error("Malformed checkpoint key: {key}")]
    MalformedKey { key: String },

    // Model build/save/load failure reported by the trainer
    #[error("Model error: {message}")]
    Model { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error means a remote object was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }

    /// Returns true if this error indicates a fatal pre-flight condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config {
            message: e.to_string(),
        }
    }
}
