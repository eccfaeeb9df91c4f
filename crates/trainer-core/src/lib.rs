//! Trainer Core - Foundation for the card-set training runtime
//!
//! Provides core types, error handling, and credential loading for the
//! checkpoint-and-cloud-sync training system.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Credentials, DEFAULT_CREDENTIALS_PATH};
pub use error::{Error, Result};
pub use types::*;
