//! Error types for ampnet-core.

use thiserror::Error;

/// Error type for ampnet-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
