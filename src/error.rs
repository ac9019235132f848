//! Centralized error type for the ampnet umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate
//! boundaries. Every variant is raised on a control thread; the audio thread
//! never sees an error.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Text shown to the user when a model file cannot be loaded.
pub const LOAD_FAILURE_MESSAGE: &str =
    "Couldn't read from the specified file, or file is not json, or it is incompatible json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model: {0}")]
    Parse(#[from] ampnet_neural::ParseError),

    #[error("Model: {0}")]
    Build(#[from] ampnet_neural::BuildError),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("Previous model swap still pending after {0:?}; is the audio thread running?")]
    SwapTimeout(Duration),

    #[error("Audio processor has been dropped")]
    ProcessorDropped,

    #[error("Invalid saved state: {0}")]
    State(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] ampnet_core::Error),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short message suitable for a notification in a host UI.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Parse(_) | LoadError::Build(_) | LoadError::Io { .. } => {
                LOAD_FAILURE_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
