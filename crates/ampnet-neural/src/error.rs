//! Error types for model parsing and instantiation.

use thiserror::Error;

/// Width or weight-length disagreement at a specific layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("layer {layer}: {detail}")]
pub struct ShapeMismatch {
    /// Index of the offending layer in the document (or descriptor).
    pub layer: usize,
    pub detail: String,
}

impl ShapeMismatch {
    pub fn new(layer: usize, detail: impl Into<String>) -> Self {
        Self {
            layer,
            detail: detail.into(),
        }
    }
}

/// Errors from [`parse`](crate::parse). Parsing is all-or-nothing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed model document: {0}")]
    Malformed(String),

    #[error("Unsupported layer {layer}: '{name}'")]
    UnsupportedLayer { layer: usize, name: String },

    #[error("Shape mismatch at {0}")]
    ShapeMismatch(#[from] ShapeMismatch),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Malformed(err.to_string())
    }
}

/// Errors from building a model instance out of a descriptor.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Model has no layers")]
    Empty,

    #[error("Model must be {expected_in}-in/{expected_out}-out, got {inputs}-in/{outputs}-out")]
    Arity {
        expected_in: usize,
        expected_out: usize,
        inputs: usize,
        outputs: usize,
    },

    #[error("Shape mismatch at {0}")]
    ShapeMismatch(#[from] ShapeMismatch),

    #[error("Descriptor does not match the fixed topology ({expected}): {detail}")]
    TopologyMismatch {
        expected: &'static str,
        detail: String,
    },
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
pub type BuildResult<T> = std::result::Result<T, BuildError>;
