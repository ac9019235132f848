//! Neural network descriptors and per-sample inference for ampnet.
//!
//! # Primary API
//!
//! - [`parse`] / [`to_json`]: JSON model document ⇄ [`ModelDescriptor`]
//! - [`DynamicModel`]: layer sequence chosen at run time
//! - [`StaticModel`]: fixed topology with const-generic layer widths
//! - [`SampleModel`]: the one-sample-in, one-sample-out contract both share
//!
//! Parsing and building allocate and belong on a control thread. Once built,
//! `forward` and `reset` touch only memory the model already owns.
//!
//! # Example
//!
//! ```
//! use ampnet_neural::{parse, DynamicModel, SampleModel, StaticModel, DEFAULT_MODEL_JSON};
//!
//! let descriptor = parse(DEFAULT_MODEL_JSON)?;
//! let mut dynamic = DynamicModel::build(&descriptor)?;
//! let mut fixed = StaticModel::from_descriptor(&descriptor)?;
//!
//! let a = dynamic.forward(0.25);
//! let b = fixed.forward(0.25);
//! assert!((a - b).abs() < 1e-5);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod export;
pub mod layers;
mod model;
mod parse;
mod static_model;

pub use descriptor::{ActivationKind, LayerSpec, ModelDescriptor};
pub use error::{BuildError, BuildResult, ParseError, ParseResult, ShapeMismatch};
pub use export::{to_json, to_json_pretty};
pub use model::{DynamicModel, SampleModel};
pub use parse::{parse, DEFAULT_BATCHNORM_EPSILON};
pub use static_model::{Conv1dT, DenseT, GruT, StaticModel, TanhT, STATIC_TOPOLOGY};

/// Model loaded when nothing else has been chosen. Its topology matches
/// [`StaticModel`], so both execution paths can run it.
pub const DEFAULT_MODEL_JSON: &str = include_str!("../assets/default_model.json");
