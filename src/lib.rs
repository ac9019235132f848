//! # ampnet - hot-swappable neural models for real-time audio
//!
//! Loads small feed-forward/recurrent networks from JSON and runs them per
//! sample inside an audio callback. New models are parsed and built on a
//! control thread and handed to the audio thread without locks; superseded
//! models are freed on a background collector thread.
//!
//! ## Architecture
//!
//! ampnet is an umbrella crate over:
//! - **ampnet-core** - Handoff mailbox, retirement queue, process-mode flag
//! - **ampnet-neural** - Model descriptors, JSON parsing, layer math, dynamic and static models
//!
//! It adds the host pieces: [`NeuralHost`] (builder), [`NeuralController`]
//! (control thread) and [`NeuralProcessor`] (audio thread).
//!
//! ## Quick Start
//!
//! ```no_run
//! use ampnet::prelude::*;
//!
//! let (mut controller, mut processor) = NeuralHost::builder().build()?;
//!
//! // control thread
//! controller.load_model_from_file("my_amp.json")?;
//! controller.set_mode(ProcessMode::Dynamic);
//!
//! // audio thread
//! let mut left = vec![0.0f32; 128];
//! let mut right = vec![0.0f32; 128];
//! processor.process_block(&mut [&mut left[..], &mut right[..]]);
//! # Ok::<(), LoadError>(())
//! ```

/// Re-export of ampnet-core for direct access
pub use ampnet_core as core;
/// Re-export of ampnet-neural for direct access
pub use ampnet_neural as neural;

pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod pair;
pub mod preset;
pub mod processor;
pub mod state;

pub use config::HostConfig;
pub use controller::{HostStatus, LoadedModel, ModelSource, NeuralController};
pub use error::{LoadError, Result, LOAD_FAILURE_MESSAGE};
pub use host::{NeuralHost, NeuralHostBuilder};
pub use pair::{ModelPair, MODEL_CHANNELS};
pub use preset::{PresetLibrary, BUILTIN_PRESETS};
pub use processor::NeuralProcessor;
pub use state::{HostState, STATE_VERSION};

pub use ampnet_core::ProcessMode;
pub use ampnet_neural::{
    parse, to_json, BuildError, DynamicModel, ModelDescriptor, ParseError, SampleModel,
    StaticModel, DEFAULT_MODEL_JSON,
};

pub mod prelude {
    pub use crate::{
        HostConfig, LoadError, NeuralController, NeuralHost, NeuralProcessor, ProcessMode,
        Result, SampleModel,
    };
}
