//! Builder wiring the controller and processor together.

use crate::config::HostConfig;
use crate::controller::{HostStatus, LoadedModel, ModelSource, NeuralController};
use crate::pair::ModelPair;
use crate::processor::NeuralProcessor;
use crate::Result;
use ampnet_core::{mailbox, retire_queue, AtomicMode, ProcessMode};
use ampnet_neural::{parse, StaticModel, DEFAULT_MODEL_JSON};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point: `NeuralHost::builder()...build()`.
pub struct NeuralHost;

impl NeuralHost {
    pub fn builder() -> NeuralHostBuilder {
        NeuralHostBuilder::default()
    }
}

/// Starts from [`HostConfig::default`]; individual setters override fields.
///
/// # Example
///
/// ```no_run
/// use ampnet::prelude::*;
///
/// let (mut controller, mut processor) = NeuralHost::builder()
///     .preset_dir("assets/models")
///     .swap_timeout(Some(std::time::Duration::from_millis(500)))
///     .build()?;
///
/// controller.load_preset("gru")?;
///
/// // audio thread
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// processor.process_block(&mut [&mut left[..], &mut right[..]]);
/// # Ok::<(), ampnet::LoadError>(())
/// ```
pub struct NeuralHostBuilder {
    config: HostConfig,
    initial_model: Option<String>,
}

impl Default for NeuralHostBuilder {
    fn default() -> Self {
        Self {
            config: HostConfig::default(),
            initial_model: Some(DEFAULT_MODEL_JSON.to_string()),
        }
    }
}

impl NeuralHostBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 5 ms
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// `None` waits forever. Default: 2 s
    pub fn swap_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.swap_timeout_ms = timeout.map_or(0, |t| t.as_millis().max(1) as u64);
        self
    }

    /// Default: 8
    pub fn retire_capacity(mut self, capacity: usize) -> Self {
        self.config.retire_capacity = capacity;
        self
    }

    /// Default: 50 ms
    pub fn collector_interval(mut self, interval: Duration) -> Self {
        self.config.collector_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn preset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.preset_dir = dir.into();
        self
    }

    /// Default: [`ProcessMode::Dynamic`]
    pub fn mode(mut self, mode: ProcessMode) -> Self {
        self.config.initial_mode = mode;
        self
    }

    /// Start with this model instead of the bundled one.
    pub fn initial_model(mut self, text: impl Into<String>) -> Self {
        self.initial_model = Some(text.into());
        self
    }

    /// Start with no dynamic model; the dynamic path passes audio through
    /// until one is loaded.
    pub fn without_initial_model(mut self) -> Self {
        self.initial_model = None;
        self
    }

    pub fn build(self) -> Result<(NeuralController, NeuralProcessor)> {
        let Self {
            config,
            initial_model,
        } = self;
        config.validate()?;

        let bundled = parse(DEFAULT_MODEL_JSON)?;
        let fixed = [
            StaticModel::from_descriptor(&bundled)?,
            StaticModel::from_descriptor(&bundled)?,
        ];

        let (active, loaded) = match initial_model {
            Some(text) => {
                let descriptor = parse(&text)?;
                let pair = Box::new(ModelPair::build(&descriptor)?);
                let source = if text == DEFAULT_MODEL_JSON {
                    ModelSource::Default
                } else {
                    ModelSource::Text
                };
                let loaded = LoadedModel {
                    summary: descriptor.summary(),
                    text,
                    source,
                    sequence: 0,
                };
                (Some(pair), Some(loaded))
            }
            None => (None, None),
        };

        let (producer, consumer) = mailbox::<ModelPair>();
        let producer = producer
            .with_poll_interval(config.poll_interval())
            .with_timeout(config.swap_timeout());
        let (retirer, collector) = retire_queue(config.retire_capacity);
        let collector = collector.spawn(config.collector_interval())?;

        let mode = Arc::new(AtomicMode::new(config.initial_mode));
        let status = HostStatus::new(Arc::clone(&mode), loaded);

        info!(
            "Neural host ready: mode {}, model {}",
            config.initial_mode,
            status
                .model()
                .map(|m| m.summary.clone())
                .unwrap_or_else(|| "none".to_string())
        );

        let processor = NeuralProcessor::new(consumer, retirer, active, fixed, mode);
        let controller = NeuralController::new(producer, status, collector, config);
        Ok((controller, processor))
    }
}
