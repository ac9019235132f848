//! Control-thread half of the host.

use crate::config::HostConfig;
use crate::pair::ModelPair;
use crate::preset::PresetLibrary;
use crate::state::HostState;
use crate::{LoadError, Result};
use ampnet_core::{AtomicMode, CollectorHandle, HandoffError, ProcessMode, SwapProducer};
use ampnet_neural::parse;
use arc_swap::ArcSwapOption;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the active model's text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Bundled model loaded when the host was built.
    Default,
    Text,
    File(PathBuf),
    Preset(String),
}

/// The most recently published model.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub text: String,
    pub source: ModelSource,
    /// Topology summary, e.g. `1 -> dense(8) -> tanh -> dense(1)`.
    pub summary: String,
    /// Handoff sequence number (0 for the model the host was built with).
    pub sequence: u64,
}

/// Read-only view of the controller, cheap to clone into UI threads.
#[derive(Clone)]
pub struct HostStatus {
    mode: Arc<AtomicMode>,
    model: Arc<ArcSwapOption<LoadedModel>>,
}

impl HostStatus {
    pub(crate) fn new(mode: Arc<AtomicMode>, model: Option<LoadedModel>) -> Self {
        Self {
            mode,
            model: Arc::new(ArcSwapOption::from_pointee(model)),
        }
    }

    pub fn mode(&self) -> ProcessMode {
        self.mode.get()
    }

    pub fn model(&self) -> Option<Arc<LoadedModel>> {
        self.model.load_full()
    }
}

/// Loads models, switches the execution path and persists host state.
///
/// Everything here may allocate, read files and block, so keep it off the
/// audio thread.
pub struct NeuralController {
    producer: SwapProducer<ModelPair>,
    status: HostStatus,
    presets: PresetLibrary,
    collector: CollectorHandle,
    config: HostConfig,
}

impl NeuralController {
    pub(crate) fn new(
        producer: SwapProducer<ModelPair>,
        status: HostStatus,
        collector: CollectorHandle,
        config: HostConfig,
    ) -> Self {
        Self {
            producer,
            status,
            presets: PresetLibrary::new(config.preset_dir.clone()),
            collector,
            config,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    pub fn status(&self) -> HostStatus {
        self.status.clone()
    }

    /// Parse `text`, build a model pair and hand it to the audio thread.
    ///
    /// On any error the active model keeps running.
    pub fn load_model_from_text(&mut self, text: &str) -> Result<()> {
        self.publish(text.to_owned(), ModelSource::Text)
    }

    pub fn load_model_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read model file {}: {}", path.display(), e);
            LoadError::io(path, e)
        })?;
        self.publish(text, ModelSource::File(path.to_path_buf()))
    }

    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        let text = self.presets.read(name).inspect_err(|e| {
            warn!("Failed to load preset '{}': {}", name, e);
        })?;
        self.publish(text, ModelSource::Preset(name.to_string()))
    }

    fn publish(&mut self, text: String, source: ModelSource) -> Result<()> {
        let descriptor = parse(&text).inspect_err(|e| warn!("Rejected model: {}", e))?;
        let pair =
            ModelPair::build(&descriptor).inspect_err(|e| warn!("Rejected model: {}", e))?;

        let sequence = match self.producer.request_swap(Box::new(pair)) {
            Ok(sequence) => sequence,
            Err(HandoffError::Timeout { waited, value }) => {
                warn!(
                    "Audio thread did not pick up the previous model within {:?}",
                    waited
                );
                drop(value);
                return Err(LoadError::SwapTimeout(waited));
            }
            Err(HandoffError::Disconnected { value }) => {
                warn!("Audio processor has been dropped; model not queued");
                drop(value);
                return Err(LoadError::ProcessorDropped);
            }
        };

        let summary = descriptor.summary();
        info!("Queued model #{} ({:?}): {}", sequence, source, summary);
        self.status.model.store(Some(Arc::new(LoadedModel {
            text,
            source,
            summary,
            sequence,
        })));
        self.collector.collect_now();
        Ok(())
    }

    pub fn set_mode(&self, mode: ProcessMode) {
        let previous = self.status.mode.swap(mode);
        if previous != mode {
            info!("Process mode: {} -> {}", previous, mode);
        }
    }

    pub fn mode(&self) -> ProcessMode {
        self.status.mode()
    }

    /// Source text of the last model handed to the audio thread.
    pub fn active_model_text(&self) -> Option<String> {
        self.status.model().map(|m| m.text.clone())
    }

    pub fn active_model(&self) -> Option<Arc<LoadedModel>> {
        self.status.model()
    }

    /// True while the audio thread has not yet adopted the last request.
    pub fn is_swap_pending(&self) -> bool {
        !self.producer.is_idle()
    }

    /// Sequence number of the most recent request the audio thread adopted.
    pub fn adopted_sequence(&self) -> u64 {
        self.producer.adopted()
    }

    /// Retired model pairs dropped so far by the collector thread.
    pub fn collected(&self) -> u64 {
        self.collector.collected()
    }

    pub fn save_state(&self) -> Result<Vec<u8>> {
        let model = self.status.model();
        let preset = model.as_ref().and_then(|m| match &m.source {
            ModelSource::Preset(name) => Some(name.clone()),
            _ => None,
        });
        let state = HostState::new(self.mode(), preset, model.map(|m| m.text.clone()));
        state.to_bytes()
    }

    /// Apply a blob produced by [`save_state`](Self::save_state). The mode is
    /// restored even if the saved model no longer loads.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<()> {
        let state = HostState::from_bytes(bytes)?;
        debug!(
            "Restoring state: mode {}, preset {:?}",
            state.mode, state.preset
        );
        self.set_mode(state.mode);

        match (state.model, state.preset) {
            (Some(text), preset) => {
                let source = preset.map(ModelSource::Preset).unwrap_or(ModelSource::Text);
                self.publish(text, source)
            }
            (None, Some(name)) => self.load_preset(&name),
            (None, None) => Ok(()),
        }
    }
}

impl std::fmt::Debug for NeuralController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuralController")
            .field("mode", &self.mode())
            .field("requested", &self.producer.requested())
            .field("adopted", &self.producer.adopted())
            .field("preset_dir", &self.presets.dir())
            .finish()
    }
}
