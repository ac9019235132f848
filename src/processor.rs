//! Audio-thread half of the host.

use crate::pair::{ModelPair, MODEL_CHANNELS};
use ampnet_core::{AtomicMode, ProcessMode, Retirer, SwapConsumer};
use ampnet_neural::{SampleModel, StaticModel};
use std::sync::Arc;

/// Runs the active model over each audio block.
///
/// Every method is real-time safe: nothing here allocates, frees, locks or
/// logs. Superseded model pairs are pushed to the collector thread.
pub struct NeuralProcessor {
    consumer: SwapConsumer<ModelPair>,
    retirer: Retirer<Box<ModelPair>>,
    active: Option<Box<ModelPair>>,
    fixed: [StaticModel; MODEL_CHANNELS],
    mode: Arc<AtomicMode>,
}

impl NeuralProcessor {
    pub(crate) fn new(
        consumer: SwapConsumer<ModelPair>,
        retirer: Retirer<Box<ModelPair>>,
        active: Option<Box<ModelPair>>,
        fixed: [StaticModel; MODEL_CHANNELS],
        mode: Arc<AtomicMode>,
    ) -> Self {
        Self {
            consumer,
            retirer,
            active,
            fixed,
            mode,
        }
    }

    /// Host is about to start streaming. Clears all model state.
    ///
    /// Models step once per sample at any rate and process blocks of any
    /// length, so neither argument changes processing.
    pub fn prepare(&mut self, _sample_rate: f64, _max_block_size: usize) {
        self.reset();
    }

    pub fn reset(&mut self) {
        if let Some(pair) = self.active.as_deref_mut() {
            pair.reset();
        }
        for model in &mut self.fixed {
            model.reset();
        }
    }

    /// Sequence number of the model pair in use (0 for the initial model).
    pub fn active_sequence(&self) -> u64 {
        self.consumer.adopted()
    }

    pub fn has_model(&self) -> bool {
        self.active.is_some()
    }

    /// Process one block in place. Channels past the second pass through.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        self.adopt_pending();

        match self.mode.get() {
            ProcessMode::Dynamic => {
                if let Some(pair) = self.active.as_deref_mut() {
                    run_models(pair.models_mut(), channels);
                }
            }
            ProcessMode::Static => run_models(&mut self.fixed, channels),
        }
    }

    #[inline]
    fn adopt_pending(&mut self) {
        // Without a free retire slot the old pair would have to be dropped
        // here, so leave the request pending until the collector catches up.
        if !self.consumer.has_pending() || !self.retirer.has_room() {
            return;
        }
        let Some(adopted) = self.consumer.try_adopt() else {
            return;
        };
        if let Some(old) = self.active.replace(adopted.value) {
            if let Err(old) = self.retirer.retire(old) {
                // Unreachable after has_room(); leak rather than free here.
                std::mem::forget(old);
            }
        }
    }
}

#[inline]
fn run_models<M: SampleModel>(models: &mut [M; MODEL_CHANNELS], channels: &mut [&mut [f32]]) {
    for (model, buffer) in models.iter_mut().zip(channels.iter_mut()) {
        model.process(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampnet_core::{mailbox, retire_queue};
    use ampnet_neural::{parse, ModelDescriptor, DEFAULT_MODEL_JSON};

    fn scale_model(gain: f32) -> ModelDescriptor {
        parse(&format!(
            r#"{{"in_shape":[null,null,1],"layers":[
                {{"type":"dense","activation":"","shape":[null,null,1],"weights":[[[{}]],[0.0]]}}
            ]}}"#,
            gain
        ))
        .unwrap()
    }

    fn fixed_models() -> [StaticModel; MODEL_CHANNELS] {
        let desc = parse(DEFAULT_MODEL_JSON).unwrap();
        [
            StaticModel::from_descriptor(&desc).unwrap(),
            StaticModel::from_descriptor(&desc).unwrap(),
        ]
    }

    #[test]
    fn test_extra_channels_pass_through() {
        let (_producer, consumer) = mailbox();
        let (retirer, _collector) = retire_queue(2);
        let pair = ModelPair::build(&scale_model(2.0)).unwrap();
        let mut processor = NeuralProcessor::new(
            consumer,
            retirer,
            Some(Box::new(pair)),
            fixed_models(),
            Arc::new(AtomicMode::default()),
        );

        let mut a = [1.0, 2.0];
        let mut b = [3.0, 4.0];
        let mut c = [5.0, 6.0];
        processor.process_block(&mut [&mut a[..], &mut b[..], &mut c[..]]);
        assert_eq!(a, [2.0, 4.0]);
        assert_eq!(b, [6.0, 8.0]);
        assert_eq!(c, [5.0, 6.0]);
    }

    #[test]
    fn test_no_model_leaves_audio_untouched() {
        let (_producer, consumer) = mailbox();
        let (retirer, _collector) = retire_queue(2);
        let mut processor = NeuralProcessor::new(
            consumer,
            retirer,
            None,
            fixed_models(),
            Arc::new(AtomicMode::default()),
        );
        let mut a = [0.25, -0.5];
        processor.process_block(&mut [&mut a[..]]);
        assert_eq!(a, [0.25, -0.5]);
        assert!(!processor.has_model());
    }

    #[test]
    fn test_full_retire_queue_defers_adoption() {
        let (mut producer, consumer) = mailbox();
        let (retirer, mut collector) = retire_queue(1);
        let mut processor = NeuralProcessor::new(
            consumer,
            retirer,
            Some(Box::new(ModelPair::build(&scale_model(1.0)).unwrap())),
            fixed_models(),
            Arc::new(AtomicMode::default()),
        );

        producer
            .request_swap(Box::new(ModelPair::build(&scale_model(2.0)).unwrap()))
            .unwrap();
        let mut buf = [1.0];
        processor.process_block(&mut [&mut buf[..]]);
        assert_eq!(buf, [2.0]);
        assert_eq!(processor.active_sequence(), 1);

        // Ring now holds the first pair; the next swap must wait.
        producer
            .request_swap(Box::new(ModelPair::build(&scale_model(3.0)).unwrap()))
            .unwrap();
        let mut buf = [1.0];
        processor.process_block(&mut [&mut buf[..]]);
        assert_eq!(buf, [2.0]);
        assert_eq!(processor.active_sequence(), 1);

        assert_eq!(collector.drain(), 1);
        let mut buf = [1.0];
        processor.process_block(&mut [&mut buf[..]]);
        assert_eq!(buf, [3.0]);
        assert_eq!(processor.active_sequence(), 2);
    }

    #[test]
    fn test_mode_switch_selects_static_path() {
        let (_producer, consumer) = mailbox();
        let (retirer, _collector) = retire_queue(2);
        let mode = Arc::new(AtomicMode::default());
        let mut processor = NeuralProcessor::new(
            consumer,
            retirer,
            Some(Box::new(ModelPair::build(&scale_model(2.0)).unwrap())),
            fixed_models(),
            Arc::clone(&mode),
        );

        mode.set(ProcessMode::Static);
        let mut buf = [0.5, 0.5];
        processor.process_block(&mut [&mut buf[..]]);

        let mut reference = fixed_models();
        let expected = [reference[0].forward(0.5), reference[0].forward(0.5)];
        assert_eq!(buf, expected);
    }
}
