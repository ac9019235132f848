//! Run-time topology model.

use crate::descriptor::ModelDescriptor;
use crate::error::{BuildError, BuildResult};
use crate::layers::Layer;

/// Single-sample, single-channel inference.
///
/// Implementations are built off the audio thread and afterwards only ever
/// touch memory they already own: `forward` and `reset` must not allocate,
/// lock or block.
pub trait SampleModel: Send {
    /// Feed one input sample, get one output sample.
    fn forward(&mut self, input: f32) -> f32;

    /// Zero all recurrent and history state.
    fn reset(&mut self);

    /// Run the model over `buffer` in place.
    #[inline]
    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.forward(*sample);
        }
    }
}

/// A model whose layer sequence comes from a [`ModelDescriptor`].
///
/// Each instance owns a private copy of the weights plus two ping-pong
/// scratch vectors sized to the widest layer. Two instances built from the
/// same descriptor share nothing.
///
/// # Example
///
/// ```
/// use ampnet_neural::{parse, DynamicModel, SampleModel};
///
/// let text = r#"{
///     "in_shape": [null, null, 1],
///     "layers": [{ "type": "dense", "activation": "", "shape": [null, null, 1],
///                  "weights": [[[2.0]], [0.0]] }]
/// }"#;
/// let mut model = DynamicModel::build(&parse(text)?)?;
/// assert_eq!(model.forward(3.0), 6.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DynamicModel {
    descriptor: ModelDescriptor,
    layers: Vec<Layer>,
    ping: Vec<f32>,
    pong: Vec<f32>,
}

impl DynamicModel {
    /// Allocate every layer and its state. Only the 1-in/1-out arity is
    /// accepted.
    pub fn build(descriptor: &ModelDescriptor) -> BuildResult<Self> {
        if descriptor.is_empty() {
            return Err(BuildError::Empty);
        }
        descriptor.validate()?;
        if descriptor.in_size() != 1 || descriptor.out_size() != 1 {
            return Err(BuildError::Arity {
                expected_in: 1,
                expected_out: 1,
                inputs: descriptor.in_size(),
                outputs: descriptor.out_size(),
            });
        }

        let layers = descriptor.layers().iter().map(Layer::from_spec).collect();
        let width = descriptor.max_width();
        Ok(Self {
            descriptor: descriptor.clone(),
            layers,
            ping: vec![0.0; width],
            pong: vec![0.0; width],
        })
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn weight_count(&self) -> usize {
        self.descriptor.weight_count()
    }
}

impl SampleModel for DynamicModel {
    #[inline]
    fn forward(&mut self, input: f32) -> f32 {
        let Self {
            layers, ping, pong, ..
        } = self;
        let mut src: &mut [f32] = ping;
        let mut dst: &mut [f32] = pong;

        src[0] = input;
        let mut width = 1;
        for layer in layers.iter_mut() {
            let out = layer.out_size();
            layer.forward(&src[..width], &mut dst[..out]);
            std::mem::swap(&mut src, &mut dst);
            width = out;
        }
        src[0]
    }

    fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
        self.ping.fill(0.0);
        self.pong.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ActivationKind, Conv1dSpec, DenseSpec, GruSpec, LayerSpec};
    use crate::error::ShapeMismatch;

    fn dense(in_size: usize, out_size: usize, w: f32, b: f32) -> LayerSpec {
        LayerSpec::Dense(DenseSpec {
            in_size,
            out_size,
            kernel: vec![w; in_size * out_size],
            bias: vec![b; out_size],
        })
    }

    fn recurrent_model() -> ModelDescriptor {
        ModelDescriptor::new(
            1,
            vec![
                dense(1, 4, 0.7, 0.1),
                LayerSpec::Activation {
                    kind: ActivationKind::Tanh,
                    width: 4,
                },
                LayerSpec::Gru(GruSpec {
                    in_size: 4,
                    out_size: 3,
                    kernel: (0..36).map(|i| (i as f32 * 0.37).sin() * 0.5).collect(),
                    recurrent: (0..27).map(|i| (i as f32 * 0.53).cos() * 0.5).collect(),
                    bias: vec![0.05; 18],
                }),
                dense(3, 1, 0.4, 0.0),
            ],
        )
    }

    #[test]
    fn test_scalar_dense() {
        let desc = ModelDescriptor::new(1, vec![dense(1, 1, 2.0, 0.0)]);
        let mut model = DynamicModel::build(&desc).unwrap();
        assert_eq!(model.forward(3.0), 6.0);
        model.reset();
        assert_eq!(model.forward(3.0), 6.0);
        assert_eq!(model.layer_count(), 1);
        assert_eq!(model.weight_count(), 2);
    }

    #[test]
    fn test_empty_rejected() {
        let desc = ModelDescriptor::new(1, vec![]);
        assert!(matches!(DynamicModel::build(&desc), Err(BuildError::Empty)));
    }

    #[test]
    fn test_arity_rejected() {
        let desc = ModelDescriptor::new(1, vec![dense(1, 2, 1.0, 0.0)]);
        assert!(matches!(
            DynamicModel::build(&desc),
            Err(BuildError::Arity { outputs: 2, .. })
        ));
    }

    #[test]
    fn test_width_chain_checked() {
        let desc = ModelDescriptor::new(1, vec![dense(1, 4, 1.0, 0.0), dense(3, 1, 1.0, 0.0)]);
        match DynamicModel::build(&desc) {
            Err(BuildError::ShapeMismatch(ShapeMismatch { layer, .. })) => assert_eq!(layer, 1),
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_conv_dilation_rejected_before_allocation() {
        let desc = ModelDescriptor::new(
            1,
            vec![LayerSpec::Conv1d(Conv1dSpec {
                in_size: 1,
                out_size: 1,
                kernel_size: 2,
                dilation: usize::MAX / 4,
                kernel: vec![0.5, 0.5],
                bias: vec![0.0],
            })],
        );
        assert!(matches!(
            DynamicModel::build(&desc),
            Err(BuildError::ShapeMismatch(ShapeMismatch { layer: 0, .. }))
        ));
    }

    #[test]
    fn test_reset_restores_determinism() {
        let mut model = DynamicModel::build(&recurrent_model()).unwrap();
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();

        let mut first = input.clone();
        model.process(&mut first);
        model.reset();
        let mut second = input.clone();
        model.process(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn test_channel_independence() {
        let desc = recurrent_model();
        let mut left = DynamicModel::build(&desc).unwrap();
        let mut right = DynamicModel::build(&desc).unwrap();
        let mut solo = DynamicModel::build(&desc).unwrap();

        let mut l: Vec<f32> = (0..32).map(|i| (i as f32 * 0.2).sin()).collect();
        let mut r: Vec<f32> = (0..32).map(|i| (i as f32 * 0.7).cos()).collect();
        let mut reference = l.clone();

        // Interleave so a shared state would show up in the left output.
        for i in 0..l.len() {
            l[i] = left.forward(l[i]);
            r[i] = right.forward(r[i]);
        }
        solo.process(&mut reference);

        assert_eq!(l, reference);
    }
}
