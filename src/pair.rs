//! One dynamic model per stereo channel.

use ampnet_neural::{BuildResult, DynamicModel, ModelDescriptor, SampleModel};

/// Number of channels the processor runs a model on.
pub const MODEL_CHANNELS: usize = 2;

/// Two independently built instances of the same descriptor. Swapped into the
/// audio thread as a single unit.
#[derive(Debug, Clone)]
pub struct ModelPair {
    models: [DynamicModel; MODEL_CHANNELS],
}

impl ModelPair {
    pub fn build(descriptor: &ModelDescriptor) -> BuildResult<Self> {
        Ok(Self {
            models: [
                DynamicModel::build(descriptor)?,
                DynamicModel::build(descriptor)?,
            ],
        })
    }

    pub fn channel(&self, index: usize) -> Option<&DynamicModel> {
        self.models.get(index)
    }

    pub fn models_mut(&mut self) -> &mut [DynamicModel; MODEL_CHANNELS] {
        &mut self.models
    }

    pub fn reset(&mut self) {
        for model in &mut self.models {
            model.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampnet_neural::{parse, DEFAULT_MODEL_JSON};

    #[test]
    fn test_channels_do_not_share_state() {
        let mut pair = ModelPair::build(&parse(DEFAULT_MODEL_JSON).unwrap()).unwrap();
        let [left, right] = pair.models_mut();
        let a = left.forward(0.5);
        left.forward(0.9);
        let b = right.forward(0.5);
        assert_eq!(a, b);
    }
}
