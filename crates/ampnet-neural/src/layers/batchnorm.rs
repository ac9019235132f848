use crate::descriptor::BatchNormSpec;

/// Inference-time batch normalization folded into `y = x * scale + shift`.
#[derive(Debug, Clone)]
pub struct BatchNorm {
    scale: Vec<f32>,
    shift: Vec<f32>,
}

impl BatchNorm {
    pub fn new(spec: &BatchNormSpec) -> Self {
        let scale: Vec<f32> = spec
            .gamma
            .iter()
            .zip(&spec.variance)
            .map(|(&g, &v)| g / (v + spec.epsilon).sqrt())
            .collect();
        let shift = spec
            .beta
            .iter()
            .zip(&spec.mean)
            .zip(&scale)
            .map(|((&b, &m), &s)| b - m * s)
            .collect();
        Self { scale, shift }
    }

    pub fn width(&self) -> usize {
        self.scale.len()
    }

    #[inline]
    pub fn forward(&self, input: &[f32], output: &mut [f32]) {
        for ((y, &x), (&s, &b)) in output
            .iter_mut()
            .zip(input)
            .zip(self.scale.iter().zip(&self.shift))
        {
            *y = x * s + b;
        }
    }
}
