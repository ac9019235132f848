use super::accumulate;
use crate::descriptor::DenseSpec;

/// Fully connected layer: `y = b + x · W`.
#[derive(Debug, Clone)]
pub struct Dense {
    in_size: usize,
    out_size: usize,
    kernel: Vec<f32>,
    bias: Vec<f32>,
}

impl Dense {
    pub fn new(spec: &DenseSpec) -> Self {
        Self {
            in_size: spec.in_size,
            out_size: spec.out_size,
            kernel: spec.kernel.clone(),
            bias: spec.bias.clone(),
        }
    }

    pub fn in_size(&self) -> usize {
        self.in_size
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    #[inline]
    pub fn forward(&self, input: &[f32], output: &mut [f32]) {
        output.copy_from_slice(&self.bias);
        accumulate(output, input, &self.kernel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dense_forward() {
        let layer = Dense::new(&DenseSpec {
            in_size: 2,
            out_size: 2,
            kernel: vec![1.0, 0.5, -1.0, 2.0],
            bias: vec![0.1, 0.0],
        });
        let mut out = [0.0; 2];
        layer.forward(&[3.0, 1.0], &mut out);
        assert_relative_eq!(out[0], 2.1, epsilon = 1e-6);
        assert_relative_eq!(out[1], 3.5, epsilon = 1e-6);
    }
}
