use super::{accumulate, sigmoid};
use crate::descriptor::GruSpec;

/// Gated recurrent unit with separate input and recurrent biases.
///
/// ```text
/// z = σ(x·Wz + bz + h·Uz + rz)
/// r = σ(x·Wr + br + h·Ur + rr)
/// c = tanh(x·Wh + bh + r ⊙ (h·Uh + rh))
/// h = (1 - z) ⊙ c + z ⊙ h
/// ```
#[derive(Debug, Clone)]
pub struct Gru {
    in_size: usize,
    out_size: usize,
    kernel: Vec<f32>,
    recurrent: Vec<f32>,
    bias_in: Vec<f32>,
    bias_rec: Vec<f32>,
    state: Vec<f32>,
    x_proj: Vec<f32>,
    h_proj: Vec<f32>,
}

impl Gru {
    pub fn new(spec: &GruSpec) -> Self {
        let gates = 3 * spec.out_size;
        Self {
            in_size: spec.in_size,
            out_size: spec.out_size,
            kernel: spec.kernel.clone(),
            recurrent: spec.recurrent.clone(),
            bias_in: spec.bias[..gates].to_vec(),
            bias_rec: spec.bias[gates..].to_vec(),
            state: vec![0.0; spec.out_size],
            x_proj: vec![0.0; gates],
            h_proj: vec![0.0; gates],
        }
    }

    pub fn in_size(&self) -> usize {
        self.in_size
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    pub fn state(&self) -> &[f32] {
        &self.state
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let n = self.out_size;

        self.x_proj.copy_from_slice(&self.bias_in);
        accumulate(&mut self.x_proj, input, &self.kernel);
        self.h_proj.copy_from_slice(&self.bias_rec);
        accumulate(&mut self.h_proj, &self.state, &self.recurrent);

        for j in 0..n {
            let z = sigmoid(self.x_proj[j] + self.h_proj[j]);
            let r = sigmoid(self.x_proj[n + j] + self.h_proj[n + j]);
            let c = (self.x_proj[2 * n + j] + r * self.h_proj[2 * n + j]).tanh();
            self.state[j] = (1.0 - z) * c + z * self.state[j];
        }

        output.copy_from_slice(&self.state);
    }

    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }
}
