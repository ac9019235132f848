use super::{accumulate, sigmoid};
use crate::descriptor::LstmSpec;

/// Long short-term memory cell. Gate columns are ordered i, f, c, o.
#[derive(Debug, Clone)]
pub struct Lstm {
    in_size: usize,
    out_size: usize,
    kernel: Vec<f32>,
    recurrent: Vec<f32>,
    bias: Vec<f32>,
    hidden: Vec<f32>,
    cell: Vec<f32>,
    gates: Vec<f32>,
}

impl Lstm {
    pub fn new(spec: &LstmSpec) -> Self {
        Self {
            in_size: spec.in_size,
            out_size: spec.out_size,
            kernel: spec.kernel.clone(),
            recurrent: spec.recurrent.clone(),
            bias: spec.bias.clone(),
            hidden: vec![0.0; spec.out_size],
            cell: vec![0.0; spec.out_size],
            gates: vec![0.0; 4 * spec.out_size],
        }
    }

    pub fn in_size(&self) -> usize {
        self.in_size
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    pub fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    pub fn cell(&self) -> &[f32] {
        &self.cell
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let n = self.out_size;

        self.gates.copy_from_slice(&self.bias);
        accumulate(&mut self.gates, input, &self.kernel);
        accumulate(&mut self.gates, &self.hidden, &self.recurrent);

        for j in 0..n {
            let i = sigmoid(self.gates[j]);
            let f = sigmoid(self.gates[n + j]);
            let g = self.gates[2 * n + j].tanh();
            let o = sigmoid(self.gates[3 * n + j]);
            self.cell[j] = f * self.cell[j] + i * g;
            self.hidden[j] = o * self.cell[j].tanh();
        }

        output.copy_from_slice(&self.hidden);
    }

    pub fn reset(&mut self) {
        self.hidden.fill(0.0);
        self.cell.fill(0.0);
    }
}
