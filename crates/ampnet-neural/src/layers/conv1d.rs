use super::accumulate;
use crate::descriptor::Conv1dSpec;

/// Causal dilated 1-D convolution over time, one frame per call.
///
/// Keeps the last `(kernel_size - 1) * dilation + 1` input frames in a ring.
/// Tap `k` reads the frame `(kernel_size - 1 - k) * dilation` steps back, so
/// the final tap always sees the current input.
#[derive(Debug, Clone)]
pub struct Conv1d {
    in_size: usize,
    out_size: usize,
    kernel_size: usize,
    dilation: usize,
    kernel: Vec<f32>,
    bias: Vec<f32>,
    history: Vec<f32>,
    history_len: usize,
    pos: usize,
}

impl Conv1d {
    /// `spec` must have passed [`LayerSpec::validate`](crate::LayerSpec::validate),
    /// which bounds the history ring.
    pub fn new(spec: &Conv1dSpec) -> Self {
        let history_len = spec.history_frames().unwrap_or(1);
        Self {
            in_size: spec.in_size,
            out_size: spec.out_size,
            kernel_size: spec.kernel_size,
            dilation: spec.dilation,
            kernel: spec.kernel.clone(),
            bias: spec.bias.clone(),
            history: vec![0.0; history_len * spec.in_size],
            history_len,
            pos: 0,
        }
    }

    pub fn in_size(&self) -> usize {
        self.in_size
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let n = self.in_size;
        self.history[self.pos * n..(self.pos + 1) * n].copy_from_slice(input);

        output.copy_from_slice(&self.bias);
        let tap_len = n * self.out_size;
        for (k, tap) in self.kernel.chunks_exact(tap_len).enumerate() {
            let lag = (self.kernel_size - 1 - k) * self.dilation;
            let frame = (self.pos + self.history_len - lag) % self.history_len;
            accumulate(output, &self.history[frame * n..(frame + 1) * n], tap);
        }

        self.pos = (self.pos + 1) % self.history_len;
    }

    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
    }
}
