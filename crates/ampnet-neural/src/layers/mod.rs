//! Per-sample layer primitives.
//!
//! Every layer owns a copy of its weights and whatever state it needs, all
//! allocated in `new`. `forward` and `reset` never allocate.

mod activation;
mod batchnorm;
mod conv1d;
mod dense;
mod gru;
mod lstm;
mod prelu;

pub use activation::{elu, relu, sigmoid, softmax_in_place, Activation};
pub use batchnorm::BatchNorm;
pub use conv1d::Conv1d;
pub use dense::Dense;
pub use gru::Gru;
pub use lstm::Lstm;
pub use prelu::PRelu;

use crate::descriptor::LayerSpec;

/// Closed set of layer implementations, dispatched by `match`.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Activation(Activation),
    Conv1d(Conv1d),
    Gru(Gru),
    Lstm(Lstm),
    PRelu(PRelu),
    BatchNorm(BatchNorm),
}

impl Layer {
    /// Instantiate a layer, copying its weights out of `spec`. The spec must
    /// already be validated.
    pub fn from_spec(spec: &LayerSpec) -> Self {
        match spec {
            LayerSpec::Dense(d) => Layer::Dense(Dense::new(d)),
            LayerSpec::Activation { kind, width } => {
                Layer::Activation(Activation::new(*kind, *width))
            }
            LayerSpec::Conv1d(c) => Layer::Conv1d(Conv1d::new(c)),
            LayerSpec::Gru(g) => Layer::Gru(Gru::new(g)),
            LayerSpec::Lstm(l) => Layer::Lstm(Lstm::new(l)),
            LayerSpec::PRelu { alpha } => Layer::PRelu(PRelu::new(alpha)),
            LayerSpec::BatchNorm(b) => Layer::BatchNorm(BatchNorm::new(b)),
        }
    }

    /// `input.len() == self.in_size()`, `output.len() == self.out_size()`.
    #[inline]
    pub fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        match self {
            Layer::Dense(l) => l.forward(input, output),
            Layer::Activation(l) => l.forward(input, output),
            Layer::Conv1d(l) => l.forward(input, output),
            Layer::Gru(l) => l.forward(input, output),
            Layer::Lstm(l) => l.forward(input, output),
            Layer::PRelu(l) => l.forward(input, output),
            Layer::BatchNorm(l) => l.forward(input, output),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Layer::Conv1d(l) => l.reset(),
            Layer::Gru(l) => l.reset(),
            Layer::Lstm(l) => l.reset(),
            Layer::Dense(_) | Layer::Activation(_) | Layer::PRelu(_) | Layer::BatchNorm(_) => {}
        }
    }

    pub fn in_size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.in_size(),
            Layer::Activation(l) => l.width(),
            Layer::Conv1d(l) => l.in_size(),
            Layer::Gru(l) => l.in_size(),
            Layer::Lstm(l) => l.in_size(),
            Layer::PRelu(l) => l.width(),
            Layer::BatchNorm(l) => l.width(),
        }
    }

    pub fn out_size(&self) -> usize {
        match self {
            Layer::Dense(l) => l.out_size(),
            Layer::Activation(l) => l.width(),
            Layer::Conv1d(l) => l.out_size(),
            Layer::Gru(l) => l.out_size(),
            Layer::Lstm(l) => l.out_size(),
            Layer::PRelu(l) => l.width(),
            Layer::BatchNorm(l) => l.width(),
        }
    }
}

/// `acc[j] += Σ_i x[i] * weights[i * acc.len() + j]` for an input-major matrix.
#[inline]
pub(crate) fn accumulate(acc: &mut [f32], x: &[f32], weights: &[f32]) {
    let cols = acc.len();
    for (&xi, row) in x.iter().zip(weights.chunks_exact(cols)) {
        for (a, &w) in acc.iter_mut().zip(row) {
            *a += xi * w;
        }
    }
}
