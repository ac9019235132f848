//! Parsed, validated model topology.
//!
//! Weight tensors are stored flat. Layouts follow the exporting tooling:
//!
//! | layer | tensor | layout |
//! |---|---|---|
//! | Dense | `kernel` | `[in][out]` |
//! | Conv1D | `kernel` | `[kernel_size][in][out]`, tap `k` reads `x[t - (K-1-k)*dilation]` |
//! | GRU | `kernel` / `recurrent` | `[in][3*out]` / `[out][3*out]`, gate columns z, r, h |
//! | GRU | `bias` | `[2][3*out]`: input bias row, then recurrent bias row |
//! | LSTM | `kernel` / `recurrent` | `[in][4*out]` / `[out][4*out]`, gate columns i, f, c, o |
//! | LSTM | `bias` | `[4*out]` |

use crate::error::ShapeMismatch;
use std::fmt;

/// Widest vector any layer may read or write.
pub const MAX_LAYER_WIDTH: usize = 1 << 16;

/// Upper bound on a conv1d history ring, in values (`frames * in_size`).
pub const MAX_CONV_HISTORY: usize = 1 << 20;

/// Product of `factors`, or `None` on overflow.
pub(crate) fn checked_product(factors: &[usize]) -> Option<usize> {
    factors.iter().try_fold(1usize, |acc, &f| acc.checked_mul(f))
}

/// Element-wise (or, for softmax, vector-wise) non-linearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    Identity,
    Tanh,
    ReLU,
    Sigmoid,
    Softmax,
    Elu,
}

impl ActivationKind {
    /// Look up an activation by its exported name. `""` and `"linear"` map to
    /// [`ActivationKind::Identity`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" | "linear" => Some(ActivationKind::Identity),
            "tanh" => Some(ActivationKind::Tanh),
            "relu" => Some(ActivationKind::ReLU),
            "sigmoid" => Some(ActivationKind::Sigmoid),
            "softmax" => Some(ActivationKind::Softmax),
            "elu" => Some(ActivationKind::Elu),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivationKind::Identity => "linear",
            ActivationKind::Tanh => "tanh",
            ActivationKind::ReLU => "relu",
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Softmax => "softmax",
            ActivationKind::Elu => "elu",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseSpec {
    pub in_size: usize,
    pub out_size: usize,
    pub kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conv1dSpec {
    pub in_size: usize,
    pub out_size: usize,
    pub kernel_size: usize,
    pub dilation: usize,
    pub kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Conv1dSpec {
    /// Frames kept in the history ring: `(kernel_size - 1) * dilation + 1`.
    /// `None` when that overflows or `kernel_size` is zero.
    pub fn history_frames(&self) -> Option<usize> {
        self.kernel_size
            .checked_sub(1)?
            .checked_mul(self.dilation)?
            .checked_add(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GruSpec {
    pub in_size: usize,
    pub out_size: usize,
    pub kernel: Vec<f32>,
    pub recurrent: Vec<f32>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LstmSpec {
    pub in_size: usize,
    pub out_size: usize,
    pub kernel: Vec<f32>,
    pub recurrent: Vec<f32>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchNormSpec {
    pub gamma: Vec<f32>,
    pub beta: Vec<f32>,
    pub mean: Vec<f32>,
    pub variance: Vec<f32>,
    pub epsilon: f32,
}

/// One layer of a [`ModelDescriptor`]. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Dense(DenseSpec),
    Activation { kind: ActivationKind, width: usize },
    Conv1d(Conv1dSpec),
    Gru(GruSpec),
    Lstm(LstmSpec),
    PRelu { alpha: Vec<f32> },
    BatchNorm(BatchNormSpec),
}

impl LayerSpec {
    pub fn in_size(&self) -> usize {
        match self {
            LayerSpec::Dense(d) => d.in_size,
            LayerSpec::Activation { width, .. } => *width,
            LayerSpec::Conv1d(c) => c.in_size,
            LayerSpec::Gru(g) => g.in_size,
            LayerSpec::Lstm(l) => l.in_size,
            LayerSpec::PRelu { alpha } => alpha.len(),
            LayerSpec::BatchNorm(b) => b.gamma.len(),
        }
    }

    pub fn out_size(&self) -> usize {
        match self {
            LayerSpec::Dense(d) => d.out_size,
            LayerSpec::Activation { width, .. } => *width,
            LayerSpec::Conv1d(c) => c.out_size,
            LayerSpec::Gru(g) => g.out_size,
            LayerSpec::Lstm(l) => l.out_size,
            LayerSpec::PRelu { alpha } => alpha.len(),
            LayerSpec::BatchNorm(b) => b.gamma.len(),
        }
    }

    /// Type tag used in the exported document.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerSpec::Dense(_) => "dense",
            LayerSpec::Activation { .. } => "activation",
            LayerSpec::Conv1d(_) => "conv1d",
            LayerSpec::Gru(_) => "gru",
            LayerSpec::Lstm(_) => "lstm",
            LayerSpec::PRelu { .. } => "prelu",
            LayerSpec::BatchNorm(_) => "batchnorm",
        }
    }

    /// Number of trainable parameters.
    pub fn weight_count(&self) -> usize {
        match self {
            LayerSpec::Dense(d) => d.kernel.len() + d.bias.len(),
            LayerSpec::Activation { .. } => 0,
            LayerSpec::Conv1d(c) => c.kernel.len() + c.bias.len(),
            LayerSpec::Gru(g) => g.kernel.len() + g.recurrent.len() + g.bias.len(),
            LayerSpec::Lstm(l) => l.kernel.len() + l.recurrent.len() + l.bias.len(),
            LayerSpec::PRelu { alpha } => alpha.len(),
            LayerSpec::BatchNorm(b) => {
                b.gamma.len() + b.beta.len() + b.mean.len() + b.variance.len()
            }
        }
    }

    /// Check that every tensor length agrees with the declared widths.
    pub fn validate(&self, index: usize) -> Result<(), ShapeMismatch> {
        let mismatch = |detail: String| ShapeMismatch::new(index, detail);
        let expect = |name: &str, actual: usize, dims: &[usize]| match checked_product(dims) {
            Some(expected) if actual == expected => Ok(()),
            Some(expected) => Err(mismatch(format!(
                "{} {} has {} values, expected {}",
                self.type_name(),
                name,
                actual,
                expected
            ))),
            None => Err(mismatch(format!(
                "{} {} dimensions {:?} overflow",
                self.type_name(),
                name,
                dims
            ))),
        };

        let (in_size, out_size) = (self.in_size(), self.out_size());
        if in_size == 0 || out_size == 0 {
            return Err(mismatch(format!("{} has zero width", self.type_name())));
        }
        if in_size > MAX_LAYER_WIDTH || out_size > MAX_LAYER_WIDTH {
            return Err(mismatch(format!(
                "{} width {}x{} exceeds {}",
                self.type_name(),
                in_size,
                out_size,
                MAX_LAYER_WIDTH
            )));
        }

        match self {
            LayerSpec::Dense(d) => {
                expect("kernel", d.kernel.len(), &[d.in_size, d.out_size])?;
                expect("bias", d.bias.len(), &[d.out_size])
            }
            LayerSpec::Activation { .. } | LayerSpec::PRelu { .. } => Ok(()),
            LayerSpec::Conv1d(c) => {
                if c.kernel_size == 0 || c.dilation == 0 {
                    return Err(mismatch(
                        "conv1d kernel_size and dilation must be positive".into(),
                    ));
                }
                match c
                    .history_frames()
                    .and_then(|frames| frames.checked_mul(c.in_size))
                {
                    Some(values) if values <= MAX_CONV_HISTORY => {}
                    _ => {
                        return Err(mismatch(format!(
                            "conv1d receptive field (kernel_size {}, dilation {}) exceeds {} history values",
                            c.kernel_size, c.dilation, MAX_CONV_HISTORY
                        )))
                    }
                }
                expect(
                    "kernel",
                    c.kernel.len(),
                    &[c.kernel_size, c.in_size, c.out_size],
                )?;
                expect("bias", c.bias.len(), &[c.out_size])
            }
            LayerSpec::Gru(g) => {
                expect("kernel", g.kernel.len(), &[g.in_size, 3, g.out_size])?;
                expect("recurrent", g.recurrent.len(), &[g.out_size, 3, g.out_size])?;
                expect("bias", g.bias.len(), &[2, 3, g.out_size])
            }
            LayerSpec::Lstm(l) => {
                expect("kernel", l.kernel.len(), &[l.in_size, 4, l.out_size])?;
                expect("recurrent", l.recurrent.len(), &[l.out_size, 4, l.out_size])?;
                expect("bias", l.bias.len(), &[4, l.out_size])
            }
            LayerSpec::BatchNorm(b) => {
                let width = b.gamma.len();
                expect("beta", b.beta.len(), &[width])?;
                expect("mean", b.mean.len(), &[width])?;
                expect("variance", b.variance.len(), &[width])
            }
        }
    }
}

/// Ordered layer sequence with its input width.
///
/// Invariant (checked by [`validate`](Self::validate)): the output width of
/// layer `i` equals the input width of layer `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    in_size: usize,
    layers: Vec<LayerSpec>,
}

impl ModelDescriptor {
    /// Assemble a descriptor without validation. [`parse`](crate::parse)
    /// always validates; hand-built descriptors are validated at build time.
    pub fn new(in_size: usize, layers: Vec<LayerSpec>) -> Self {
        Self { in_size, layers }
    }

    pub fn in_size(&self) -> usize {
        self.in_size
    }

    /// Output width of the last layer (the input width for an empty model).
    pub fn out_size(&self) -> usize {
        self.layers
            .last()
            .map(LayerSpec::out_size)
            .unwrap_or(self.in_size)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn weight_count(&self) -> usize {
        self.layers.iter().map(LayerSpec::weight_count).sum()
    }

    /// Widest activation vector any layer reads or writes.
    pub fn max_width(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.in_size().max(l.out_size()))
            .fold(self.in_size, usize::max)
    }

    pub fn validate(&self) -> Result<(), ShapeMismatch> {
        let mut width = self.in_size;
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.in_size() != width {
                return Err(ShapeMismatch::new(
                    index,
                    format!(
                        "{} expects {} inputs but previous layer produces {}",
                        layer.type_name(),
                        layer.in_size(),
                        width
                    ),
                ));
            }
            layer.validate(index)?;
            width = layer.out_size();
        }
        Ok(())
    }

    /// One-line topology summary, e.g. `1 -> dense(8) -> tanh -> gru(8) -> dense(1)`.
    pub fn summary(&self) -> String {
        let mut out = self.in_size.to_string();
        for layer in &self.layers {
            out.push_str(" -> ");
            match layer {
                LayerSpec::Activation { kind, .. } => out.push_str(kind.name()),
                other => {
                    out.push_str(other.type_name());
                    out.push_str(&format!("({})", other.out_size()));
                }
            }
        }
        out
    }
}
