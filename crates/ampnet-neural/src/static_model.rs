//! Compile-time topology model.
//!
//! Layer widths are const generics, so every loop bound is known to the
//! compiler. The topology is fixed:
//!
//! ```text
//! Dense(1 -> 8) -> tanh -> Conv1D(8 -> 4, k=3, d=2) -> tanh -> GRU(4 -> 8) -> Dense(8 -> 1)
//! ```

use crate::descriptor::{
    ActivationKind, Conv1dSpec, DenseSpec, GruSpec, LayerSpec, ModelDescriptor,
};
use crate::error::{BuildError, BuildResult};
use crate::layers::sigmoid;
use crate::model::SampleModel;

/// Human-readable form of the fixed topology, used in error messages.
pub const STATIC_TOPOLOGY: &str =
    "1 -> dense(8) -> tanh -> conv1d(4) -> tanh -> gru(8) -> dense(1)";

fn check_sizes(
    kind: &str,
    (in_size, out_size): (usize, usize),
    (want_in, want_out): (usize, usize),
) -> Result<(), String> {
    if in_size == want_in && out_size == want_out {
        Ok(())
    } else {
        Err(format!(
            "{} is {}->{}, expected {}->{}",
            kind, in_size, out_size, want_in, want_out
        ))
    }
}

fn check_len(kind: &str, tensor: &str, actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "{} {} has {} values, expected {}",
            kind, tensor, actual, expected
        ))
    }
}

/// Dense layer, weights stored output-major.
#[derive(Debug, Clone)]
pub struct DenseT<const IN: usize, const OUT: usize> {
    weights: [[f32; IN]; OUT],
    bias: [f32; OUT],
}

impl<const IN: usize, const OUT: usize> DenseT<IN, OUT> {
    pub fn from_spec(spec: &DenseSpec) -> Result<Self, String> {
        check_sizes("dense", (spec.in_size, spec.out_size), (IN, OUT))?;
        check_len("dense", "kernel", spec.kernel.len(), IN * OUT)?;
        check_len("dense", "bias", spec.bias.len(), OUT)?;
        let mut weights = [[0.0; IN]; OUT];
        for (i, row) in spec.kernel.chunks_exact(OUT).enumerate() {
            for (o, &w) in row.iter().enumerate() {
                weights[o][i] = w;
            }
        }
        let mut bias = [0.0; OUT];
        bias.copy_from_slice(&spec.bias);
        Ok(Self { weights, bias })
    }

    #[inline]
    pub fn forward(&self, input: &[f32; IN], output: &mut [f32; OUT]) {
        for o in 0..OUT {
            let mut acc = self.bias[o];
            for i in 0..IN {
                acc += input[i] * self.weights[o][i];
            }
            output[o] = acc;
        }
    }
}

/// Element-wise tanh over a fixed-width vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TanhT<const N: usize>;

impl<const N: usize> TanhT<N> {
    #[inline]
    pub fn forward(&self, values: &mut [f32; N]) {
        for v in values.iter_mut() {
            *v = v.tanh();
        }
    }
}

/// Causal dilated convolution with `K` taps spaced `D` frames apart.
#[derive(Debug, Clone)]
pub struct Conv1dT<const IN: usize, const OUT: usize, const K: usize, const D: usize> {
    weights: [[[f32; IN]; OUT]; K],
    bias: [f32; OUT],
    history: Vec<[f32; IN]>,
    pos: usize,
}

impl<const IN: usize, const OUT: usize, const K: usize, const D: usize>
    Conv1dT<IN, OUT, K, D>
{
    const HISTORY: usize = (K - 1) * D + 1;

    pub fn from_spec(spec: &Conv1dSpec) -> Result<Self, String> {
        check_sizes("conv1d", (spec.in_size, spec.out_size), (IN, OUT))?;
        if spec.kernel_size != K || spec.dilation != D {
            return Err(format!(
                "conv1d has kernel_size {} dilation {}, expected {} and {}",
                spec.kernel_size, spec.dilation, K, D
            ));
        }
        check_len("conv1d", "kernel", spec.kernel.len(), K * IN * OUT)?;
        check_len("conv1d", "bias", spec.bias.len(), OUT)?;
        let mut weights = [[[0.0; IN]; OUT]; K];
        for (k, tap) in spec.kernel.chunks_exact(IN * OUT).enumerate() {
            for (i, row) in tap.chunks_exact(OUT).enumerate() {
                for (o, &w) in row.iter().enumerate() {
                    weights[k][o][i] = w;
                }
            }
        }
        let mut bias = [0.0; OUT];
        bias.copy_from_slice(&spec.bias);
        Ok(Self {
            weights,
            bias,
            history: vec![[0.0; IN]; Self::HISTORY],
            pos: 0,
        })
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; IN], output: &mut [f32; OUT]) {
        self.history[self.pos] = *input;
        *output = self.bias;
        for k in 0..K {
            let lag = (K - 1 - k) * D;
            let frame = &self.history[(self.pos + Self::HISTORY - lag) % Self::HISTORY];
            for o in 0..OUT {
                let mut acc = 0.0;
                for i in 0..IN {
                    acc += frame[i] * self.weights[k][o][i];
                }
                output[o] += acc;
            }
        }
        self.pos = (self.pos + 1) % Self::HISTORY;
    }

    pub fn reset(&mut self) {
        for frame in &mut self.history {
            *frame = [0.0; IN];
        }
        self.pos = 0;
    }
}

/// GRU with per-gate weight matrices.
#[derive(Debug, Clone)]
pub struct GruT<const IN: usize, const OUT: usize> {
    w: [[[f32; IN]; OUT]; 3],
    u: [[[f32; OUT]; OUT]; 3],
    b_in: [[f32; OUT]; 3],
    b_rec: [[f32; OUT]; 3],
    state: [f32; OUT],
}

impl<const IN: usize, const OUT: usize> GruT<IN, OUT> {
    pub fn from_spec(spec: &GruSpec) -> Result<Self, String> {
        check_sizes("gru", (spec.in_size, spec.out_size), (IN, OUT))?;
        check_len("gru", "kernel", spec.kernel.len(), IN * 3 * OUT)?;
        check_len("gru", "recurrent", spec.recurrent.len(), OUT * 3 * OUT)?;
        check_len("gru", "bias", spec.bias.len(), 2 * 3 * OUT)?;
        let mut w = [[[0.0; IN]; OUT]; 3];
        for (i, row) in spec.kernel.chunks_exact(3 * OUT).enumerate() {
            for (col, &v) in row.iter().enumerate() {
                w[col / OUT][col % OUT][i] = v;
            }
        }
        let mut u = [[[0.0; OUT]; OUT]; 3];
        for (i, row) in spec.recurrent.chunks_exact(3 * OUT).enumerate() {
            for (col, &v) in row.iter().enumerate() {
                u[col / OUT][col % OUT][i] = v;
            }
        }
        let mut b_in = [[0.0; OUT]; 3];
        let mut b_rec = [[0.0; OUT]; 3];
        let (input_row, recurrent_row) = spec.bias.split_at(3 * OUT);
        for (col, (&bi, &br)) in input_row.iter().zip(recurrent_row).enumerate() {
            b_in[col / OUT][col % OUT] = bi;
            b_rec[col / OUT][col % OUT] = br;
        }
        Ok(Self {
            w,
            u,
            b_in,
            b_rec,
            state: [0.0; OUT],
        })
    }

    #[inline]
    fn project<const N: usize>(
        weights: &[[f32; N]; OUT],
        bias: &[f32; OUT],
        x: &[f32; N],
    ) -> [f32; OUT] {
        let mut out = *bias;
        for o in 0..OUT {
            for i in 0..N {
                out[o] += x[i] * weights[o][i];
            }
        }
        out
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; IN], output: &mut [f32; OUT]) {
        let xz = Self::project(&self.w[0], &self.b_in[0], input);
        let xr = Self::project(&self.w[1], &self.b_in[1], input);
        let xh = Self::project(&self.w[2], &self.b_in[2], input);
        let hz = Self::project(&self.u[0], &self.b_rec[0], &self.state);
        let hr = Self::project(&self.u[1], &self.b_rec[1], &self.state);
        let hh = Self::project(&self.u[2], &self.b_rec[2], &self.state);

        for j in 0..OUT {
            let z = sigmoid(xz[j] + hz[j]);
            let r = sigmoid(xr[j] + hr[j]);
            let c = (xh[j] + r * hh[j]).tanh();
            self.state[j] = (1.0 - z) * c + z * self.state[j];
        }
        *output = self.state;
    }

    pub fn reset(&mut self) {
        self.state = [0.0; OUT];
    }
}

/// The fixed-topology model.
#[derive(Debug, Clone)]
pub struct StaticModel {
    dense_in: DenseT<1, 8>,
    tanh_in: TanhT<8>,
    conv: Conv1dT<8, 4, 3, 2>,
    tanh_conv: TanhT<4>,
    gru: GruT<4, 8>,
    dense_out: DenseT<8, 1>,
}

impl StaticModel {
    /// Load weights from a descriptor whose layer sequence is exactly
    /// [`STATIC_TOPOLOGY`].
    pub fn from_descriptor(descriptor: &ModelDescriptor) -> BuildResult<Self> {
        if descriptor.is_empty() {
            return Err(BuildError::Empty);
        }
        descriptor.validate()?;

        let mismatch = |detail: String| BuildError::TopologyMismatch {
            expected: STATIC_TOPOLOGY,
            detail,
        };
        let tanh = ActivationKind::Tanh;
        match descriptor.layers() {
            [
                LayerSpec::Dense(d_in),
                LayerSpec::Activation { kind: a1, .. },
                LayerSpec::Conv1d(conv),
                LayerSpec::Activation { kind: a2, .. },
                LayerSpec::Gru(gru),
                LayerSpec::Dense(d_out),
            ] if *a1 == tanh && *a2 == tanh => {
                Ok(Self {
                    dense_in: DenseT::from_spec(d_in).map_err(mismatch)?,
                    tanh_in: TanhT,
                    conv: Conv1dT::from_spec(conv).map_err(mismatch)?,
                    tanh_conv: TanhT,
                    gru: GruT::from_spec(gru).map_err(mismatch)?,
                    dense_out: DenseT::from_spec(d_out).map_err(mismatch)?,
                })
            }
            _ => Err(mismatch(format!("got {}", descriptor.summary()))),
        }
    }
}

impl SampleModel for StaticModel {
    #[inline]
    fn forward(&mut self, input: f32) -> f32 {
        let mut a = [0.0; 8];
        self.dense_in.forward(&[input], &mut a);
        self.tanh_in.forward(&mut a);

        let mut b = [0.0; 4];
        self.conv.forward(&a, &mut b);
        self.tanh_conv.forward(&mut b);

        let mut c = [0.0; 8];
        self.gru.forward(&b, &mut c);

        let mut y = [0.0; 1];
        self.dense_out.forward(&c, &mut y);
        y[0]
    }

    fn reset(&mut self) {
        self.conv.reset();
        self.gru.reset();
    }
}
