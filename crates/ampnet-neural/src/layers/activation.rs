use crate::descriptor::ActivationKind;

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

#[inline]
pub fn elu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        x.exp() - 1.0
    }
}

/// Numerically stable softmax over the whole slice.
#[inline]
pub fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Activation {
    kind: ActivationKind,
    width: usize,
}

impl Activation {
    pub fn new(kind: ActivationKind, width: usize) -> Self {
        Self { kind, width }
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn forward(&self, input: &[f32], output: &mut [f32]) {
        match self.kind {
            ActivationKind::Identity => output.copy_from_slice(input),
            ActivationKind::Tanh => map(input, output, f32::tanh),
            ActivationKind::ReLU => map(input, output, relu),
            ActivationKind::Sigmoid => map(input, output, sigmoid),
            ActivationKind::Elu => map(input, output, elu),
            ActivationKind::Softmax => {
                output.copy_from_slice(input);
                softmax_in_place(output);
            }
        }
    }
}

#[inline(always)]
fn map(input: &[f32], output: &mut [f32], f: impl Fn(f32) -> f32) {
    for (y, &x) in output.iter_mut().zip(input) {
        *y = f(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_functions() {
        assert_eq!(relu(-2.0), 0.0);
        assert_eq!(relu(2.0), 2.0);
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(elu(-1.0), (-1.0f32).exp() - 1.0);
        assert_eq!(elu(1.5), 1.5);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let layer = Activation::new(ActivationKind::Softmax, 3);
        let mut out = [0.0; 3];
        layer.forward(&[1.0, 2.0, 3.0], &mut out);
        assert_relative_eq!(out.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn test_identity_copies() {
        let layer = Activation::new(ActivationKind::Identity, 2);
        let mut out = [0.0; 2];
        layer.forward(&[-1.0, 4.0], &mut out);
        assert_eq!(out, [-1.0, 4.0]);
    }
}
