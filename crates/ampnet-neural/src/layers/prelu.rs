/// Parametric ReLU with one slope per channel.
#[derive(Debug, Clone)]
pub struct PRelu {
    alpha: Vec<f32>,
}

impl PRelu {
    pub fn new(alpha: &[f32]) -> Self {
        Self {
            alpha: alpha.to_vec(),
        }
    }

    pub fn width(&self) -> usize {
        self.alpha.len()
    }

    #[inline]
    pub fn forward(&self, input: &[f32], output: &mut [f32]) {
        for ((y, &x), &a) in output.iter_mut().zip(input).zip(&self.alpha) {
            *y = if x >= 0.0 { x } else { a * x };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelu() {
        let layer = PRelu::new(&[0.5, 0.0]);
        let mut out = [0.0; 2];
        layer.forward(&[-2.0, -2.0], &mut out);
        assert_eq!(out, [-1.0, 0.0]);
        layer.forward(&[3.0, 4.0], &mut out);
        assert_eq!(out, [3.0, 4.0]);
    }
}
