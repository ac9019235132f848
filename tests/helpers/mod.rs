//! Test helpers and fixtures for ampnet integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (single dense layer, passthrough)
//! - `MODEL_EPSILON` (1e-5): Same model evaluated by two implementations

#![allow(dead_code)]

pub mod tolerances;

use ampnet::prelude::*;
use ampnet::DynamicModel;
use std::path::PathBuf;
use std::time::Duration;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 256;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Directory holding the bundled preset models.
pub fn presets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/models")
}

/// Host pointed at the bundled presets, with a short swap timeout so a
/// broken test fails instead of hanging.
pub fn test_host() -> (NeuralController, NeuralProcessor) {
    NeuralHost::builder()
        .preset_dir(presets_dir())
        .swap_timeout(Some(Duration::from_secs(5)))
        .collector_interval(Duration::from_millis(5))
        .build()
        .expect("Failed to create test host")
}

/// One-layer model computing `gain * x + bias`.
pub fn dense_model_json(gain: f32, bias: f32) -> String {
    format!(
        r#"{{"in_shape":[null,null,1],"layers":[{{"type":"dense","activation":"","shape":[null,null,1],"weights":[[[{}]],[{}]]}}]}}"#,
        gain, bias
    )
}

/// Run `input` through a fresh model built from `text`, one sample at a time.
pub fn reference_output(text: &str, input: &[f32]) -> Vec<f32> {
    let descriptor = ampnet::parse(text).expect("reference model parses");
    let mut model = DynamicModel::build(&descriptor).expect("reference model builds");
    input.iter().map(|&x| model.forward(x)).collect()
}

/// Process a stereo block, returning (left, right).
pub fn process_stereo(
    processor: &mut NeuralProcessor,
    left: &[f32],
    right: &[f32],
) -> (Vec<f32>, Vec<f32>) {
    let mut l = left.to_vec();
    let mut r = right.to_vec();
    processor.process_block(&mut [&mut l[..], &mut r[..]]);
    (l, r)
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Wait until `condition` holds, polling every millisecond.
pub fn wait_for(mut condition: impl FnMut() -> bool, max_wait_ms: u64) -> bool {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(max_wait_ms);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
