//! Tolerance constants for model output comparisons.

/// Floating point rounding errors.
/// Use for operations that should be mathematically exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Same model evaluated by two implementations that sum in different orders
/// (dynamic vs static path).
pub const MODEL_EPSILON: f32 = 1e-5;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;
