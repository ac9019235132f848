//! JSON model document → [`ModelDescriptor`].
//!
//! Document shape (as written by the exporting tooling):
//!
//! ```json
//! {
//!   "in_shape": [null, null, 1],
//!   "layers": [
//!     { "type": "dense", "activation": "tanh", "shape": [null, null, 8],
//!       "weights": [ [[...8 values...]], [...8 values...] ] }
//!   ]
//! }
//! ```
//!
//! The last entry of `shape` is the layer's output width. Each layer's input
//! width is the previous layer's output width, so weight tensors are checked
//! against both.

use crate::descriptor::{
    checked_product, ActivationKind, BatchNormSpec, Conv1dSpec, DenseSpec, GruSpec, LayerSpec,
    LstmSpec, ModelDescriptor, MAX_LAYER_WIDTH,
};
use crate::error::{ParseError, ParseResult, ShapeMismatch};
use serde::Deserialize;
use serde_json::Value;

/// Default batch-norm epsilon when the document omits it.
pub const DEFAULT_BATCHNORM_EPSILON: f32 = 0.001;

#[derive(Debug, Deserialize)]
struct RawModel {
    in_shape: Vec<Option<usize>>,
    layers: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    #[serde(rename = "type")]
    layer_type: String,
    #[serde(default)]
    activation: String,
    #[serde(default)]
    shape: Vec<Option<usize>>,
    #[serde(default)]
    weights: Vec<Value>,
    #[serde(default)]
    kernel_size: Vec<usize>,
    #[serde(default)]
    dilation: Vec<usize>,
    #[serde(default)]
    epsilon: Option<f32>,
}

/// Parse a model document. Returns either a fully validated descriptor or an
/// error; never a partial model.
pub fn parse(text: &str) -> ParseResult<ModelDescriptor> {
    let raw: RawModel = serde_json::from_str(text)?;

    let in_size = match raw.in_shape.last() {
        Some(Some(n)) if *n > 0 && *n <= MAX_LAYER_WIDTH => *n,
        _ => {
            return Err(ParseError::Malformed(format!(
                "in_shape must end with an input width in 1..={}",
                MAX_LAYER_WIDTH
            )))
        }
    };

    let mut layers = Vec::with_capacity(raw.layers.len() * 2);
    let mut width = in_size;
    for (index, layer) in raw.layers.iter().enumerate() {
        width = parse_layer(index, layer, width, &mut layers)?;
    }

    let descriptor = ModelDescriptor::new(in_size, layers);
    descriptor.validate()?;

    tracing::debug!(
        "Parsed model: {} ({} weights)",
        descriptor.summary(),
        descriptor.weight_count()
    );
    Ok(descriptor)
}

/// Append the layer spec(s) for one document layer. Returns the new running width.
fn parse_layer(
    index: usize,
    raw: &RawLayer,
    width: usize,
    out: &mut Vec<LayerSpec>,
) -> ParseResult<usize> {
    let activation = || {
        ActivationKind::from_name(&raw.activation).ok_or_else(|| ParseError::UnsupportedLayer {
            layer: index,
            name: format!("activation '{}'", raw.activation),
        })
    };

    match raw.layer_type.as_str() {
        "dense" | "time-distributed-dense" => {
            let out_size = declared_width(index, raw)?;
            let kind = activation()?;
            let weights = weight_slots(index, raw, 2)?;
            out.push(LayerSpec::Dense(DenseSpec {
                in_size: width,
                out_size,
                kernel: read_tensor(index, "kernel", &weights[0], &[width, out_size])?,
                bias: read_tensor(index, "bias", &weights[1], &[out_size])?,
            }));
            push_activation(out, kind, out_size);
            Ok(out_size)
        }
        "conv1d" => {
            let out_size = declared_width(index, raw)?;
            let kind = activation()?;
            let kernel_size = first_positive(index, "kernel_size", &raw.kernel_size, None)?;
            let dilation = first_positive(index, "dilation", &raw.dilation, Some(1))?;
            let weights = weight_slots(index, raw, 2)?;
            out.push(LayerSpec::Conv1d(Conv1dSpec {
                in_size: width,
                out_size,
                kernel_size,
                dilation,
                kernel: read_tensor(
                    index,
                    "kernel",
                    &weights[0],
                    &[kernel_size, width, out_size],
                )?,
                bias: read_tensor(index, "bias", &weights[1], &[out_size])?,
            }));
            push_activation(out, kind, out_size);
            Ok(out_size)
        }
        "gru" => {
            let out_size = declared_width(index, raw)?;
            let gates = gate_width(index, out_size, 3)?;
            let weights = weight_slots(index, raw, 3)?;
            out.push(LayerSpec::Gru(GruSpec {
                in_size: width,
                out_size,
                kernel: read_tensor(index, "kernel", &weights[0], &[width, gates])?,
                recurrent: read_tensor(index, "recurrent", &weights[1], &[out_size, gates])?,
                bias: read_tensor(index, "bias", &weights[2], &[2, gates])?,
            }));
            Ok(out_size)
        }
        "lstm" => {
            let out_size = declared_width(index, raw)?;
            let gates = gate_width(index, out_size, 4)?;
            let weights = weight_slots(index, raw, 3)?;
            out.push(LayerSpec::Lstm(LstmSpec {
                in_size: width,
                out_size,
                kernel: read_tensor(index, "kernel", &weights[0], &[width, gates])?,
                recurrent: read_tensor(index, "recurrent", &weights[1], &[out_size, gates])?,
                bias: read_tensor(index, "bias", &weights[2], &[gates])?,
            }));
            Ok(out_size)
        }
        "prelu" => {
            let out_size = same_width(index, raw, width)?;
            let weights = weight_slots(index, raw, 1)?;
            out.push(LayerSpec::PRelu {
                alpha: read_tensor(index, "alpha", &weights[0], &[out_size])?,
            });
            Ok(out_size)
        }
        "batchnorm" => {
            let out_size = same_width(index, raw, width)?;
            let (gamma, beta, mean, variance) = match raw.weights.len() {
                4 => (
                    read_tensor(index, "gamma", &raw.weights[0], &[out_size])?,
                    read_tensor(index, "beta", &raw.weights[1], &[out_size])?,
                    read_tensor(index, "mean", &raw.weights[2], &[out_size])?,
                    read_tensor(index, "variance", &raw.weights[3], &[out_size])?,
                ),
                2 => (
                    vec![1.0; out_size],
                    vec![0.0; out_size],
                    read_tensor(index, "mean", &raw.weights[0], &[out_size])?,
                    read_tensor(index, "variance", &raw.weights[1], &[out_size])?,
                ),
                n => {
                    return Err(ShapeMismatch::new(
                        index,
                        format!("batchnorm expects 2 or 4 weight tensors, got {}", n),
                    )
                    .into())
                }
            };
            let epsilon = raw.epsilon.unwrap_or(DEFAULT_BATCHNORM_EPSILON);
            if !epsilon.is_finite() {
                return Err(ParseError::Malformed(format!(
                    "layer {}: batchnorm epsilon is not a finite f32",
                    index
                )));
            }
            out.push(LayerSpec::BatchNorm(BatchNormSpec {
                gamma,
                beta,
                mean,
                variance,
                epsilon,
            }));
            Ok(out_size)
        }
        "activation" => {
            let out_size = same_width(index, raw, width)?;
            if raw.activation.is_empty() {
                return Err(ParseError::Malformed(format!(
                    "layer {}: activation layer without an activation name",
                    index
                )));
            }
            out.push(LayerSpec::Activation {
                kind: activation()?,
                width: out_size,
            });
            Ok(out_size)
        }
        other => Err(ParseError::UnsupportedLayer {
            layer: index,
            name: other.to_string(),
        }),
    }
}

fn push_activation(out: &mut Vec<LayerSpec>, kind: ActivationKind, width: usize) {
    if kind != ActivationKind::Identity {
        out.push(LayerSpec::Activation { kind, width });
    }
}

fn declared_width(index: usize, raw: &RawLayer) -> ParseResult<usize> {
    match raw.shape.last() {
        Some(Some(n)) if *n > MAX_LAYER_WIDTH => Err(ShapeMismatch::new(
            index,
            format!(
                "{} declares width {}, above the limit of {}",
                raw.layer_type, n, MAX_LAYER_WIDTH
            ),
        )
        .into()),
        Some(Some(n)) if *n > 0 => Ok(*n),
        _ => Err(ParseError::Malformed(format!(
            "layer {} ({}): shape must end with a positive width",
            index, raw.layer_type
        ))),
    }
}

/// Column count of a stacked-gate recurrent matrix.
fn gate_width(index: usize, out_size: usize, gates: usize) -> ParseResult<usize> {
    out_size.checked_mul(gates).ok_or_else(|| {
        ShapeMismatch::new(index, format!("{} gates of width {} overflow", gates, out_size)).into()
    })
}

/// Width for layers that cannot change it. `shape` is optional for these.
fn same_width(index: usize, raw: &RawLayer, width: usize) -> ParseResult<usize> {
    match raw.shape.last() {
        None | Some(None) => Ok(width),
        Some(Some(n)) if *n == width => Ok(width),
        Some(Some(n)) => Err(ShapeMismatch::new(
            index,
            format!(
                "{} declares width {} but its input is {}",
                raw.layer_type, n, width
            ),
        )
        .into()),
    }
}

fn first_positive(
    index: usize,
    name: &str,
    values: &[usize],
    default: Option<usize>,
) -> ParseResult<usize> {
    match (values.first(), default) {
        (Some(&n), _) if n > 0 => Ok(n),
        (None, Some(n)) => Ok(n),
        _ => Err(ParseError::Malformed(format!(
            "layer {}: {} must be a positive integer",
            index, name
        ))),
    }
}

fn weight_slots(index: usize, raw: &RawLayer, expected: usize) -> ParseResult<&[Value]> {
    if raw.weights.len() != expected {
        return Err(ShapeMismatch::new(
            index,
            format!(
                "{} expects {} weight tensors, got {}",
                raw.layer_type,
                expected,
                raw.weights.len()
            ),
        )
        .into());
    }
    Ok(&raw.weights)
}

/// Flatten a nested JSON array whose nesting must match `dims` exactly.
///
/// Storage grows with the values actually present in the document, never with
/// the declared dims.
fn read_tensor(index: usize, name: &str, value: &Value, dims: &[usize]) -> ParseResult<Vec<f32>> {
    if checked_product(dims).is_none() {
        return Err(ShapeMismatch::new(
            index,
            format!("{} dimensions {:?} overflow", name, dims),
        )
        .into());
    }
    let mut out = Vec::new();
    flatten_into(index, name, value, dims, &mut out)?;
    Ok(out)
}

fn flatten_into(
    index: usize,
    name: &str,
    value: &Value,
    dims: &[usize],
    out: &mut Vec<f32>,
) -> ParseResult<()> {
    match dims.split_first() {
        None => match value.as_f64().map(|v| v as f32) {
            Some(v) if v.is_finite() => {
                out.push(v);
                Ok(())
            }
            Some(_) => Err(ParseError::Malformed(format!(
                "layer {}: {} value {} is out of f32 range",
                index, name, value
            ))),
            None => Err(ParseError::Malformed(format!(
                "layer {}: {} contains non-numeric value {}",
                index, name, value
            ))),
        },
        Some((&len, rest)) => {
            let items = value.as_array().ok_or_else(|| {
                ShapeMismatch::new(index, format!("{} is not nested {} deep", name, dims.len()))
            })?;
            if items.len() != len {
                return Err(ShapeMismatch::new(
                    index,
                    format!("{} has {} entries where {} are expected", name, items.len(), len),
                )
                .into());
            }
            for item in items {
                flatten_into(index, name, item, rest, out)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE_BY_TWO: &str = r#"{
        "in_shape": [null, null, 1],
        "layers": [
            { "type": "dense", "activation": "", "shape": [null, null, 1],
              "weights": [ [[2.0]], [0.0] ] }
        ]
    }"#;

    #[test]
    fn test_parse_single_dense() {
        let desc = parse(SCALE_BY_TWO).unwrap();
        assert_eq!(desc.len(), 1);
        assert_eq!(desc.in_size(), 1);
        assert_eq!(desc.out_size(), 1);
        match &desc.layers()[0] {
            LayerSpec::Dense(d) => {
                assert_eq!(d.kernel, vec![2.0]);
                assert_eq!(d.bias, vec![0.0]);
            }
            other => panic!("expected dense, got {:?}", other),
        }
    }

    #[test]
    fn test_dense_activation_expands() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [
                { "type": "dense", "activation": "tanh", "shape": [null, null, 2],
                  "weights": [ [[1.0, -1.0]], [0.0, 0.5] ] }
            ]
        }"#;
        let desc = parse(text).unwrap();
        assert_eq!(desc.len(), 2);
        assert_eq!(
            desc.layers()[1],
            LayerSpec::Activation {
                kind: ActivationKind::Tanh,
                width: 2
            }
        );
    }

    #[test]
    fn test_malformed_text() {
        assert!(matches!(parse("{not json"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse("[]"), Err(ParseError::Malformed(_))));
        assert!(matches!(
            parse(r#"{"in_shape": [null, null, 1]}"#),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_unsupported_layer() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "attention", "shape": [null, null, 1], "weights": [] } ]
        }"#;
        match parse(text) {
            Err(ParseError::UnsupportedLayer { layer, name }) => {
                assert_eq!(layer, 0);
                assert_eq!(name, "attention");
            }
            other => panic!("expected UnsupportedLayer, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_activation() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "dense", "activation": "swish", "shape": [null, null, 1],
                          "weights": [ [[1.0]], [0.0] ] } ]
        }"#;
        assert!(matches!(
            parse(text),
            Err(ParseError::UnsupportedLayer { layer: 0, .. })
        ));
    }

    #[test]
    fn test_adjacent_width_mismatch() {
        // Second dense declares a kernel for 3 inputs but receives 2.
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [
                { "type": "dense", "activation": "", "shape": [null, null, 2],
                  "weights": [ [[1.0, 1.0]], [0.0, 0.0] ] },
                { "type": "dense", "activation": "", "shape": [null, null, 1],
                  "weights": [ [[1.0], [1.0], [1.0]], [0.0] ] }
            ]
        }"#;
        match parse(text) {
            Err(ParseError::ShapeMismatch(err)) => assert_eq!(err.layer, 1),
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_short_bias_is_not_truncated() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "dense", "activation": "", "shape": [null, null, 2],
                          "weights": [ [[1.0, 1.0]], [0.0] ] } ]
        }"#;
        assert!(matches!(parse(text), Err(ParseError::ShapeMismatch(_))));
    }

    #[test]
    fn test_activation_layer_width_mismatch() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "activation", "activation": "relu", "shape": [null, null, 4] } ]
        }"#;
        assert!(matches!(parse(text), Err(ParseError::ShapeMismatch(_))));
    }

    #[test]
    fn test_non_numeric_weight() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "dense", "activation": "", "shape": [null, null, 1],
                          "weights": [ [["two"]], [0.0] ] } ]
        }"#;
        assert!(matches!(parse(text), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_conv1d_defaults_dilation() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "conv1d", "activation": "", "shape": [null, null, 1],
                          "kernel_size": [2],
                          "weights": [ [[[0.5]], [[0.5]]], [0.0] ] } ]
        }"#;
        match &parse(text).unwrap().layers()[0] {
            LayerSpec::Conv1d(c) => {
                assert_eq!(c.kernel_size, 2);
                assert_eq!(c.dilation, 1);
            }
            other => panic!("expected conv1d, got {:?}", other),
        }
    }

    #[test]
    fn test_batchnorm_without_affine() {
        let text = r#"{
            "in_shape": [null, null, 2],
            "layers": [ { "type": "batchnorm", "shape": [null, null, 2],
                          "weights": [ [0.0, 1.0], [1.0, 4.0] ] } ]
        }"#;
        match &parse(text).unwrap().layers()[0] {
            LayerSpec::BatchNorm(b) => {
                assert_eq!(b.gamma, vec![1.0, 1.0]);
                assert_eq!(b.beta, vec![0.0, 0.0]);
                assert_eq!(b.epsilon, DEFAULT_BATCHNORM_EPSILON);
            }
            other => panic!("expected batchnorm, got {:?}", other),
        }
    }

    #[test]
    fn test_absurd_dense_width_is_rejected() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "dense", "activation": "", "shape": [null, null, 4611686018427387904],
                          "weights": [ [[1.0]], [0.0] ] } ]
        }"#;
        match parse(text) {
            Err(ParseError::ShapeMismatch(err)) => assert_eq!(err.layer, 0),
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_absurd_gru_width_is_rejected() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "gru", "shape": [null, null, 9223372036854775807],
                          "weights": [ [[1.0]], [[1.0]], [[0.0], [0.0]] ] } ]
        }"#;
        assert!(matches!(parse(text), Err(ParseError::ShapeMismatch(_))));
    }

    #[test]
    fn test_gate_width_overflow() {
        assert!(gate_width(3, usize::MAX / 2, 3).is_err());
        assert_eq!(gate_width(3, 8, 4).unwrap(), 32);
    }

    #[test]
    fn test_huge_conv_dilation_is_rejected() {
        for dilation in ["4611686018427387904", "1000000000"] {
            let text = format!(
                r#"{{
                    "in_shape": [null, null, 1],
                    "layers": [ {{ "type": "conv1d", "activation": "", "shape": [null, null, 1],
                                  "kernel_size": [2], "dilation": [{}],
                                  "weights": [ [[[0.5]], [[0.5]]], [0.0] ] }} ]
                }}"#,
                dilation
            );
            assert!(
                matches!(parse(&text), Err(ParseError::ShapeMismatch(_))),
                "dilation {}",
                dilation
            );
        }
    }

    #[test]
    fn test_out_of_range_weight_is_rejected() {
        let text = r#"{
            "in_shape": [null, null, 1],
            "layers": [ { "type": "dense", "activation": "", "shape": [null, null, 1],
                          "weights": [ [[1e39]], [0.0] ] } ]
        }"#;
        assert!(matches!(parse(text), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_oversized_input_width_is_rejected() {
        let text = r#"{ "in_shape": [null, null, 18446744073709551615], "layers": [] }"#;
        assert!(matches!(parse(text), Err(ParseError::Malformed(_))));
    }
}
