//! [`ModelDescriptor`] → JSON model document.
//!
//! Writes the same schema [`parse`](crate::parse) reads, so
//! `parse(&to_json(&d)?) == Ok(d)` for every parsed descriptor. Activations
//! are always written as standalone `activation` layers.
//!
//! Descriptors are validated first, so hand-built ones with short tensors are
//! rejected rather than exported. JSON has no encoding for non-finite numbers;
//! [`parse`](crate::parse) never produces them.

use crate::descriptor::{LayerSpec, ModelDescriptor};
use crate::error::ShapeMismatch;
use serde_json::{json, Map, Value};

/// Serialize a descriptor as a compact JSON document.
pub fn to_json(descriptor: &ModelDescriptor) -> Result<String, ShapeMismatch> {
    Ok(to_value(descriptor)?.to_string())
}

/// Serialize a descriptor as an indented JSON document.
pub fn to_json_pretty(descriptor: &ModelDescriptor) -> Result<String, ShapeMismatch> {
    Ok(format!("{:#}", to_value(descriptor)?))
}

/// Build the document as a [`serde_json::Value`].
pub fn to_value(descriptor: &ModelDescriptor) -> Result<Value, ShapeMismatch> {
    descriptor.validate()?;
    let layers: Vec<Value> = descriptor.layers().iter().map(layer_value).collect();
    Ok(json!({
        "in_shape": [null, null, descriptor.in_size()],
        "layers": layers,
    }))
}

fn layer_value(layer: &LayerSpec) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::from(layer.type_name()));
    obj.insert(
        "shape".into(),
        json!([null, null, layer.out_size()]),
    );

    match layer {
        LayerSpec::Dense(d) => {
            obj.insert("activation".into(), Value::from(""));
            obj.insert(
                "weights".into(),
                json!([
                    nest(&d.kernel, &[d.in_size, d.out_size]),
                    nest(&d.bias, &[d.out_size]),
                ]),
            );
        }
        LayerSpec::Activation { kind, .. } => {
            obj.insert("activation".into(), Value::from(kind.name()));
        }
        LayerSpec::Conv1d(c) => {
            obj.insert("activation".into(), Value::from(""));
            obj.insert("kernel_size".into(), json!([c.kernel_size]));
            obj.insert("dilation".into(), json!([c.dilation]));
            obj.insert(
                "weights".into(),
                json!([
                    nest(&c.kernel, &[c.kernel_size, c.in_size, c.out_size]),
                    nest(&c.bias, &[c.out_size]),
                ]),
            );
        }
        LayerSpec::Gru(g) => {
            obj.insert("activation".into(), Value::from(""));
            obj.insert(
                "weights".into(),
                json!([
                    nest(&g.kernel, &[g.in_size, 3 * g.out_size]),
                    nest(&g.recurrent, &[g.out_size, 3 * g.out_size]),
                    nest(&g.bias, &[2, 3 * g.out_size]),
                ]),
            );
        }
        LayerSpec::Lstm(l) => {
            obj.insert("activation".into(), Value::from(""));
            obj.insert(
                "weights".into(),
                json!([
                    nest(&l.kernel, &[l.in_size, 4 * l.out_size]),
                    nest(&l.recurrent, &[l.out_size, 4 * l.out_size]),
                    nest(&l.bias, &[4 * l.out_size]),
                ]),
            );
        }
        LayerSpec::PRelu { alpha } => {
            obj.insert("weights".into(), json!([nest(alpha, &[alpha.len()])]));
        }
        LayerSpec::BatchNorm(b) => {
            let width = b.gamma.len();
            obj.insert("epsilon".into(), Value::from(b.epsilon));
            obj.insert(
                "weights".into(),
                json!([
                    nest(&b.gamma, &[width]),
                    nest(&b.beta, &[width]),
                    nest(&b.mean, &[width]),
                    nest(&b.variance, &[width]),
                ]),
            );
        }
    }

    Value::Object(obj)
}

/// Inverse of the parser's flattening: row-major data → nested arrays.
///
/// Expects `data.len()` to equal the product of `dims`; missing rows come out
/// empty instead of panicking.
fn nest(data: &[f32], dims: &[usize]) -> Value {
    match dims.split_first() {
        None => Value::from(data.first().copied().unwrap_or_default()),
        Some((_, [])) => Value::Array(data.iter().map(|&v| Value::from(v)).collect()),
        Some((&len, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array(
                (0..len)
                    .map(|i| {
                        let row = i
                            .checked_mul(stride)
                            .and_then(|start| data.get(start..start.checked_add(stride)?))
                            .unwrap_or_default();
                        nest(row, rest)
                    })
                    .collect(),
            )
        }
    }
}
