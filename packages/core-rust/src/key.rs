//! Cache key construction from `{component, operation, args}`.
//!
//! # Key format
//!
//! A key is the dotted text `Component.operation.<args>` where `<args>` is the
//! compact JSON array of the argument list:
//!
//! ```text
//! Lens.getAssets.[]
//! VaultReader.positionsOf.["0xabc",["0x1","0x2"]]
//! ```
//!
//! Names never contain `.` (see [`crate::descriptor`]) and the argument
//! segment is always a JSON array, so the text determines the triple
//! uniquely. JSON objects serialize with sorted keys, which makes the
//! encoding depend only on the structural value of the arguments. Floating
//! point `-0.0` compares equal to `0.0` and is rendered as `0.0`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::args::Args;
use crate::descriptor::OperationDescriptor;

/// Deterministic identity of one `(component, operation, args)` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// BLAKE3 digest of the key text, hex encoded (64 chars).
    ///
    /// For backends that limit key length; equal keys give equal digests.
    #[must_use]
    pub fn digest(&self) -> String {
        blake3::hash(self.0.as_bytes()).to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encodes the cache key for a call. Pure and deterministic.
///
/// ```
/// use vaultkit_core::{args, encode, OperationDescriptor};
///
/// let lens = OperationDescriptor::new("Lens", "getAssets").unwrap();
/// assert_eq!(encode(&lens, &args![]).as_str(), "Lens.getAssets.[]");
/// ```
#[must_use]
pub fn encode(descriptor: &OperationDescriptor, args: &Args) -> CacheKey {
    // Serializing a `Value` tree into a `String` cannot fail: every map key is
    // already a string and there is no I/O.
    let rendered = if args.as_slice().iter().any(has_negative_zero) {
        let normalized: Vec<Value> = args.as_slice().iter().map(canonical).collect();
        serde_json::to_string(&normalized)
    } else {
        serde_json::to_string(args.as_slice())
    }
    .unwrap_or_default();
    CacheKey(format!(
        "{}.{}.{}",
        descriptor.component, descriptor.operation, rendered
    ))
}

fn is_negative_zero(number: &Number) -> bool {
    number
        .as_f64()
        .is_some_and(|f| number.is_f64() && f.to_bits() == (-0.0_f64).to_bits())
}

fn has_negative_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => is_negative_zero(n),
        Value::Array(items) => items.iter().any(has_negative_zero),
        Value::Object(map) => map.values().any(has_negative_zero),
        Value::Null | Value::Bool(_) | Value::String(_) => false,
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Number(n) if is_negative_zero(n) => Value::from(0.0),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonical(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
