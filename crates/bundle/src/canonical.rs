//! Canonical JSON encoding.
//!
//! The bundle is the content of the config blob, so its digest has to be
//! stable: identical bundles must always produce identical bytes. The
//! encoding sorts object keys by their UTF-8 bytes at every depth, emits no
//! insignificant whitespace and, following OLPC canonical JSON, admits only
//! integer numbers.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{Bundle, Error, Result};

/// Encode a bundle as canonical JSON.
pub fn to_canonical_json(bundle: &Bundle) -> Result<Vec<u8>> {
    let bytes = encode(bundle)?;
    trace!(name = %bundle.name, size = bytes.len(), "Encoded canonical bundle");
    Ok(bytes)
}

/// Encode any serializable value as canonical JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut pointer = String::new();
    let canonical = canonicalize(value, &mut pointer)?;
    Ok(serde_json::to_vec(&canonical)?)
}

// Rebuilds every object with its keys inserted in sorted order, so the
// output does not depend on whether serde_json keeps insertion order.
fn canonicalize(value: Value, pointer: &mut String) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, child) in entries {
                let mark = pointer.len();
                pointer.push('/');
                pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                let child = canonicalize(child, pointer)?;
                pointer.truncate(mark);
                sorted.insert(key, child);
            }
            Ok(Value::Object(sorted))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, child) in items.into_iter().enumerate() {
                let mark = pointer.len();
                pointer.push('/');
                pointer.push_str(&index.to_string());
                out.push(canonicalize(child, pointer)?);
                pointer.truncate(mark);
            }
            Ok(Value::Array(out))
        }
        Value::Number(number) if number.is_f64() => {
            Err(Error::non_canonical_number(pointer.clone(), number.to_string()))
        }
        other => Ok(other),
    }
}
