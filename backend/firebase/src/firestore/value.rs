//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore's REST surface wraps every value in a one-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers
//! travel as strings.

use serde_json::{Map, Number, Value, json};

/// Wrap a JSON value in Firestore's typed encoding.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode every entry of an object; the result is a document's `fields`.
pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}

/// Unwrap a Firestore typed value. Unknown encodings yield `None`.
pub fn decode(typed: &Value) -> Option<Value> {
    let obj = typed.as_object()?;
    let (kind, inner) = obj.iter().next()?;
    match kind.as_str() {
        "nullValue" => Some(Value::Null),
        "booleanValue" => inner.as_bool().map(Value::Bool),
        "integerValue" => {
            let i = match inner {
                Value::String(s) => s.parse::<i64>().ok()?,
                other => other.as_i64()?,
            };
            Some(Value::Number(i.into()))
        }
        "doubleValue" => inner.as_f64().and_then(Number::from_f64).map(Value::Number),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            inner.as_str().map(|s| Value::String(s.to_string()))
        }
        "geoPointValue" => Some(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(decode).collect())
                .unwrap_or_default();
            Some(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            Some(Value::Object(fields.map(decode_fields).unwrap_or_default()))
        }
        _ => None,
    }
}

/// Decode a document's `fields` map back into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(k, v)| decode(v).map(|d| (k.clone(), d)))
        .collect()
}
