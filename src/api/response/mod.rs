pub mod login;
pub mod v1;

use serde::Deserialize;
use serde_json::Value;

/// Growatt is inconsistent about ids: `"1234"` in one response, `1234` in the next.
pub fn string_or_number<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Takes `key` out of `value`, `default` when missing or `null`.
pub fn field_or(mut value: Value, key: &str, default: Value) -> Value {
    match value.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => default,
        Some(v) => v,
    }
}
