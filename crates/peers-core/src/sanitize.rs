//! Recursive JSON sanitization.
//!
//! `serde_json::Value` cannot itself represent NaN or infinity, so the
//! recursive walk is a structural guarantee over already-parsed payloads,
//! while [`sanitize_f64`] is the numeric guard applied wherever raw floats
//! enter the canonical model.

use serde_json::Value;

/// Recursively sanitize a JSON-like value: non-finite numbers become null,
/// maps keep their key order, sequences keep their element order, everything
/// else passes through unchanged.
pub fn sanitize_json(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (key, sanitize_json(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_json).collect()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            _ => Value::Number(n),
        },
        other => other,
    }
}

/// NaN and infinity become `None`; finite values pass through.
pub fn sanitize_f64(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_scalars_through_unchanged() {
        assert_eq!(sanitize_json(json!("text")), json!("text"));
        assert_eq!(sanitize_json(json!(42)), json!(42));
        assert_eq!(sanitize_json(json!(1.5)), json!(1.5));
        assert_eq!(sanitize_json(json!(true)), json!(true));
        assert_eq!(sanitize_json(json!(null)), json!(null));
    }

    #[test]
    fn walks_nested_structures() {
        let input = json!({
            "ticker": "AAPL",
            "financials": {"revenue": [{"period": "2024-Q1", "value": 1000.0}]},
            "tags": ["a", "b"],
        });
        assert_eq!(sanitize_json(input.clone()), input);
    }

    #[test]
    fn is_idempotent() {
        let input = json!([{"a": [1, 2.5, null]}, "x", false]);
        let once = sanitize_json(input);
        let twice = sanitize_json(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_key_order() {
        let input = json!({"zebra": 1, "alpha": 2, "mid": 3});
        let keys: Vec<String> = sanitize_json(input)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zebra", "alpha", "mid"]);
    }

    #[test]
    fn numeric_guard_nulls_non_finite() {
        assert_eq!(sanitize_f64(f64::NAN), None);
        assert_eq!(sanitize_f64(f64::INFINITY), None);
        assert_eq!(sanitize_f64(f64::NEG_INFINITY), None);
        assert_eq!(sanitize_f64(0.0), Some(0.0));
        assert_eq!(sanitize_f64(-12.75), Some(-12.75));
    }
}
