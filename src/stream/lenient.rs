//! Forgiving field deserializers for backend payloads
//!
//! The producers are loosely typed: counts arrive as `2` or `2.0` or `"2"`,
//! optional fields arrive as `null`. Each helper here reads the field as a
//! [`Value`] first and coerces it, so an oddly typed field degrades to its
//! default instead of failing the whole record. Use them with
//! `#[serde(default, deserialize_with = "...")]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Non-negative whole number from a JSON number or numeric string.
///
/// Fractions are truncated; negative, non-finite, or non-numeric values
/// yield `None`.
///
/// # Examples
///
/// ```
/// use ragstream::stream::lenient::count_value;
/// use serde_json::json;
///
/// assert_eq!(count_value(&json!(2048.0)), Some(2048));
/// assert_eq!(count_value(&json!("12")), Some(12));
/// assert_eq!(count_value(&json!(-1)), None);
/// assert_eq!(count_value(&json!(null)), None);
/// ```
pub fn count_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (float.is_finite() && float >= 0.0).then(|| float.trunc() as u64)
}

/// Finite float from a JSON number or numeric string
pub fn number_value(value: &Value) -> Option<f64> {
    let float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    float.is_finite().then_some(float)
}

/// Text from a JSON string, or the literal form of a number or bool
pub fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `Option<T>` count; also narrows to `u32` and friends
pub fn count<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_value(&value).and_then(|n| T::try_from(n).ok()))
}

/// `Option<f64>`
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_value(&value))
}

/// `f64`, zero when absent or unusable
pub fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number(deserializer).map(|n| n.unwrap_or(0.0))
}

/// `Option<String>`
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_value(&value))
}

/// `String`, empty when absent or unusable
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(Option::unwrap_or_default)
}

/// `bool` by JavaScript truthiness
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(crate::stream::envelope::is_truthy(&value))
}

/// `Option<T>` for a nested record; a mismatched shape yields `None`
pub fn record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed nested record");
            Ok(None)
        }
    }
}

/// `Vec<T>` where unusable elements are skipped one by one; a non-array
/// yields an empty list
pub fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(elements) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value(element) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed list element");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "count")]
        small: Option<u32>,
        #[serde(default, deserialize_with = "number_or_zero")]
        score: f64,
        #[serde(default, deserialize_with = "items")]
        names: Vec<String>,
        #[serde(default, deserialize_with = "flag")]
        on: bool,
    }

    #[test]
    fn test_count_value_coercions() {
        assert_eq!(count_value(&json!(7)), Some(7));
        assert_eq!(count_value(&json!(7.9)), Some(7));
        assert_eq!(count_value(&json!(" 3 ")), Some(3));
        assert_eq!(count_value(&json!("many")), None);
        assert_eq!(count_value(&json!(true)), None);
    }

    #[test]
    fn test_number_value_rejects_non_numeric() {
        assert_eq!(number_value(&json!("0.91")), Some(0.91));
        assert_eq!(number_value(&json!(null)), None);
        assert_eq!(number_value(&json!([1])), None);
    }

    #[test]
    fn test_fields_degrade_independently() {
        let sample: Sample = serde_json::from_value(json!({
            "small": 5_000_000_000u64,
            "score": null,
            "names": ["a", 3, "b"],
            "on": 1
        }))
        .unwrap();
        assert_eq!(sample.small, None);
        assert_eq!(sample.score, 0.0);
        assert_eq!(sample.names, vec!["a", "b"]);
        assert!(sample.on);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let sample: Sample = serde_json::from_value(json!({})).unwrap();
        assert_eq!(sample.small, None);
        assert!(sample.names.is_empty());
        assert!(!sample.on);
    }

    #[test]
    fn test_non_array_items_is_empty() {
        let sample: Sample = serde_json::from_value(json!({"names": "a"})).unwrap();
        assert!(sample.names.is_empty());
    }
}
