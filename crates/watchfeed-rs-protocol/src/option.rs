//! Normalized select-option type for service-provided choice lists.
//!
//! The dashboard backends historically shipped option objects in several
//! shapes (`label`/`name`/`title` for the display text, `value`/`id`/`key`
//! for the value). Normalization happens once, at the serde boundary; read
//! sites only ever see `label` and `value`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A display choice resolved to a single canonical shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NormalizedOption {
    /// Text shown to the user.
    pub label: String,
    /// Value submitted back to the service.
    pub value: String,
}

impl NormalizedOption {
    /// Build an option from already-normalized parts.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

const LABEL_KEYS: [&str; 3] = ["label", "name", "title"];
const VALUE_KEYS: [&str; 3] = ["value", "id", "key"];

fn first_present<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for NormalizedOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        match raw {
            // A bare string is both label and value.
            Value::String(text) => Ok(NormalizedOption {
                label: text.clone(),
                value: text,
            }),
            Value::Object(map) => {
                let label = first_present(&map, &LABEL_KEYS).and_then(stringify);
                let value = first_present(&map, &VALUE_KEYS).and_then(stringify);
                let (label, value) = match (label, value) {
                    (Some(label), Some(value)) => (label, value),
                    (Some(label), None) => (label.clone(), label),
                    (None, Some(value)) => (value.clone(), value),
                    (None, None) => {
                        return Err(de::Error::custom(
                            "option object has no label/name/title or value/id/key",
                        ));
                    }
                };
                Ok(NormalizedOption { label, value })
            }
            other => Err(de::Error::custom(format!(
                "expected option object or string, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NormalizedOption;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> NormalizedOption {
        serde_json::from_value(value).expect("decode option")
    }

    #[test]
    fn resolves_each_historical_shape() {
        assert_eq!(
            decode(json!({ "label": "Movies", "value": "movie" })),
            NormalizedOption::new("Movies", "movie")
        );
        assert_eq!(
            decode(json!({ "name": "Series", "id": 2 })),
            NormalizedOption::new("Series", "2")
        );
        assert_eq!(
            decode(json!({ "title": "All", "key": "all" })),
            NormalizedOption::new("All", "all")
        );
    }

    #[test]
    fn falls_back_to_the_present_half() {
        assert_eq!(
            decode(json!({ "name": "Movies" })),
            NormalizedOption::new("Movies", "Movies")
        );
        assert_eq!(
            decode(json!({ "id": 7 })),
            NormalizedOption::new("7", "7")
        );
        assert_eq!(decode(json!("movie")), NormalizedOption::new("movie", "movie"));
    }

    #[test]
    fn label_keys_win_in_declared_order() {
        assert_eq!(
            decode(json!({ "title": "fallback", "label": "primary", "value": "v" })),
            NormalizedOption::new("primary", "v")
        );
    }

    #[test]
    fn rejects_shapeless_objects() {
        let result: Result<NormalizedOption, _> = serde_json::from_value(json!({ "other": true }));
        assert!(result.is_err());
        let result: Result<NormalizedOption, _> = serde_json::from_value(json!(42));
        assert!(result.is_err());
    }
}
