use crate::error::PalisadeError;
use serde_json::{Map, Value};

/// The bulk-update operators whose nested keys are narrowed alongside the
/// top-level payload
pub const UPDATE_OPERATORS: &[&str] = &["$set", "$unset", "$addToSet", "$pull", "$push"];

fn field_allowed(key: &str, allowed: &[String]) -> bool {
    allowed
        .iter()
        .any(|entry| key == entry || key.starts_with(&format!("{entry}.")))
}

/// Narrow a payload to the explicitly allow-listed fields, across both
/// top-level keys and keys nested under the recognized update operators.
/// Bulk (array) payloads are rejected: narrowing supports single-record
/// payloads only.
pub fn retain_allowed_fields(data: &Value, allowed: &[String]) -> Result<Value, PalisadeError> {
    let object = match data {
        Value::Array(_) => {
            return Err(PalisadeError::InvalidPayload(
                "Bulk payloads are not supported by partial authorization".into(),
            ))
        }
        Value::Object(object) => object,
        other => return Ok(other.clone()),
    };

    let mut retained = Map::new();

    for (key, value) in object {
        if UPDATE_OPERATORS.contains(&key.as_str()) {
            if let Value::Object(nested) = value {
                let kept: Map<String, Value> = nested
                    .iter()
                    .filter(|(nested_key, _)| field_allowed(nested_key, allowed))
                    .map(|(nested_key, nested_value)| (nested_key.clone(), nested_value.clone()))
                    .collect();

                if !kept.is_empty() {
                    retained.insert(key.clone(), Value::Object(kept));
                }
            }
        } else if field_allowed(key, allowed) {
            retained.insert(key.clone(), value.clone());
        }
    }

    Ok(Value::Object(retained))
}
