//! Typed attribute-input callbacks.
//!
//! The identity service asks for profile attributes with callbacks shaped
//! like
//!
//! ```json
//! {
//!   "type": "BooleanAttributeInputCallback",
//!   "output": [{ "name": "name", "value": "preferences/updates" }, ...],
//!   "input": [{ "name": "IDToken1", "value": false },
//!             { "name": "IDToken1validateOnly", "value": false }]
//! }
//! ```
//!
//! [`AttributeInputCallback`] parses that shape, holds a typed value and
//! writes it back into the `input` array for submission.

use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

/// Errors reading a callback from server JSON.
#[derive(Debug, Error, PartialEq)]
pub enum CallbackError {
    #[error("expected a {expected} callback, found {found}")]
    WrongType { expected: &'static str, found: String },

    #[error("callback is missing '{0}'")]
    MissingField(&'static str),

    #[error("callback field '{field}' has an unexpected value type")]
    InvalidValue { field: String },
}

/// A value type an attribute callback can carry.
pub trait AttributeValue: Clone + Sized {
    /// Server callback type name.
    const CALLBACK_TYPE: &'static str;

    fn from_json(value: &JsonValue) -> Option<Self>;
    fn to_json(&self) -> JsonValue;
}

impl AttributeValue for bool {
    const CALLBACK_TYPE: &'static str = "BooleanAttributeInputCallback";

    fn from_json(value: &JsonValue) -> Option<Self> {
        value.as_bool()
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::Bool(*self)
    }
}

impl AttributeValue for f64 {
    const CALLBACK_TYPE: &'static str = "NumberAttributeInputCallback";

    fn from_json(value: &JsonValue) -> Option<Self> {
        value.as_f64()
    }

    fn to_json(&self) -> JsonValue {
        json!(self)
    }
}

/// Callback collecting a single boolean attribute.
pub type BooleanAttributeInputCallback = AttributeInputCallback<bool>;

/// Callback collecting a single numeric attribute.
pub type NumberAttributeInputCallback = AttributeInputCallback<f64>;

/// A server-defined attribute input with validation policies.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInputCallback<T: AttributeValue> {
    /// Attribute path, e.g. `preferences/updates`.
    pub name: String,
    pub prompt: String,
    pub required: bool,
    /// Policies the server validates the value against.
    pub policies: JsonValue,
    /// Policies the last submitted value failed.
    pub failed_policies: Vec<JsonValue>,
    value: Option<T>,
    validate_only: bool,
    input_name: String,
    raw: Map<String, JsonValue>,
}

impl<T: AttributeValue> AttributeInputCallback<T> {
    /// Parses a callback object received from the server.
    pub fn from_json(json: &JsonValue) -> Result<Self, CallbackError> {
        let raw = json
            .as_object()
            .ok_or(CallbackError::MissingField("type"))?
            .clone();

        let found = raw
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or(CallbackError::MissingField("type"))?;
        if found != T::CALLBACK_TYPE {
            return Err(CallbackError::WrongType {
                expected: T::CALLBACK_TYPE,
                found: found.to_string(),
            });
        }

        let output = raw
            .get("output")
            .and_then(JsonValue::as_array)
            .ok_or(CallbackError::MissingField("output"))?;
        let output_value = |key: &str| {
            output
                .iter()
                .find(|entry| entry.get("name").and_then(JsonValue::as_str) == Some(key))
                .and_then(|entry| entry.get("value"))
        };

        let name = output_value("name")
            .and_then(JsonValue::as_str)
            .ok_or(CallbackError::MissingField("name"))?
            .to_string();
        let prompt = output_value("prompt")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let required = output_value("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        let policies = output_value("policies").cloned().unwrap_or(json!({}));
        let failed_policies = output_value("failedPolicies")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();
        let validate_only = output_value("validateOnly")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);

        let value = match output_value("value") {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(T::from_json(v).ok_or_else(|| CallbackError::InvalidValue {
                field: "value".to_string(),
            })?),
        };

        let input_name = raw
            .get("input")
            .and_then(JsonValue::as_array)
            .and_then(|inputs| inputs.first())
            .and_then(|entry| entry.get("name"))
            .and_then(JsonValue::as_str)
            .ok_or(CallbackError::MissingField("input"))?
            .to_string();

        Ok(Self {
            name,
            prompt,
            required,
            policies,
            failed_policies,
            value,
            validate_only,
            input_name,
            raw,
        })
    }

    /// The current value, if one has been set or was pre-filled.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Sets the value to submit. Always succeeds for boolean and numeric
    /// attributes.
    pub fn set_value(&mut self, value: T) -> bool {
        self.value = Some(value);
        true
    }

    /// Asks the server to validate the value without committing it.
    pub fn set_validate_only(&mut self, validate_only: bool) {
        self.validate_only = validate_only;
    }

    pub fn validate_only(&self) -> bool {
        self.validate_only
    }

    /// Name of the input token the value is submitted under.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Serializes the callback for submission, with the current value and
    /// validate-only flag written into `input`.
    pub fn to_json(&self) -> JsonValue {
        let mut callback = self.raw.clone();
        let value = self.value.as_ref().map_or(JsonValue::Null, T::to_json);
        let validate_name = format!("{}validateOnly", self.input_name);

        callback.insert(
            "input".to_string(),
            json!([
                { "name": self.input_name, "value": value },
                { "name": validate_name, "value": self.validate_only },
            ]),
        );
        JsonValue::Object(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boolean_callback() -> JsonValue {
        json!({
            "type": "BooleanAttributeInputCallback",
            "output": [
                { "name": "name", "value": "preferences/updates" },
                { "name": "prompt", "value": "Send me news and updates" },
                { "name": "required", "value": false },
                { "name": "policies", "value": {} },
                { "name": "failedPolicies", "value": [] },
                { "name": "validateOnly", "value": false },
                { "name": "value", "value": false }
            ],
            "input": [
                { "name": "IDToken1", "value": false },
                { "name": "IDToken1validateOnly", "value": false }
            ],
            "_id": 3
        })
    }

    #[test]
    fn test_parse_boolean_callback() {
        let callback = BooleanAttributeInputCallback::from_json(&boolean_callback()).unwrap();
        assert_eq!(callback.name, "preferences/updates");
        assert_eq!(callback.prompt, "Send me news and updates");
        assert!(!callback.required);
        assert_eq!(callback.value(), Some(&false));
        assert_eq!(callback.input_name(), "IDToken1");
    }

    #[test]
    fn test_boolean_submission() {
        let mut callback = BooleanAttributeInputCallback::from_json(&boolean_callback()).unwrap();
        assert!(callback.set_value(true));
        callback.set_validate_only(true);

        let json = callback.to_json();
        assert_eq!(json["input"][0], json!({ "name": "IDToken1", "value": true }));
        assert_eq!(
            json["input"][1],
            json!({ "name": "IDToken1validateOnly", "value": true })
        );
        assert_eq!(json["_id"], json!(3));
    }

    #[test]
    fn test_number_callback() {
        let raw = json!({
            "type": "NumberAttributeInputCallback",
            "output": [
                { "name": "name", "value": "age" },
                { "name": "prompt", "value": "How old are you?" },
                { "name": "required", "value": true },
                { "name": "value", "value": null }
            ],
            "input": [
                { "name": "IDToken2", "value": null },
                { "name": "IDToken2validateOnly", "value": false }
            ]
        });

        let mut callback = NumberAttributeInputCallback::from_json(&raw).unwrap();
        assert!(callback.required);
        assert_eq!(callback.value(), None);

        callback.set_value(30.5);
        assert_eq!(callback.to_json()["input"][0]["value"], json!(30.5));
    }

    #[test]
    fn test_wrong_type() {
        let err = NumberAttributeInputCallback::from_json(&boolean_callback()).unwrap_err();
        assert_eq!(
            err,
            CallbackError::WrongType {
                expected: "NumberAttributeInputCallback",
                found: "BooleanAttributeInputCallback".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_value() {
        let mut raw = boolean_callback();
        raw["output"][6]["value"] = json!("yes");
        let err = BooleanAttributeInputCallback::from_json(&raw).unwrap_err();
        assert_eq!(
            err,
            CallbackError::InvalidValue {
                field: "value".to_string()
            }
        );
    }

    #[test]
    fn test_missing_input() {
        let mut raw = boolean_callback();
        raw.as_object_mut().unwrap().remove("input");
        assert_eq!(
            BooleanAttributeInputCallback::from_json(&raw).unwrap_err(),
            CallbackError::MissingField("input")
        );
    }
}
