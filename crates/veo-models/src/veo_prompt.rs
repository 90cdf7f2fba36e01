//! Veo video generation prompt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level keys every Veo prompt must carry.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "version",
    "engine_hint",
    "meta",
    "globals",
    "subject",
    "scene",
    "action",
    "audio",
    "timeline",
    "technical",
];

/// Shape errors for a candidate Veo prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VeoPromptError {
    #[error("Parsed content is not a valid object")]
    NotAnObject,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

/// A validated Veo prompt object.
///
/// The shape is checked, not the types: all [`REQUIRED_FIELDS`] are present
/// at the top level and their values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct VeoPrompt(Map<String, Value>);

impl VeoPrompt {
    /// Validate a parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, VeoPromptError> {
        let Value::Object(map) = value else {
            return Err(VeoPromptError::NotAnObject);
        };

        let missing = missing_fields(&map);
        if !missing.is_empty() {
            return Err(VeoPromptError::MissingFields(missing));
        }

        Ok(Self(map))
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for VeoPrompt {
    type Error = VeoPromptError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<VeoPrompt> for Value {
    fn from(prompt: VeoPrompt) -> Self {
        prompt.into_value()
    }
}

/// Required fields absent from `map`, in [`REQUIRED_FIELDS`] order.
pub fn missing_fields(map: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !map.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}
