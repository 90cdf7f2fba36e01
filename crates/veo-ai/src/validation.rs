//! Validation of the generated Veo prompt.

use serde_json::Value;
use thiserror::Error;

use veo_models::VeoPrompt;

/// The generated text could not be turned into a [`VeoPrompt`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PromptValidationError {
    pub message: String,
    /// Untouched model output.
    pub raw: String,
}

/// Remove one enclosing Markdown code fence, with or without a language tag.
///
/// Input that does not start with a fence is returned trimmed but otherwise
/// unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let body = rest[tag_len..].trim_start();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim_end()
}

/// Parse and shape-check raw generation output.
pub fn parse_veo_prompt(raw: &str) -> Result<VeoPrompt, PromptValidationError> {
    let fail = |message: String| PromptValidationError {
        message,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| fail(format!("JSON parsing failed: {}", e)))?;

    VeoPrompt::from_value(value).map_err(|e| fail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veo_models::REQUIRED_FIELDS;

    fn full_prompt() -> Value {
        let mut map = serde_json::Map::new();
        for field in REQUIRED_FIELDS {
            map.insert(field.to_string(), json!({}));
        }
        map.insert("version".to_string(), json!("t2v-universal-1.0"));
        Value::Object(map)
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fence("  ```\n{\"a\":1}```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_unfenced_text_unchanged() {
        assert_eq!(strip_code_fence(" {\"a\":\"```\"} "), "{\"a\":\"```\"}");
    }

    #[test]
    fn test_fenced_prompt_parses() {
        let raw = format!("```json\n{}\n```", serde_json::to_string_pretty(&full_prompt()).unwrap());
        let prompt = parse_veo_prompt(&raw).unwrap();
        assert_eq!(prompt.into_value(), full_prompt());
    }

    #[test]
    fn test_roundtrip() {
        let raw = serde_json::to_string(&full_prompt()).unwrap();
        let prompt = parse_veo_prompt(&raw).unwrap();
        assert_eq!(prompt.into_value(), full_prompt());
    }

    #[test]
    fn test_missing_field_named_and_raw_kept() {
        let mut value = full_prompt();
        value.as_object_mut().unwrap().remove("audio");
        let raw = value.to_string();

        let err = parse_veo_prompt(&raw).unwrap_err();
        assert_eq!(err.message, "Missing required fields: audio");
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_parse_error_reported() {
        let err = parse_veo_prompt("Sure! Here is your prompt: {").unwrap_err();
        assert!(err.message.starts_with("JSON parsing failed: "));
        assert_eq!(err.raw, "Sure! Here is your prompt: {");
    }

    #[test]
    fn test_non_object_rejected() {
        let err = parse_veo_prompt("[1, 2]").unwrap_err();
        assert_eq!(err.message, "Parsed content is not a valid object");
    }
}
