//! Vision analysis result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-text description of a video's content.
///
/// Never empty: [`AnalysisResult::new`] trims the text and rejects blank
/// input, so an empty model response cannot be mistaken for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(String);

impl AnalysisResult {
    /// Wrap model output, returning `None` if it is blank.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
