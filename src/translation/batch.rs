/*!
 * Batch response parsing.
 *
 * A batch answer must be a JSON array of strings, optionally wrapped in a
 * Markdown code fence. Items are correlated to the request by position only,
 * so an answer with a different item count is rejected instead of truncated.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;

static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```\s*$").expect("valid code fence regex")
});

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE_REGEX.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Slice the outermost JSON array out of a model answer.
///
/// Models sometimes add a sentence before or after the array.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let body = strip_code_fence(text);
    let start = body.find('[')?;
    let end = body.rfind(']')?;
    (end > start).then(|| &body[start..=end])
}

/// Parse a batch translation answer and check it against the request length.
pub fn parse_batch_response(text: &str, expected: usize) -> Result<Vec<String>, TranslationError> {
    let array = extract_json_array(text).ok_or_else(|| {
        TranslationError::MalformedResponse(format!("expected a JSON array, got: {}", preview(text)))
    })?;

    let values: Vec<serde_json::Value> = serde_json::from_str(array)
        .map_err(|e| TranslationError::MalformedResponse(format!("invalid JSON array: {}", e)))?;

    if values.len() != expected {
        return Err(TranslationError::BatchLengthMismatch {
            expected,
            actual: values.len(),
        });
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            serde_json::Value::String(s) => Ok(s),
            other => Err(TranslationError::MalformedResponse(format!(
                "item {} is not a string: {}",
                index, other
            ))),
        })
        .collect()
}

/// Clean up a single-segment answer.
pub fn clean_single_response(text: &str) -> String {
    strip_code_fence(text).to_string()
}

/// First characters of a response, for error messages.
pub(crate) fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        format!("{}...", trimmed.chars().take(MAX_CHARS).collect::<String>())
    }
}
