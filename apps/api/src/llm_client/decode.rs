//! Decode-with-fallback: the one place where model text becomes typed data.
//!
//! Every structured call site passes its own fallback. Any failure (transport,
//! API status, empty content, unparseable text) is logged and replaced by that
//! fallback; errors never escape.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::llm_client::{LlmError, TextGenerator};

/// Removes every ```` ``` ```` / ```` ```json ```` marker (and the newline after it), then trims.
pub fn strip_json_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        rest = rest.strip_prefix("json").unwrap_or(rest);
        rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// The span from the first `{`/`[` to the last matching closer, if any.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parses model output as JSON, tolerating code fences and surrounding prose.
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let cleaned = strip_json_fences(text);
    match serde_json::from_str(&cleaned) {
        Ok(value) => Ok(value),
        Err(first) => match embedded_json(&cleaned) {
            Some(span) if span.len() < cleaned.len() => {
                serde_json::from_str(span).map_err(LlmError::Parse)
            }
            _ => Err(LlmError::Parse(first)),
        },
    }
}

/// Generates and decodes structured output, returning `fallback()` on any failure.
pub async fn generate_json_or<T, F>(
    llm: &dyn TextGenerator,
    prompt: &str,
    system: &str,
    label: &str,
    fallback: F,
) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let decoded = match llm.generate(prompt, system).await {
        Ok(text) => decode_json::<T>(&text),
        Err(e) => Err(e),
    };
    match decoded {
        Ok(value) => value,
        Err(e) => {
            warn!("{label}: generation failed, using fallback: {e}");
            fallback()
        }
    }
}

/// Generates free text, trimmed. `None` on failure or blank output.
pub async fn generate_text_or_none(
    llm: &dyn TextGenerator,
    prompt: &str,
    system: &str,
    label: &str,
) -> Option<String> {
    match llm.generate(prompt, system).await {
        Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Err(e) => {
            warn!("{label}: generation failed, continuing without it: {e}");
            None
        }
    }
}
