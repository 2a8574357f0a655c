use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

const MAX_UPSTREAM_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// What the provider itself said went wrong, if anything.
    pub fn upstream_message(&self) -> Option<String> {
        upstream_message(self.raw_response_json.as_ref(), self.raw_output.as_deref())
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} request failed at {}: {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

/// Picks the error text out of an upstream error body. JSON bodies are
/// searched for `detail`, `error` and `message` (a nested `{"message": ..}`
/// object counts); anything else falls back to the raw text, truncated.
pub fn upstream_message(json: Option<&Value>, raw: Option<&str>) -> Option<String> {
    let from_json = json.and_then(|v| {
        ["detail", "error", "message"].iter().find_map(|key| match &v[*key] {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(o) => o
                .get("message")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
    });

    from_json.or_else(|| {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        let mut out: String = raw.chars().take(MAX_UPSTREAM_CHARS).collect();
        if raw.chars().count() > MAX_UPSTREAM_CHARS {
            out.push_str("...");
        }
        Some(out)
    })
}
