use crate::llm::error::upstream_message;
use serde_json::Value;
use std::fmt;

/// Failure talking to the trading-agents service. `stage` is `http` for a
/// non-2xx answer and `decode` for a body that does not match the contract.
#[derive(Debug, Clone)]
pub struct AgentsDiagnosticsError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl AgentsDiagnosticsError {
    pub fn upstream_message(&self) -> Option<String> {
        upstream_message(self.raw_response_json.as_ref(), self.raw_output.as_deref())
    }
}

impl fmt::Display for AgentsDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trading agents error (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for AgentsDiagnosticsError {}
