pub mod error;
pub mod openai;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => f.write_str("openai"),
            Provider::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("unknown LLM provider: {other}"),
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Single-turn completion; used for connectivity checks.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!(" anthropic ".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!(Provider::OpenAI.to_string(), "openai");
        assert!("gemini".parse::<Provider>().is_err());
    }
}
