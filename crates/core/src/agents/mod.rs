pub mod error;
pub mod http;

use crate::domain::analysis::AnalysisResult;
use crate::llm::Provider;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Options forwarded to the trading-agents graph on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub llm_provider: Provider,
    /// Model for the slow, deliberate steps (research manager, risk judge).
    pub deep_think_llm: String,
    /// Model for the analysts and debaters.
    pub quick_think_llm: String,
    pub max_debate_rounds: u32,
    /// Fetch live market data instead of the framework's cached datasets.
    pub online_tools: bool,
    pub debug: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            llm_provider: Provider::OpenAI,
            deep_think_llm: "gpt-4o-mini".to_string(),
            quick_think_llm: "gpt-4o-mini".to_string(),
            max_debate_rounds: 1,
            online_tools: true,
            debug: true,
        }
    }
}

impl AgentsConfig {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("TRADING_AGENTS_LLM_PROVIDER") {
            if let Ok(p) = s.parse::<Provider>() {
                out.llm_provider = p;
            }
        }

        if let Ok(s) = std::env::var("TRADING_AGENTS_DEEP_THINK_LLM") {
            if !s.trim().is_empty() {
                out.deep_think_llm = s.trim().to_string();
            }
        }

        if let Ok(s) = std::env::var("TRADING_AGENTS_QUICK_THINK_LLM") {
            if !s.trim().is_empty() {
                out.quick_think_llm = s.trim().to_string();
            }
        }

        if let Ok(s) = std::env::var("TRADING_AGENTS_MAX_DEBATE_ROUNDS") {
            if let Ok(n) = s.parse::<u32>() {
                out.max_debate_rounds = n;
            }
        }

        if let Ok(s) = std::env::var("TRADING_AGENTS_ONLINE_TOOLS") {
            if let Ok(b) = s.parse::<bool>() {
                out.online_tools = b;
            }
        }

        out
    }
}

/// The external multi-agent analysis framework, treated as a black box.
#[async_trait::async_trait]
pub trait TradingAgentsClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn propagate(&self, symbol: &str, analysis_date: NaiveDate)
        -> anyhow::Result<AnalysisResult>;
}
