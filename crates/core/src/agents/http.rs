use crate::agents::error::AgentsDiagnosticsError;
use crate::agents::{AgentsConfig, TradingAgentsClient};
use crate::config::{ApiKeys, Settings};
use crate::domain::analysis::{normalize_symbol, AnalysisResult};
use crate::domain::contract::PropagateResponse;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const PROPAGATE_PATH: &str = "/v1/propagate";
const HEALTH_PATH: &str = "/healthz";
// A full agent debate takes minutes.
const DEFAULT_TIMEOUT_SECS: u64 = 900;

/// Trading-agents framework served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTradingAgents {
    http: reqwest::Client,
    base_url: String,
    keys: ApiKeys,
    config: AgentsConfig,
}

impl HttpTradingAgents {
    pub fn from_settings(settings: &Settings, keys: ApiKeys, config: AgentsConfig) -> Result<Self> {
        let base_url = base_url_from_settings(settings);

        let timeout_secs = std::env::var("TRADING_AGENTS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build trading agents http client")?;

        Ok(Self::new(http, base_url, keys, config))
    }

    pub fn new(http: reqwest::Client, base_url: String, keys: ApiKeys, config: AgentsConfig) -> Self {
        Self {
            http,
            base_url,
            keys,
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-finnhub-api-key", HeaderValue::from_str(&self.keys.finnhub)?);
        headers.insert("x-openai-api-key", HeaderValue::from_str(&self.keys.openai)?);
        Ok(headers)
    }
}

pub fn base_url_from_settings(settings: &Settings) -> String {
    settings
        .trading_agents_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Liveness probe; needs no credentials, so the setup verifier can run it
/// before keys are configured.
pub async fn probe_health(http: &reqwest::Client, base_url: &str) -> Result<()> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH);
    let res = http
        .get(url)
        .send()
        .await
        .context("trading agents health request failed")?;
    let status = res.status();
    if !status.is_success() {
        anyhow::bail!("trading agents health check returned HTTP {status}");
    }
    Ok(())
}

#[async_trait::async_trait]
impl TradingAgentsClient for HttpTradingAgents {
    fn name(&self) -> &'static str {
        "trading_agents_http"
    }

    async fn propagate(&self, symbol: &str, analysis_date: NaiveDate) -> Result<AnalysisResult> {
        let symbol = normalize_symbol(symbol);
        anyhow::ensure!(!symbol.is_empty(), "symbol must be non-empty");

        let req = PropagateRequest {
            symbol: &symbol,
            analysis_date,
            config: &self.config,
        };

        tracing::info!(
            %symbol,
            %analysis_date,
            deep_think_llm = %self.config.deep_think_llm,
            quick_think_llm = %self.config.quick_think_llm,
            max_debate_rounds = self.config.max_debate_rounds,
            "running trading agents analysis"
        );

        let res = self
            .http
            .post(self.url(PROPAGATE_PATH))
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .context("trading agents request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read trading agents response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(AgentsDiagnosticsError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let parsed = match serde_json::from_str::<PropagateResponse>(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Err(AgentsDiagnosticsError {
                    stage: "decode",
                    detail: err.to_string(),
                    raw_output: Some(text),
                    raw_response_json: None,
                }
                .into())
            }
        };

        let result = parsed.validate_and_into_result(&symbol, analysis_date)?;
        tracing::info!(
            symbol = %result.symbol,
            %analysis_date,
            decision = %result.decision,
            sections = result.sections.present().count(),
            "trading agents analysis completed"
        );
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct PropagateRequest<'a> {
    symbol: &'a str,
    analysis_date: NaiveDate,
    config: &'a AgentsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::SectionId;
    use crate::test_support::spawn_fake;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn keys() -> ApiKeys {
        ApiKeys {
            finnhub: "fh-test".to_string(),
            openai: "sk-test".to_string(),
        }
    }

    fn client(base_url: String) -> HttpTradingAgents {
        HttpTradingAgents::new(
            reqwest::Client::new(),
            base_url,
            keys(),
            AgentsConfig::default(),
        )
    }

    async fn propagate(headers: AxumHeaders, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        if header("x-finnhub-api-key").as_deref() != Some("fh-test")
            || header("x-openai-api-key").as_deref() != Some("sk-test")
        {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "missing keys"})));
        }

        match body["symbol"].as_str() {
            Some("NVDA") => {
                assert_eq!(body["analysis_date"], "2025-07-05");
                assert_eq!(body["config"]["max_debate_rounds"], 1);
                (
                    StatusCode::OK,
                    Json(json!({
                        "symbol": "NVDA",
                        "analysis_date": "2025-07-05",
                        "decision": "BUY",
                        "final_state": {
                            "market_report": "Strong uptrend",
                            "risk_debate_state": {"judge_decision": "Moderate risk"}
                        }
                    })),
                )
            }
            Some("BAD") => (StatusCode::OK, Json(json!({"unexpected": true}))),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "graph crashed"})),
            ),
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/v1/propagate", post(propagate))
            .route("/healthz", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn propagate_returns_validated_result() {
        let base = spawn_fake(app()).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let result = client(base).propagate("nvda", date).await.unwrap();
        assert_eq!(result.symbol, "NVDA");
        assert_eq!(result.decision, "BUY");
        assert_eq!(result.sections.get(SectionId::Market), Some("Strong uptrend"));
        assert_eq!(
            result.sections.get(SectionId::RiskAssessment),
            Some("Moderate risk")
        );
        assert_eq!(result.sections.get(SectionId::Sentiment), None);
    }

    #[tokio::test]
    async fn server_failure_is_reported_with_diagnostics() {
        let base = spawn_fake(app()).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let err = client(base).propagate("TSLA", date).await.unwrap_err();
        let diag = err.downcast_ref::<AgentsDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert!(diag.raw_output.as_deref().unwrap().contains("graph crashed"));
        assert_eq!(diag.upstream_message().as_deref(), Some("graph crashed"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let base = spawn_fake(app()).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let err = client(base).propagate("BAD", date).await.unwrap_err();
        let diag = err.downcast_ref::<AgentsDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "decode");
    }

    #[tokio::test]
    async fn health_probe_hits_healthz() {
        let base = spawn_fake(app()).await;
        probe_health(&reqwest::Client::new(), &format!("{base}/")).await.unwrap();
    }
}
