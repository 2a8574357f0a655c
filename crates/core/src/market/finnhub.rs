use crate::config::Settings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Finnhub `/quote` payload. Unknown symbols come back as all-zero prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "c")]
    pub current: f64,
    #[serde(rename = "d", default)]
    pub change: Option<f64>,
    #[serde(rename = "dp", default)]
    pub percent_change: Option<f64>,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "pc")]
    pub previous_close: f64,
    #[serde(rename = "t", default)]
    pub timestamp: i64,
}

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn quote(&self, symbol: &str) -> Result<Quote>;
}

#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_finnhub_api_key()?.to_string();
        let base_url = settings
            .finnhub_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("FINNHUB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build finnhub http client")?;

        Ok(Self::new(http, base_url, api_key))
    }

    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl QuoteSource for FinnhubClient {
    fn provider_name(&self) -> &'static str {
        "finnhub"
    }

    async fn quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/quote", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .context("finnhub request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read finnhub response")?;
        if !status.is_success() {
            anyhow::bail!("finnhub HTTP {status}: {text}");
        }

        serde_json::from_str::<Quote>(&text)
            .with_context(|| format!("finnhub quote is not valid JSON: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_fake;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn quote(Query(q): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if q.get("token").map(String::as_str) != Some("fh-test") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API key"})));
        }
        assert_eq!(q.get("symbol").map(String::as_str), Some("AAPL"));
        (
            StatusCode::OK,
            Json(json!({
                "c": 190.5, "d": 1.5, "dp": 0.79, "h": 191.0,
                "l": 188.2, "o": 189.0, "pc": 189.0, "t": 1733011200
            })),
        )
    }

    #[tokio::test]
    async fn fetches_quote_with_token() {
        let base = spawn_fake(Router::new().route("/quote", get(quote))).await;
        let client = FinnhubClient::new(reqwest::Client::new(), base, "fh-test".to_string());
        let q = client.quote("AAPL").await.unwrap();
        assert_eq!(q.current, 190.5);
        assert_eq!(q.previous_close, 189.0);
    }

    #[tokio::test]
    async fn rejected_token_is_an_error() {
        let base = spawn_fake(Router::new().route("/quote", get(quote))).await;
        let client = FinnhubClient::new(reqwest::Client::new(), base, "nope".to_string());
        let err = client.quote("AAPL").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn unknown_symbol_shape_parses() {
        let q: Quote = serde_json::from_value(json!({
            "c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0
        }))
        .unwrap();
        assert_eq!(q.change, None);
    }
}
