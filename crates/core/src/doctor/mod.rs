//! Setup verification: independent environment checks, each reported as
//! pass/fail, with a summary at the end. A failing check never stops the
//! ones after it.

use crate::agents::http::{base_url_from_settings, probe_health};
use crate::config::{Settings, FINNHUB_API_KEY_VAR, OPENAI_API_KEY_VAR};
use crate::domain::analysis::{AnalysisResult, SectionId};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::openai::OpenAiClient;
use crate::llm::LlmClient;
use crate::market::finnhub::{FinnhubClient, QuoteSource};
use crate::report::ReportAssembler;
use anyhow::Context;
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const PROBE_SYMBOL: &str = "AAPL";
const PROBE_PROMPT: &str = "Hello";
const PROBE_MAX_TOKENS: u32 = 10;
const HEALTH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    ApiKeys,
    AnalysisService,
    ApiConnectivity,
    PdfGeneration,
}

impl Check {
    pub const ALL: [Check; 4] = [
        Check::ApiKeys,
        Check::AnalysisService,
        Check::ApiConnectivity,
        Check::PdfGeneration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::ApiKeys => "API Keys",
            Check::AnalysisService => "Analysis Service",
            Check::ApiConnectivity => "API Connectivity",
            Check::PdfGeneration => "PDF Generation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Ok,
    Failed,
    Warning,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub kind: NoteKind,
    pub text: String,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            NoteKind::Ok => "✓",
            NoteKind::Failed => "✗",
            NoteKind::Warning => "⚠",
            NoteKind::Hint => " ",
        };
        write!(f, "{marker} {}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: Check,
    pub passed: bool,
    pub notes: Vec<Note>,
}

#[derive(Debug, Default)]
struct Notes {
    notes: Vec<Note>,
    failed: bool,
}

impl Notes {
    fn ok(&mut self, text: impl Into<String>) {
        self.push(NoteKind::Ok, text);
    }

    fn fail(&mut self, text: impl Into<String>) {
        self.failed = true;
        self.push(NoteKind::Failed, text);
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.push(NoteKind::Warning, text);
    }

    fn hint(&mut self, text: impl Into<String>) {
        self.push(NoteKind::Hint, text);
    }

    fn push(&mut self, kind: NoteKind, text: impl Into<String>) {
        self.notes.push(Note {
            kind,
            text: text.into(),
        });
    }

    fn into_outcome(self, check: Check) -> CheckOutcome {
        CheckOutcome {
            check,
            passed: !self.failed,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub outcomes: Vec<CheckOutcome>,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// One `name: PASS|FAIL` line per check, in run order.
    pub fn table(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| format!("{}: {}", o.check.name(), if o.passed { "PASS" } else { "FAIL" }))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct Doctor {
    settings: Settings,
    http: reqwest::Client,
    agents_base_url: String,
    market: Option<Box<dyn QuoteSource>>,
    llm: Option<Box<dyn LlmClient>>,
    scratch_dir: PathBuf,
}

impl Doctor {
    /// Clients are only built for providers whose key is configured; the
    /// connectivity check skips the others.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let market: Option<Box<dyn QuoteSource>> = match FinnhubClient::from_settings(&settings) {
            Ok(client) => Some(Box::new(client)),
            Err(_) => None,
        };
        let llm: Option<Box<dyn LlmClient>> = match OpenAiClient::from_settings(&settings) {
            Ok(client) => Some(Box::new(client)),
            Err(_) => None,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .build()
            .context("failed to build health-check http client")?;

        Ok(Self {
            agents_base_url: base_url_from_settings(&settings),
            settings,
            http,
            market,
            llm,
            scratch_dir: std::env::temp_dir(),
        })
    }

    pub fn with_market(mut self, market: Option<Box<dyn QuoteSource>>) -> Self {
        self.market = market;
        self
    }

    pub fn with_llm(mut self, llm: Option<Box<dyn LlmClient>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Runs every check in order; `on_outcome` sees each result as soon as it
    /// is known.
    pub async fn run(&self, mut on_outcome: impl FnMut(&CheckOutcome)) -> Summary {
        let mut summary = Summary::default();
        for check in Check::ALL {
            tracing::debug!(check = check.name(), "running setup check");
            let outcome = match self.run_check(check).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(check = check.name(), error = %err, "setup check raised");
                    let mut notes = Notes::default();
                    notes.fail(format!("{} failed with exception: {err:#}", check.name()));
                    notes.into_outcome(check)
                }
            };
            on_outcome(&outcome);
            summary.outcomes.push(outcome);
        }
        summary
    }

    async fn run_check(&self, check: Check) -> anyhow::Result<CheckOutcome> {
        let notes = match check {
            Check::ApiKeys => self.check_api_keys(),
            Check::AnalysisService => self.check_analysis_service().await,
            Check::ApiConnectivity => self.check_api_connectivity().await,
            Check::PdfGeneration => self.check_pdf_generation()?,
        };
        Ok(notes.into_outcome(check))
    }

    fn check_api_keys(&self) -> Notes {
        let mut notes = Notes::default();
        let keys = [
            (FINNHUB_API_KEY_VAR, self.settings.require_finnhub_api_key().err()),
            (OPENAI_API_KEY_VAR, self.settings.require_openai_api_key().err()),
        ];
        for (var, err) in keys {
            match err {
                None => notes.ok(format!("{var} configured")),
                Some(err) => {
                    notes.fail(format!("{var} not configured"));
                    notes.hint(format!("Set with: export {var}=your_actual_key"));
                    notes.hint(err.hint);
                }
            }
        }
        notes
    }

    async fn check_analysis_service(&self) -> Notes {
        let mut notes = Notes::default();
        match probe_health(&self.http, &self.agents_base_url).await {
            Ok(()) => notes.ok(format!(
                "TradingAgents service reachable at {}",
                self.agents_base_url
            )),
            Err(err) => {
                notes.fail(format!("TradingAgents service unreachable: {err:#}"));
                notes.hint("Start the TradingAgents service or set TRADING_AGENTS_BASE_URL");
            }
        }
        notes
    }

    async fn check_api_connectivity(&self) -> Notes {
        let mut notes = Notes::default();

        match &self.market {
            Some(market) => {
                tracing::debug!(provider = market.provider_name(), symbol = PROBE_SYMBOL, "probing quote");
                if let Err(err) = market.quote(PROBE_SYMBOL).await {
                    notes.fail(format!("FinnHub API test failed: {err:#}"));
                    return notes;
                }
                notes.ok("FinnHub API connection successful");
            }
            None => notes.warn("Skipping FinnHub test - API key not configured"),
        }

        match &self.llm {
            Some(llm) => match llm.complete(PROBE_PROMPT, PROBE_MAX_TOKENS).await {
                Ok(_) => notes.ok(format!("{} API connection successful", provider_label(llm.as_ref()))),
                Err(err) => {
                    notes.fail(format!(
                        "{} API test failed: {err:#}",
                        provider_label(llm.as_ref())
                    ));
                    if let Some(msg) = err
                        .downcast_ref::<LlmDiagnosticsError>()
                        .and_then(LlmDiagnosticsError::upstream_message)
                    {
                        notes.hint(format!("Provider response: {msg}"));
                    }
                }
            },
            None => notes.warn("Skipping OpenAI test - API key not configured"),
        }

        notes
    }

    fn check_pdf_generation(&self) -> anyhow::Result<Notes> {
        let mut notes = Notes::default();
        let path = self
            .scratch_dir
            .join(format!("test_report-{}.pdf", uuid::Uuid::new_v4()));

        let date = NaiveDate::from_ymd_opt(2024, 12, 1).context("invalid probe date")?;
        let sample = AnalysisResult::new(PROBE_SYMBOL, date, "HOLD").with_section(
            SectionId::Market,
            "This is a test to verify PDF generation works.",
        );

        ReportAssembler::default().write(&sample, Some(&path), crate::time::local_now())?;

        let header = std::fs::read(&path)
            .with_context(|| format!("failed to read back {}", path.display()))?;
        let _ = std::fs::remove_file(&path);

        if header.starts_with(b"%PDF") {
            notes.ok("PDF generation test successful");
        } else {
            notes.fail("PDF file was not created");
        }
        Ok(notes)
    }
}

fn provider_label(llm: &dyn LlmClient) -> &'static str {
    match llm.provider() {
        crate::llm::Provider::OpenAI => "OpenAI",
        crate::llm::Provider::Anthropic => "Anthropic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::market::finnhub::Quote;
    use crate::test_support::spawn_fake;
    use axum::routing::get;
    use axum::Router;

    struct FakeQuotes {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl QuoteSource for FakeQuotes {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn quote(&self, _symbol: &str) -> anyhow::Result<Quote> {
            if self.fail {
                anyhow::bail!("finnhub HTTP 401 Unauthorized");
            }
            Ok(Quote {
                current: 190.0,
                change: None,
                percent_change: None,
                high: 191.0,
                low: 189.0,
                open: 189.5,
                previous_close: 189.0,
                timestamp: 0,
            })
        }
    }

    struct FakeLlm;

    #[async_trait::async_trait]
    impl LlmClient for FakeLlm {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
            Ok("Hi".to_string())
        }
    }

    struct RejectingLlm;

    #[async_trait::async_trait]
    impl LlmClient for RejectingLlm {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
            Err(LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "http",
                detail: "status=429 Too Many Requests".to_string(),
                raw_output: None,
                raw_response_json: Some(serde_json::json!({
                    "error": {"message": "You exceeded your current quota"}
                })),
            }
            .into())
        }
    }

    fn settings(base_url: Option<String>, keys: bool) -> Settings {
        Settings {
            finnhub_api_key: keys.then(|| "fh-real".to_string()),
            openai_api_key: keys.then(|| "sk-real".to_string()),
            sentry_dsn: None,
            trading_agents_base_url: base_url,
            finnhub_base_url: None,
            openai_base_url: None,
        }
    }

    async fn healthy_service() -> String {
        spawn_fake(Router::new().route("/healthz", get(|| async { "ok" }))).await
    }

    #[tokio::test]
    async fn all_checks_pass_with_healthy_fakes() {
        let base = healthy_service().await;
        let doctor = Doctor::from_settings(settings(Some(base), true))
            .unwrap()
            .with_market(Some(Box::new(FakeQuotes { fail: false })))
            .with_llm(Some(Box::new(FakeLlm)));

        let mut seen = Vec::new();
        let summary = doctor.run(|o| seen.push(o.check)).await;

        assert_eq!(seen, Check::ALL.to_vec());
        assert!(summary.all_passed(), "{:#?}", summary.outcomes);
        assert_eq!(
            summary.table(),
            "API Keys: PASS\nAnalysis Service: PASS\nAPI Connectivity: PASS\nPDF Generation: PASS"
        );
    }

    #[tokio::test]
    async fn missing_keys_fail_but_later_checks_still_run() {
        let base = healthy_service().await;
        let doctor = Doctor::from_settings(settings(Some(base), false)).unwrap();
        let summary = doctor.run(|_| {}).await;

        let passed: Vec<_> = summary.outcomes.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![false, true, true, true]);
        assert!(!summary.all_passed());

        let connectivity = &summary.outcomes[2];
        assert!(connectivity
            .notes
            .iter()
            .all(|n| n.kind == NoteKind::Warning));
    }

    #[tokio::test]
    async fn rejected_market_key_fails_connectivity() {
        let base = healthy_service().await;
        let doctor = Doctor::from_settings(settings(Some(base), true))
            .unwrap()
            .with_market(Some(Box::new(FakeQuotes { fail: true })))
            .with_llm(Some(Box::new(FakeLlm)));
        let summary = doctor.run(|_| {}).await;

        let connectivity = &summary.outcomes[2];
        assert_eq!(connectivity.check, Check::ApiConnectivity);
        assert!(!connectivity.passed);
        assert!(connectivity.notes[0].text.contains("401"));
        assert_eq!(connectivity.notes.len(), 1);
    }

    #[tokio::test]
    async fn llm_failure_surfaces_the_provider_message() {
        let base = healthy_service().await;
        let doctor = Doctor::from_settings(settings(Some(base), true))
            .unwrap()
            .with_market(Some(Box::new(FakeQuotes { fail: false })))
            .with_llm(Some(Box::new(RejectingLlm)));
        let summary = doctor.run(|_| {}).await;

        let connectivity = &summary.outcomes[2];
        assert!(!connectivity.passed);
        let last = connectivity.notes.last().unwrap();
        assert_eq!(last.kind, NoteKind::Hint);
        assert_eq!(last.text, "Provider response: You exceeded your current quota");
    }

    #[tokio::test]
    async fn unreachable_service_fails_its_check_only() {
        // Bind then drop a listener to get a port nobody is serving.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let doctor = Doctor::from_settings(settings(Some(format!("http://{addr}")), true))
            .unwrap()
            .with_market(Some(Box::new(FakeQuotes { fail: false })))
            .with_llm(Some(Box::new(FakeLlm)));
        let summary = doctor.run(|_| {}).await;

        let passed: Vec<_> = summary.outcomes.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![true, false, true, true]);
    }

    #[tokio::test]
    async fn pdf_check_failure_is_captured() {
        let base = healthy_service().await;
        let missing = std::env::temp_dir().join(format!("no-such-dir-{}", uuid::Uuid::new_v4()));
        let doctor = Doctor::from_settings(settings(Some(base), true))
            .unwrap()
            .with_market(Some(Box::new(FakeQuotes { fail: false })))
            .with_llm(Some(Box::new(FakeLlm)))
            .with_scratch_dir(missing);
        let summary = doctor.run(|_| {}).await;

        let pdf = summary.outcomes.last().unwrap();
        assert_eq!(pdf.check, Check::PdfGeneration);
        assert!(!pdf.passed);
        assert!(pdf.notes[0].text.starts_with("PDF Generation failed with exception"));
    }

    #[test]
    fn notes_render_with_markers() {
        let note = Note {
            kind: NoteKind::Warning,
            text: "Skipping".to_string(),
        };
        assert_eq!(note.to_string(), "⚠ Skipping");
    }
}
