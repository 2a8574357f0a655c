use crate::domain::analysis::{normalize_symbol, AnalysisResult, ReportSections, SectionId};
use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Body of a `propagate` answer from the trading-agents service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagateResponse {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub analysis_date: Option<NaiveDate>,
    pub decision: String,
    #[serde(default)]
    pub final_state: FinalState,
}

/// The agent graph's final state. Only the keys the report renders are modelled;
/// everything else the framework emits is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalState {
    #[serde(default)]
    pub market_report: Option<String>,
    #[serde(default)]
    pub sentiment_report: Option<String>,
    #[serde(default)]
    pub news_report: Option<String>,
    #[serde(default)]
    pub fundamentals_report: Option<String>,
    #[serde(default, deserialize_with = "lenient_debate")]
    pub investment_debate_state: Option<DebateState>,
    #[serde(default)]
    pub trader_investment_plan: Option<String>,
    #[serde(default, deserialize_with = "lenient_debate")]
    pub risk_debate_state: Option<DebateState>,
    #[serde(default)]
    pub final_trade_decision: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateState {
    #[serde(default)]
    pub judge_decision: Option<String>,
}

/// A debate state that is not an object (or has a non-text verdict) only
/// drops its own section.
fn lenient_debate<'de, D>(deserializer: D) -> Result<Option<DebateState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl PropagateResponse {
    pub fn validate_and_into_result(
        self,
        expected_symbol: &str,
        expected_date: NaiveDate,
    ) -> anyhow::Result<AnalysisResult> {
        let expected_symbol = normalize_symbol(expected_symbol);
        ensure!(!expected_symbol.is_empty(), "symbol must be non-empty");

        if let Some(symbol) = self.symbol.as_deref() {
            let symbol = normalize_symbol(symbol);
            ensure!(
                symbol == expected_symbol,
                "trading agents symbol mismatch: expected {expected_symbol}, got {symbol}"
            );
        }

        if let Some(date) = self.analysis_date {
            ensure!(
                date == expected_date,
                "trading agents analysis_date mismatch: expected {expected_date}, got {date}"
            );
        }

        let decision = self.decision.trim().to_string();
        ensure!(!decision.is_empty(), "decision must be non-empty");

        Ok(AnalysisResult {
            symbol: expected_symbol,
            analysis_date: expected_date,
            decision,
            sections: self.final_state.into_sections(),
        })
    }
}

impl FinalState {
    pub fn into_sections(self) -> ReportSections {
        let judge = |state: Option<DebateState>| state.and_then(|s| s.judge_decision);

        let mut sections = ReportSections::default();
        sections.set(SectionId::Market, self.market_report);
        sections.set(SectionId::Sentiment, self.sentiment_report);
        sections.set(SectionId::News, self.news_report);
        sections.set(SectionId::Fundamentals, self.fundamentals_report);
        sections.set(
            SectionId::InvestmentDebate,
            judge(self.investment_debate_state),
        );
        sections.set(SectionId::TraderPlan, self.trader_investment_plan);
        sections.set(SectionId::RiskAssessment, judge(self.risk_debate_state));
        sections.set(SectionId::FinalTradeDetail, self.final_trade_decision);
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 5).unwrap()
    }

    #[test]
    fn maps_final_state_keys_onto_sections() {
        let v = json!({
            "symbol": "nvda",
            "analysis_date": "2025-07-05",
            "decision": "  BUY  ",
            "final_state": {
                "market_report": "Strong uptrend",
                "sentiment_report": null,
                "news_report": "",
                "investment_debate_state": {
                    "judge_decision": "Bulls win",
                    "bull_history": "ignored",
                    "count": 2
                },
                "risk_debate_state": {"history": "no verdict"},
                "final_trade_decision": "Buy 100 shares",
                "company_of_interest": "NVDA"
            }
        });

        let parsed: PropagateResponse = serde_json::from_value(v).unwrap();
        let result = parsed.validate_and_into_result("NVDA", date()).unwrap();
        assert_eq!(result.symbol, "NVDA");
        assert_eq!(result.decision, "BUY");
        assert_eq!(result.sections.get(SectionId::Market), Some("Strong uptrend"));
        assert_eq!(result.sections.get(SectionId::Sentiment), None);
        assert_eq!(result.sections.get(SectionId::News), None);
        assert_eq!(
            result.sections.get(SectionId::InvestmentDebate),
            Some("Bulls win")
        );
        assert_eq!(result.sections.get(SectionId::RiskAssessment), None);
        assert_eq!(
            result.sections.get(SectionId::FinalTradeDetail),
            Some("Buy 100 shares")
        );
    }

    #[test]
    fn malformed_debate_state_only_drops_its_section() {
        let parsed: PropagateResponse = serde_json::from_value(json!({
            "decision": "HOLD",
            "final_state": {
                "market_report": "Range bound",
                "investment_debate_state": "bulls and bears tied",
                "risk_debate_state": {"judge_decision": 3}
            }
        }))
        .unwrap();
        let result = parsed.validate_and_into_result("AAPL", date()).unwrap();
        assert_eq!(result.sections.get(SectionId::Market), Some("Range bound"));
        assert_eq!(result.sections.get(SectionId::InvestmentDebate), None);
        assert_eq!(result.sections.get(SectionId::RiskAssessment), None);
    }

    #[test]
    fn accepts_missing_final_state() {
        let parsed: PropagateResponse =
            serde_json::from_value(json!({"decision": "HOLD"})).unwrap();
        let result = parsed.validate_and_into_result("aapl", date()).unwrap();
        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.sections, ReportSections::default());
    }

    #[test]
    fn rejects_blank_decision() {
        let parsed: PropagateResponse =
            serde_json::from_value(json!({"decision": " \n"})).unwrap();
        assert!(parsed.validate_and_into_result("AAPL", date()).is_err());
    }

    #[test]
    fn rejects_echoed_date_mismatch() {
        let parsed: PropagateResponse = serde_json::from_value(json!({
            "analysis_date": "2025-07-04",
            "decision": "SELL"
        }))
        .unwrap();
        assert!(parsed.validate_and_into_result("AAPL", date()).is_err());
    }

    #[test]
    fn rejects_echoed_symbol_mismatch() {
        let parsed: PropagateResponse = serde_json::from_value(json!({
            "symbol": "TSLA",
            "decision": "SELL"
        }))
        .unwrap();
        assert!(parsed.validate_and_into_result("AAPL", date()).is_err());
    }
}
