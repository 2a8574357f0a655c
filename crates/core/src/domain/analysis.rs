use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One symbol/date run of the trading-agents framework, as the report sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub analysis_date: NaiveDate,
    pub decision: String,
    pub sections: ReportSections,
}

impl AnalysisResult {
    pub fn new(symbol: &str, analysis_date: NaiveDate, decision: impl Into<String>) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            analysis_date,
            decision: decision.into(),
            sections: ReportSections::default(),
        }
    }

    pub fn with_section(mut self, id: SectionId, body: impl Into<String>) -> Self {
        self.sections.set(id, Some(body.into()));
        self
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Market,
    Sentiment,
    News,
    Fundamentals,
    InvestmentDebate,
    TraderPlan,
    RiskAssessment,
    FinalTradeDetail,
}

impl SectionId {
    /// Render order.
    pub const ALL: [SectionId; 8] = [
        SectionId::Market,
        SectionId::Sentiment,
        SectionId::News,
        SectionId::Fundamentals,
        SectionId::InvestmentDebate,
        SectionId::TraderPlan,
        SectionId::RiskAssessment,
        SectionId::FinalTradeDetail,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            SectionId::Market => "Market Analysis Report",
            SectionId::Sentiment => "Sentiment Analysis Report",
            SectionId::News => "News Analysis Report",
            SectionId::Fundamentals => "Fundamentals Analysis Report",
            SectionId::InvestmentDebate => "Investment Debate Summary",
            SectionId::TraderPlan => "Trader Investment Plan",
            SectionId::RiskAssessment => "Risk Assessment",
            SectionId::FinalTradeDetail => "Detailed Final Trade Decision",
        }
    }

    /// Debate sections carry the judge's verdict under a subsection heading.
    pub fn subheading(self) -> Option<&'static str> {
        match self {
            SectionId::InvestmentDebate => Some("Judge Decision:"),
            SectionId::RiskAssessment => Some("Risk Management Decision:"),
            _ => None,
        }
    }

    /// Detailed sections start on a fresh page.
    pub fn is_detail(self) -> bool {
        matches!(
            self,
            SectionId::InvestmentDebate
                | SectionId::TraderPlan
                | SectionId::RiskAssessment
                | SectionId::FinalTradeDetail
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSections {
    pub market: Option<String>,
    pub sentiment: Option<String>,
    pub news: Option<String>,
    pub fundamentals: Option<String>,
    pub investment_debate: Option<String>,
    pub trader_plan: Option<String>,
    pub risk_assessment: Option<String>,
    pub final_trade_detail: Option<String>,
}

impl ReportSections {
    /// Returns the body only when it has visible text.
    pub fn get(&self, id: SectionId) -> Option<&str> {
        self.slot(id)
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, id: SectionId, body: Option<String>) {
        *self.slot_mut(id) = body.filter(|s| !s.trim().is_empty());
    }

    pub fn present(&self) -> impl Iterator<Item = (SectionId, &str)> + '_ {
        SectionId::ALL
            .into_iter()
            .filter_map(move |id| self.get(id).map(|body| (id, body)))
    }

    fn slot(&self, id: SectionId) -> &Option<String> {
        match id {
            SectionId::Market => &self.market,
            SectionId::Sentiment => &self.sentiment,
            SectionId::News => &self.news,
            SectionId::Fundamentals => &self.fundamentals,
            SectionId::InvestmentDebate => &self.investment_debate,
            SectionId::TraderPlan => &self.trader_plan,
            SectionId::RiskAssessment => &self.risk_assessment,
            SectionId::FinalTradeDetail => &self.final_trade_detail,
        }
    }

    fn slot_mut(&mut self, id: SectionId) -> &mut Option<String> {
        match id {
            SectionId::Market => &mut self.market,
            SectionId::Sentiment => &mut self.sentiment,
            SectionId::News => &mut self.news,
            SectionId::Fundamentals => &mut self.fundamentals,
            SectionId::InvestmentDebate => &mut self.investment_debate,
            SectionId::TraderPlan => &mut self.trader_plan,
            SectionId::RiskAssessment => &mut self.risk_assessment,
            SectionId::FinalTradeDetail => &mut self.final_trade_detail,
        }
    }
}
