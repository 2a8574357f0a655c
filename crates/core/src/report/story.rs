use crate::domain::analysis::{AnalysisResult, SectionId};
use crate::report::sanitize::{clean_text, unescape_markup};
use chrono::NaiveDateTime;

pub const GENERATED_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SPACE_AFTER_TITLE: f32 = 20.0;
const SPACE_AFTER_SUMMARY: f32 = 20.0;
const SPACE_AFTER_SECTION: f32 = 15.0;
const SPACE_AFTER_SUBSECTION: f32 = 10.0;

/// Text that is safe to hand to the renderer: whitespace-collapsed with the
/// reserved characters escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn from_plain(text: &str) -> Self {
        Self(clean_text(text))
    }

    pub fn to_plain(&self) -> String {
        unescape_markup(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Title,
    Section,
    Subsection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: HeadingLevel, text: Markup },
    Paragraph(Markup),
    /// Emphasised standalone copy of the final decision.
    Decision(Markup),
    /// Two-column key/value table; cells are plain text.
    SummaryTable(Vec<(String, String)>),
    Spacer(f32),
    PageBreak,
}

/// Ordered blocks of one report, ready for layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Story {
    pub blocks: Vec<Block>,
}

impl Story {
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn headings(&self) -> impl Iterator<Item = (HeadingLevel, String)> + '_ {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading { level, text } => Some((*level, text.to_plain())),
            _ => None,
        })
    }

    pub fn has_heading(&self, text: &str) -> bool {
        self.headings().any(|(_, h)| h == text)
    }

    pub fn page_breaks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::PageBreak))
            .count()
    }

    fn heading(&mut self, level: HeadingLevel, text: &str) {
        self.push(Block::Heading {
            level,
            text: Markup::from_plain(text),
        });
    }
}

pub fn report_title(symbol: &str) -> String {
    format!("TradingAgents Analysis Report: {symbol}")
}

pub fn summary_rows(result: &AnalysisResult, generated_at: NaiveDateTime) -> Vec<(String, String)> {
    vec![
        ("Stock Symbol".to_string(), result.symbol.clone()),
        (
            "Analysis Date".to_string(),
            result.analysis_date.format("%Y-%m-%d").to_string(),
        ),
        ("Final Decision".to_string(), result.decision.clone()),
        (
            "Generated On".to_string(),
            generated_at.format(GENERATED_ON_FORMAT).to_string(),
        ),
    ]
}

/// Lays out the report content in its fixed order. The summary table and the
/// decision block are always present; optional sections appear only when
/// they carry text.
pub fn build_story(result: &AnalysisResult, generated_at: NaiveDateTime) -> Story {
    let mut story = Story::default();

    story.heading(HeadingLevel::Title, &report_title(&result.symbol));
    story.push(Block::Spacer(SPACE_AFTER_TITLE));

    story.heading(HeadingLevel::Section, "Executive Summary");
    story.push(Block::SummaryTable(summary_rows(result, generated_at)));
    story.push(Block::Spacer(SPACE_AFTER_SUMMARY));

    // Repeats the table row as a standalone block.
    story.heading(HeadingLevel::Section, "FINAL TRADING DECISION");
    story.push(Block::Decision(Markup::from_plain(&result.decision)));
    story.push(Block::Spacer(SPACE_AFTER_SUMMARY));

    let mut page_broken = false;
    for (id, body) in result.sections.present() {
        let body = Markup::from_plain(body);
        if body.is_empty() {
            continue;
        }

        if id.is_detail() && !page_broken {
            story.push(Block::PageBreak);
            page_broken = true;
        }

        story.heading(HeadingLevel::Section, id.heading());
        match id.subheading() {
            Some(sub) => {
                story.heading(HeadingLevel::Subsection, sub);
                story.push(Block::Paragraph(body));
                story.push(Block::Spacer(SPACE_AFTER_SUBSECTION));
            }
            None => {
                story.push(Block::Paragraph(body));
                if id != SectionId::FinalTradeDetail {
                    story.push(Block::Spacer(SPACE_AFTER_SECTION));
                }
            }
        }
    }

    story
}
