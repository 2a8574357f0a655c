pub mod layout;
pub mod pdf;
pub mod sanitize;
pub mod story;

use crate::domain::analysis::AnalysisResult;
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use self::layout::PageGeometry;

pub fn default_output_path(symbol: &str, analysis_date: NaiveDate) -> PathBuf {
    PathBuf::from(format!(
        "trading_report_{}_{}.pdf",
        symbol,
        analysis_date.format("%Y-%m-%d")
    ))
}

/// Turns an [`AnalysisResult`] into a paginated PDF.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    geometry: PageGeometry,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::A4,
        }
    }
}

impl ReportAssembler {
    /// Writes the report and returns the path it landed at. Without `output`
    /// the file is named after the symbol and date in the working directory.
    pub fn write(
        &self,
        result: &AnalysisResult,
        output: Option<&Path>,
        generated_at: NaiveDateTime,
    ) -> anyhow::Result<PathBuf> {
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => default_output_path(&result.symbol, result.analysis_date),
        };

        let story = story::build_story(result, generated_at);
        let pages = layout::layout(&story, &self.geometry);
        let title = story::report_title(&result.symbol);

        pdf::write_pdf(&pages, &self.geometry, &title, &path)
            .with_context(|| format!("failed to build report for {}", result.symbol))?;

        tracing::info!(
            symbol = %result.symbol,
            analysis_date = %result.analysis_date,
            pages = pages.len(),
            path = %path.display(),
            "PDF report generated"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::SectionId;

    fn scratch_path(stem: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{stem}-{}.pdf", uuid::Uuid::new_v4()))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(18, 5, 0)
            .unwrap()
    }

    #[test]
    fn default_filename_follows_symbol_and_date() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(
            default_output_path("AAPL", d),
            PathBuf::from("trading_report_AAPL_2024-12-01.pdf")
        );
    }

    #[test]
    fn writes_pdf_to_requested_path() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let result = AnalysisResult::new("NVDA", d, "BUY")
            .with_section(SectionId::Market, "Strong uptrend & rising volume")
            .with_section(SectionId::RiskAssessment, "Position size <= 5%");
        let path = scratch_path("nvda");

        let written = ReportAssembler::default()
            .write(&result, Some(&path), now())
            .unwrap();
        assert_eq!(written, path);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let result = AnalysisResult::new("NVDA", d, "BUY");
        let dir = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let path = dir.join("report.pdf");

        let err = ReportAssembler::default()
            .write(&result, Some(&path), now())
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to create PDF file"));
    }
}
