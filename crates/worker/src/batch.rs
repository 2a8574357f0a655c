use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tradingreport_core::agents::TradingAgentsClient;
use tradingreport_core::domain::analysis::normalize_symbol;
use tradingreport_core::report::default_output_path;

/// Generates one report per symbol. A failing symbol is reported and the run
/// moves on; the exit code reflects whether any symbol failed. Reports land
/// in `out_dir` when given, otherwise in the working directory.
pub async fn run(
    agents: &dyn TradingAgentsClient,
    symbols: &[String],
    analysis_date: NaiveDate,
    out_dir: Option<&Path>,
) -> ExitCode {
    let mut generated = Vec::new();
    let mut failed = Vec::new();

    for symbol in symbols.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        println!();
        println!("{}", "-".repeat(50));

        let output: Option<PathBuf> =
            out_dir.map(|dir| dir.join(default_output_path(&normalize_symbol(symbol), analysis_date)));
        match crate::generate(agents, symbol, analysis_date, output.as_deref()).await {
            Ok(report) => {
                println!("Report generated: {}", report.path.display());
                generated.push((symbol.to_string(), report));
            }
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%symbol, error = %err, "batch report failed");
                eprintln!("Failed to generate report for {symbol}: {err:#}");
                crate::print_upstream(&err);
                failed.push(symbol.to_string());
            }
        }
    }

    println!();
    println!("Generated {} report(s):", generated.len());
    for (symbol, report) in &generated {
        println!("  {symbol}: {} -> {}", report.decision, report.path.display());
    }

    if failed.is_empty() {
        return ExitCode::SUCCESS;
    }
    eprintln!("Failed: {}", failed.join(", "));
    crate::print_troubleshooting();
    ExitCode::FAILURE
}
