use chrono::NaiveDate;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradingreport_core::agents::error::AgentsDiagnosticsError;
use tradingreport_core::agents::http::HttpTradingAgents;
use tradingreport_core::agents::{AgentsConfig, TradingAgentsClient};
use tradingreport_core::config::{ApiKeys, Settings};
use tradingreport_core::report::ReportAssembler;
use tradingreport_core::time;

mod batch;

const DEFAULT_SYMBOL: &str = "AAPL";
const DEFAULT_DATE: &str = "2024-12-01";

#[derive(Debug, Parser)]
#[command(name = "trading_report")]
struct Args {
    /// Ticker to analyse.
    #[arg(long, default_value = DEFAULT_SYMBOL, conflicts_with = "batch")]
    symbol: String,

    /// Analysis date (YYYY-MM-DD). In batch mode defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// PDF path. Defaults to trading_report_{SYMBOL}_{DATE}.pdf.
    #[arg(long, conflicts_with = "batch")]
    output: Option<PathBuf>,

    /// Comma separated tickers, one report each.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    batch: Vec<String>,
}

/// Usage errors exit 1 like every other failure; `--help` still exits 0.
fn parse_args<I, T>(argv: I) -> Result<Args, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv).map_err(|err| {
        let _ = err.print();
        if err.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => return code,
    };

    print_banner();

    // Keys are checked before any network call.
    let keys = match ApiKeys::from_settings(&settings) {
        Ok(keys) => keys,
        Err(err) => {
            tracing::error!(var = err.var, "configuration error");
            eprintln!("ERROR: {err}");
            return ExitCode::FAILURE;
        }
    };

    let agents = match HttpTradingAgents::from_settings(&settings, keys, AgentsConfig::from_env()) {
        Ok(agents) => agents,
        Err(err) => return fail(err),
    };
    tracing::info!(client = agents.name(), base_url = agents.base_url(), "using trading agents service");

    run(&args, &agents, time::local_today()).await
}

/// Resolves the analysis date up front so a bad or future date never reaches
/// the agents, then dispatches to single or batch mode.
async fn run(args: &Args, agents: &dyn TradingAgentsClient, today: NaiveDate) -> ExitCode {
    if !args.batch.is_empty() {
        let analysis_date = match time::resolve_analysis_date(args.date.as_deref(), today) {
            Ok(d) => d,
            Err(err) => return fail(err),
        };
        return batch::run(agents, &args.batch, analysis_date, None).await;
    }

    let date_arg = args.date.as_deref().unwrap_or(DEFAULT_DATE);
    let analysis_date = match time::resolve_analysis_date(Some(date_arg), today) {
        Ok(d) => d,
        Err(err) => return fail(err),
    };

    match generate(agents, &args.symbol, analysis_date, args.output.as_deref()).await {
        Ok(report) => {
            println!();
            println!("Analysis complete!");
            println!("Final Decision: {}", report.decision);
            println!("PDF Report: {}", report.path.display());
            ExitCode::SUCCESS
        }
        Err(err) => fail(err),
    }
}

#[derive(Debug)]
pub(crate) struct GeneratedReport {
    pub decision: String,
    pub path: PathBuf,
}

/// One symbol end to end: run the analysis, write the PDF.
pub(crate) async fn generate(
    agents: &dyn TradingAgentsClient,
    symbol: &str,
    analysis_date: NaiveDate,
    output: Option<&Path>,
) -> anyhow::Result<GeneratedReport> {
    println!("Generating report for {symbol} on {analysis_date}...");
    println!("Running TradingAgents analysis (this may take several minutes)...");

    let result = agents.propagate(symbol, analysis_date).await?;
    println!("Analysis complete. Decision: {}", result.decision);

    let path = ReportAssembler::default().write(&result, output, time::local_now())?;
    Ok(GeneratedReport {
        decision: result.decision,
        path,
    })
}

fn fail(err: anyhow::Error) -> ExitCode {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "report generation failed");
    eprintln!("Error generating report: {err:#}");
    print_upstream(&err);
    print_troubleshooting();
    ExitCode::FAILURE
}

/// Echoes what the trading-agents service said, when the failure came from it.
pub(crate) fn print_upstream(err: &anyhow::Error) {
    let Some(diag) = err.downcast_ref::<AgentsDiagnosticsError>() else {
        return;
    };
    tracing::debug!(stage = diag.stage, raw = ?diag.raw_output, "trading agents raw response");
    if let Some(msg) = diag.upstream_message() {
        eprintln!("TradingAgents service response: {msg}");
    }
}

fn print_banner() {
    println!("TradingAgents PDF Report Generator");
    println!("{}", "=".repeat(50));
}

pub(crate) fn print_troubleshooting() {
    eprintln!();
    eprintln!("Troubleshooting tips:");
    eprintln!("1. Make sure your API keys are valid and have sufficient credits");
    eprintln!("2. Check your internet connection");
    eprintln!("3. Verify the stock symbol is valid");
    eprintln!("4. Ensure the date is not in the future");
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
