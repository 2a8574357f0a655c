use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradingreport_core::config::Settings;
use tradingreport_core::doctor::{CheckOutcome, Doctor, Summary};

const DEFAULT_LOG_FILTER: &str = "info";

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
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    println!("TradingAgents Setup Test");
    println!("{}", "=".repeat(50));

    let doctor = match Doctor::from_settings(settings) {
        Ok(d) => d,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            eprintln!("ERROR: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let summary = doctor.run(print_outcome).await;
    print_summary(&summary);

    if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_outcome(outcome: &CheckOutcome) {
    println!();
    println!("Testing {}...", outcome.check.name());
    for note in &outcome.notes {
        println!("{note}");
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("{}", "=".repeat(50));
    println!("TEST SUMMARY");
    println!("{}", "=".repeat(50));
    println!("{}", summary.table());
    println!();

    if summary.all_passed() {
        println!("All tests passed! Your setup is ready.");
        println!();
        println!("Next steps:");
        println!("1. Run: trading_report");
        println!("2. Or batch: trading_report --batch AAPL,NVDA,TSLA");
    } else {
        println!("Some tests failed. Please fix the issues above.");
        println!();
        println!("Common solutions:");
        println!("1. Set your API keys in the environment or a .env file");
        println!("2. Start the TradingAgents service (TRADING_AGENTS_BASE_URL)");
        println!("3. Check your internet connection");
        println!("4. Verify your API keys are valid and have credits");
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn logs_at_info_without_rust_log() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
