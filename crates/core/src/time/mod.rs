use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_analysis_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid analysis date {s:?}; expected YYYY-MM-DD"))
}

/// Explicit date if given, otherwise `today`. Dates after `today` are rejected.
pub fn resolve_analysis_date(arg: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let date = match arg {
        Some(s) => parse_analysis_date(s)?,
        None => today,
    };
    anyhow::ensure!(
        date <= today,
        "analysis date {date} is in the future (today is {today})"
    );
    Ok(date)
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Wall-clock timestamp stamped into the report's summary table.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
