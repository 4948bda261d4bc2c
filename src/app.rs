//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the run configuration (window, zones, fetch policy)
//! - runs feeds and the merge stage
//! - prints summaries

use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;

use crate::cli::{Command, FeedArg, FetchArgs, MergeArgs, ZoneArgs, ZonesCmd};
use crate::data::{EntsoeClient, QueryWindow};
use crate::domain::{
    FeedKind, FetchPolicy, IngestConfig, MergeConfig, Zone, default_zones, filter_zones, read_zones_json, zones_to_json,
};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ef` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fetch(cmd) => handle_fetch(cmd.feed, &cmd.args),
        Command::Merge(args) => handle_merge(&args),
        Command::Run(args) => handle_run(&args),
        Command::Zones(args) => handle_zones(&args),
    }
}

fn handle_fetch(feed: FeedArg, args: &FetchArgs) -> Result<(), AppError> {
    let config = ingest_config_from_args(args)?;
    let client = EntsoeClient::from_env(&config.base_url, config.fetch)?;

    let empty = fetch_feeds(&client, &feed.kinds(), &config)?;
    no_data_error(&empty)
}

fn handle_merge(args: &MergeArgs) -> Result<(), AppError> {
    let config = MergeConfig {
        data_dir: args.data_dir.clone(),
        pick: args.pick,
        run_date: Local::now().date_naive(),
    };
    let run = pipeline::run_merge(&config)?;
    println!("{}", crate::report::format_merge_summary(&run));
    Ok(())
}

fn handle_run(args: &FetchArgs) -> Result<(), AppError> {
    let config = ingest_config_from_args(args)?;
    let client = EntsoeClient::from_env(&config.base_url, config.fetch)?;

    let empty = fetch_feeds(&client, &FeedKind::MERGED, &config)?;
    no_data_error(&empty)?;

    handle_merge(&MergeArgs {
        data_dir: config.data_dir.clone(),
        pick: crate::domain::Pick::Latest,
    })
}

fn handle_zones(cmd: &ZonesCmd) -> Result<(), AppError> {
    let zones = zones_from_args(&cmd.zones)?;
    if cmd.json {
        println!("{}", zones_to_json(&zones)?);
    } else {
        print!("{}", crate::report::format_zones(&zones));
    }
    Ok(())
}

/// Run each feed in order and print its summary.
///
/// A feed with no data for any zone does not stop the others; the labels of
/// such feeds are returned so the caller can fail once everything has run.
fn fetch_feeds(client: &EntsoeClient, kinds: &[FeedKind], config: &IngestConfig) -> Result<Vec<&'static str>, AppError> {
    let mut empty = Vec::new();
    for kind in kinds {
        let run = pipeline::run_feed(client, kind.descriptor(), config)?;
        println!("{}", crate::report::format_feed_summary(&run, &config.window));
        if run.path.is_none() {
            empty.push(run.feed.label);
        }
    }
    Ok(empty)
}

fn no_data_error(empty: &[&str]) -> Result<(), AppError> {
    if empty.is_empty() {
        return Ok(());
    }
    Err(AppError::no_data(format!(
        "No data retrieved for any zone: {}.",
        empty.join(", ")
    )))
}

fn zones_from_args(args: &ZoneArgs) -> Result<Vec<Zone>, AppError> {
    let zones = match &args.zones {
        Some(path) => read_zones_json(path)?,
        None => default_zones(),
    };
    filter_zones(zones, &args.countries)
}

/// Resolve CLI flags into an [`IngestConfig`].
pub fn ingest_config_from_args(args: &FetchArgs) -> Result<IngestConfig, AppError> {
    if args.workers == 0 {
        return Err(AppError::config("--workers must be at least 1."));
    }
    if args.retries == 0 {
        return Err(AppError::config("--retries must be at least 1."));
    }

    let now = Local::now().naive_local();
    let end_date = match &args.end_date {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| AppError::config(format!("Invalid --end-date '{s}' (expected YYYY-MM-DD): {e}")))?,
        None => now
            .date()
            .pred_opt()
            .ok_or_else(|| AppError::config("Cannot compute yesterday's date."))?,
    };
    let window = QueryWindow::from_local(end_date, args.days, args.offset)?;

    Ok(IngestConfig {
        window,
        offset_hours: args.offset,
        zones: zones_from_args(&args.zones)?,
        fetch: FetchPolicy {
            max_attempts: args.retries,
            retry_delay: Duration::from_secs(args.retry_delay_secs),
            timeout: Duration::from_secs(args.timeout_secs),
        },
        base_url: args.base_url.clone(),
        data_dir: args.data_dir.clone(),
        workers: args.workers,
        now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::error::{EXIT_CONFIG, EXIT_NO_DATA};

    fn fetch_args(extra: &[&str]) -> FetchArgs {
        let mut argv = vec!["ef", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_from_explicit_end_date() {
        let config = ingest_config_from_args(&fetch_args(&["--end-date", "2025-02-04", "--days", "2"])).unwrap();
        assert_eq!(config.window.period_start(), "202502022300");
        assert_eq!(config.window.period_end(), "202502042300");
        assert_eq!(config.fetch.max_attempts, 3);
        assert!(config.zones.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn default_end_date_is_yesterday() {
        let config = ingest_config_from_args(&fetch_args(&[])).unwrap();
        let today = Local::now().date_naive();
        assert!(config.window.end_date < today);
        assert_eq!(config.window.start_date, config.window.end_date);
    }

    #[test]
    fn bad_flags_are_config_errors() {
        for extra in [
            &["--workers", "0"][..],
            &["--days", "0"][..],
            &["--end-date", "04/02/2025"][..],
            &["--country", "Atlantis"][..],
        ] {
            let err = ingest_config_from_args(&fetch_args(extra)).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_CONFIG, "{extra:?}");
        }
    }

    #[test]
    fn empty_feeds_are_reported_together() {
        assert!(no_data_error(&[]).is_ok());
        let err = no_data_error(&["Generation Forecast", "Energy Prices"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
        assert!(err.to_string().contains("Generation Forecast, Energy Prices"));
    }
}
