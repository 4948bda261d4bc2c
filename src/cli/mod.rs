//! Command-line parsing for the ENTSO-E ingestion tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fetch/normalize/merge code.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::data::DEFAULT_BASE_URL;
use crate::domain::{FeedKind, Pick};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ef", version, about = "ENTSO-E load, generation and price ingestion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one feed (or all merged feeds) for every zone and save per-feed files.
    Fetch(FetchCmd),
    /// Merge the latest load, generation and price files into the fact table.
    Merge(MergeArgs),
    /// Fetch all merged feeds, then merge.
    Run(FetchArgs),
    /// Print the zone table with codes in fallback order.
    Zones(ZonesCmd),
}

/// Feed selector for `ef fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeedArg {
    ActualLoad,
    LoadForecast,
    Generation,
    Price,
    /// Actual load, generation and price, in that order.
    All,
}

impl FeedArg {
    pub fn kinds(self) -> Vec<FeedKind> {
        match self {
            FeedArg::ActualLoad => vec![FeedKind::ActualLoad],
            FeedArg::LoadForecast => vec![FeedKind::LoadForecast],
            FeedArg::Generation => vec![FeedKind::Generation],
            FeedArg::Price => vec![FeedKind::Price],
            FeedArg::All => FeedKind::MERGED.to_vec(),
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct FetchCmd {
    /// Which feed to fetch.
    #[arg(value_enum)]
    pub feed: FeedArg,

    #[command(flatten)]
    pub args: FetchArgs,
}

/// Zone table selection, shared by fetching and listing.
#[derive(Debug, Parser, Clone)]
pub struct ZoneArgs {
    /// JSON zone table, `{name: [codes]}` or a `zones --json` list (replaces the built-in table).
    #[arg(long, value_name = "JSON")]
    pub zones: Option<PathBuf>,

    /// Only process this country (repeatable).
    #[arg(long = "country", value_name = "NAME")]
    pub countries: Vec<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct ZonesCmd {
    #[command(flatten)]
    pub zones: ZoneArgs,

    /// Print as a JSON list that `--zones` accepts back.
    #[arg(long)]
    pub json: bool,
}

/// Common options for fetching.
#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Last local day to fetch (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long)]
    pub end_date: Option<String>,

    /// Number of local days ending at `--end-date`.
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    /// Whole-hour offset from UTC to local time (e.g. 1 for CET, 2 for CEST).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub offset: i32,

    /// Root directory for feed and fact-table files.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub zones: ZoneArgs,

    /// Countries resolved concurrently (1 = sequential).
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Attempts per zone code.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Delay between attempts (seconds).
    #[arg(long, default_value_t = 2)]
    pub retry_delay_secs: u64,

    /// Per-request timeout (seconds).
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Market-data service endpoint.
    #[arg(long, default_value_t = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
}

/// Options for merging.
#[derive(Debug, Parser, Clone)]
pub struct MergeArgs {
    /// Root directory holding the `load`, `generation` and `price` directories.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Which file to take when a directory holds several (by file name order).
    #[arg(long, value_enum, default_value_t = Pick::Latest)]
    pub pick: Pick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_defaults() {
        let cli = Cli::parse_from(["ef", "fetch", "generation"]);
        let Command::Fetch(cmd) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(cmd.feed, FeedArg::Generation);
        assert_eq!(cmd.args.days, 1);
        assert_eq!(cmd.args.offset, 1);
        assert_eq!(cmd.args.workers, 4);
        assert_eq!(cmd.args.retries, 3);
        assert_eq!(cmd.args.base_url, DEFAULT_BASE_URL);
        assert!(cmd.args.zones.countries.is_empty());
    }

    #[test]
    fn run_accepts_negative_offset_and_repeated_countries() {
        let cli = Cli::parse_from([
            "ef", "run", "--offset", "-1", "--country", "Austria", "--country", "Spain", "--end-date", "2025-02-04",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.offset, -1);
        assert_eq!(args.zones.countries, vec!["Austria", "Spain"]);
        assert_eq!(args.end_date.as_deref(), Some("2025-02-04"));
    }

    #[test]
    fn zones_json_flag() {
        let cli = Cli::parse_from(["ef", "zones", "--json", "--country", "Spain"]);
        let Command::Zones(cmd) = cli.command else {
            panic!("expected zones");
        };
        assert!(cmd.json);
        assert_eq!(cmd.zones.countries, vec!["Spain"]);
    }

    #[test]
    fn all_expands_to_merged_feeds() {
        assert_eq!(FeedArg::All.kinds(), FeedKind::MERGED.to_vec());
    }
}
