//! Market-data acquisition: query windows, the HTTP client, and per-zone code fallback.

pub mod entsoe;
pub mod resolver;
pub mod window;

pub use entsoe::{DEFAULT_BASE_URL, EntsoeClient, FeedRequest, FetchError, MarketSource};
pub use resolver::{AttemptFailure, CodeAttempt, ResolveContext, ZoneOutcome, resolve_zone, resolve_zones};
pub use window::QueryWindow;
