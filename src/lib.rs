//! `entsoe-facts` library crate.
//!
//! The binary (`ef`) is a thin wrapper around this library so that:
//!
//! - the fetch/normalize/merge stages are testable without the network
//! - the market-data source sits behind a trait and can be swapped in tests
//! - code stays easy to navigate as the feed catalogue grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod transform;
