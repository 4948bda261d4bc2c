//! Input/output helpers.
//!
//! - market-document XML parsing (`xml`)
//! - gzip CSV feed files and fact table, input lookup (`store`)

pub mod store;
pub mod xml;

pub use store::*;
pub use xml::*;
