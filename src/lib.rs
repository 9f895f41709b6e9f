// Procurement spend analytics over purchase-order line-item exports.
//
// The pipeline is load (`loader`) -> filter (`filter`) -> aggregate
// (`analytics`) -> lay out (`report`) -> export (`export`), with
// `session::Session` caching loads and reports for the console front-end.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod report;
pub mod schema;
pub mod session;
pub mod util;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{DashboardError, Result};
pub use filter::FilterSpec;
pub use report::ReportKind;
pub use schema::{Table, Transaction};
pub use session::Session;
