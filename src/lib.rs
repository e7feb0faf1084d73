//! # ARC Grants
//!
//! Query the Australian Research Council grants search API, page through
//! the results and export them to CSV and SQLite.
//!
//! ## Architecture
//!
//! - [`models`]: search filters, request parameters, grant records
//! - [`api`]: page fetcher trait, HTTP client and the pagination driver
//! - [`export`]: CSV and SQLite exporters
//! - [`config`]: configuration file and environment handling
//! - [`utils`]: HTTP client construction
//! - [`ui`]: terminal progress output

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use error::GrantsError;
pub use models::{GrantRecord, ResultSet, SearchFilters, SearchParams};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
