//! Utility modules supporting grants searches.
//!
//! - [`HttpClient`]: shared reqwest client with user agent and timeouts
//!
//! # HTTP Client
//!
//! ```rust,no_run
//! use arc_grants::utils::HttpClient;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::with_settings("my-tool/1.0", Duration::from_secs(60))?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::{HttpClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
