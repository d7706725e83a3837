//! HTTP transport.
//!
//! All network access goes through [`HttpClient`], so the metadata and tile
//! fetchers can run against canned responses in tests.

mod http_client;

pub use http_client::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT_SECS, USER_AGENT};
