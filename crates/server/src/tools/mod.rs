//! MCP tool implementations.
//!
//! This module contains all tools exposed by the linkstash server.

pub mod list_urls;
pub mod store_urls;

pub use list_urls::{ListUrlsParams, list_urls_impl};
pub use store_urls::{StoreUrlsParams, store_urls_impl};
