//! Client code for linkstash.
//!
//! This crate provides the HTTP fetch pipeline: URL canonicalization,
//! the redirect-following fetch loop, size limits and the private-address
//! guard.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchError, FetchFailure, FetchOutcome, FetchedPage, Fetcher, canonicalize};
