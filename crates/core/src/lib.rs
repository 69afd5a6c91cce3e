//! Core types and shared functionality for linkstash.
//!
//! This crate provides:
//! - Record and content models
//! - The record store (trait and SQLite backend)
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use model::{ContentBlob, ContentId, ContentMeta, NewUrlRecord, RecordState, Status, UrlRecord, UrlRecordView};
pub use store::{RecordStore, SqliteStore};
