//! Durable store for URL records and content blobs.
//!
//! The services talk to the [`RecordStore`] trait; [`SqliteStore`] is the
//! SQLite implementation, backed by tokio-rusqlite. It supports:
//!
//! - One record and at most one blob per normalized URL (`UNIQUE(url)`)
//! - An explicit `content_id` foreign key from record to blob
//! - `updated_at` that never moves backwards
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod contents;
pub mod migrations;
pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::Error;
use crate::model::{ContentBlob, ContentId, NewUrlRecord, UrlRecord};

pub use connection::SqliteStore;

/// Persistence operations needed by ingestion and refetching.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<UrlRecord>, Error>;

    async fn find_all(&self) -> Result<Vec<UrlRecord>, Error>;

    /// Records last updated strictly before `cutoff`.
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<UrlRecord>, Error>;

    async fn insert_record(&self, record: NewUrlRecord) -> Result<UrlRecord, Error>;

    /// Persist state and redirects of an existing record; refreshes `updated_at`.
    async fn save_record(&self, record: &UrlRecord) -> Result<UrlRecord, Error>;

    /// Persist a body for `url`, returning the blob and its identity.
    async fn insert_content(&self, url: &str, content: &str) -> Result<ContentBlob, Error>;

    async fn find_content_by_url(&self, url: &str) -> Result<Option<ContentBlob>, Error>;

    async fn find_content(&self, id: ContentId) -> Result<Option<ContentBlob>, Error>;

    /// Overwrite the body of an existing blob, keeping its identity.
    async fn save_content(&self, blob: &ContentBlob) -> Result<ContentBlob, Error>;
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<UrlRecord>, Error> {
        SqliteStore::find_by_url(self, url).await
    }

    async fn find_all(&self) -> Result<Vec<UrlRecord>, Error> {
        SqliteStore::find_all(self).await
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<UrlRecord>, Error> {
        SqliteStore::find_stale(self, cutoff).await
    }

    async fn insert_record(&self, record: NewUrlRecord) -> Result<UrlRecord, Error> {
        SqliteStore::insert_record(self, record).await
    }

    async fn save_record(&self, record: &UrlRecord) -> Result<UrlRecord, Error> {
        SqliteStore::save_record(self, record).await
    }

    async fn insert_content(&self, url: &str, content: &str) -> Result<ContentBlob, Error> {
        SqliteStore::insert_content(self, url, content).await
    }

    async fn find_content_by_url(&self, url: &str) -> Result<Option<ContentBlob>, Error> {
        SqliteStore::find_content_by_url(self, url).await
    }

    async fn find_content(&self, id: ContentId) -> Result<Option<ContentBlob>, Error> {
        SqliteStore::find_content(self, id).await
    }

    async fn save_content(&self, blob: &ContentBlob) -> Result<ContentBlob, Error> {
        SqliteStore::save_content(self, blob).await
    }
}
