//! Test doubles shared by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkstash_client::{FetchError, FetchFailure, FetchOutcome, FetchedPage, Fetcher};
use linkstash_core::{
    ContentBlob, ContentId, ContentMeta, Error, NewUrlRecord, RecordState, RecordStore, SqliteStore, UrlRecord,
};

/// Fetcher answering from a per-URL outcome table and logging every call.
#[derive(Default)]
pub struct StubFetcher {
    outcomes: Mutex<HashMap<String, FetchOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn set_outcome(&self, url: &str, outcome: FetchOutcome) {
        self.outcomes.lock().unwrap().insert(url.to_string(), outcome);
    }

    pub fn set_ok(&self, url: &str, content: &str) {
        self.set_outcome(url, FetchOutcome::Success(page(content, Vec::new())));
    }

    pub fn set_error(&self, url: &str, error: FetchError) {
        self.set_outcome(url, FetchOutcome::Failure(FetchFailure { error, redirects: Vec::new() }));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        self.outcomes.lock().unwrap().get(url).cloned().unwrap_or_else(|| {
            FetchOutcome::Failure(FetchFailure {
                error: FetchError::Network(format!("no stub for {url}")),
                redirects: Vec::new(),
            })
        })
    }
}

pub fn page(content: &str, redirects: Vec<String>) -> FetchedPage {
    FetchedPage {
        content: content.to_string(),
        content_type: Some("text/html".to_string()),
        content_length: content.len() as u64,
        final_url: redirects.last().cloned(),
        redirects,
    }
}

fn unavailable() -> Error {
    Error::Database(tokio_rusqlite::Error::ConnectionClosed)
}

/// In-memory store whose individual operations can be switched to fail.
pub struct FlakyStore {
    pub inner: SqliteStore,
    pub fail_lookups: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub fail_content_writes: AtomicBool,
    pub fail_stale: AtomicBool,
    /// Pretend every content blob is gone.
    pub lose_content: AtomicBool,
    fail_save_for: Mutex<Option<String>>,
}

impl FlakyStore {
    pub async fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().await.unwrap(),
            fail_lookups: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            fail_content_writes: AtomicBool::new(false),
            fail_stale: AtomicBool::new(false),
            lose_content: AtomicBool::new(false),
            fail_save_for: Mutex::new(None),
        }
    }

    /// Make every `save_record` for `url` fail.
    pub fn fail_save_for(&self, url: &str) {
        *self.fail_save_for.lock().unwrap() = Some(url.to_string());
    }

    fn check(flag: &AtomicBool) -> Result<(), Error> {
        if flag.load(Ordering::SeqCst) { Err(unavailable()) } else { Ok(()) }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<UrlRecord>, Error> {
        Self::check(&self.fail_lookups)?;
        self.inner.find_by_url(url).await
    }

    async fn find_all(&self) -> Result<Vec<UrlRecord>, Error> {
        Self::check(&self.fail_lookups)?;
        self.inner.find_all().await
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<UrlRecord>, Error> {
        Self::check(&self.fail_stale)?;
        self.inner.find_stale(cutoff).await
    }

    async fn insert_record(&self, record: NewUrlRecord) -> Result<UrlRecord, Error> {
        Self::check(&self.fail_inserts)?;
        self.inner.insert_record(record).await
    }

    async fn save_record(&self, record: &UrlRecord) -> Result<UrlRecord, Error> {
        if self.fail_save_for.lock().unwrap().as_deref() == Some(record.url.as_str()) {
            return Err(unavailable());
        }
        self.inner.save_record(record).await
    }

    async fn insert_content(&self, url: &str, content: &str) -> Result<ContentBlob, Error> {
        Self::check(&self.fail_content_writes)?;
        self.inner.insert_content(url, content).await
    }

    async fn find_content_by_url(&self, url: &str) -> Result<Option<ContentBlob>, Error> {
        self.inner.find_content_by_url(url).await
    }

    async fn find_content(&self, id: ContentId) -> Result<Option<ContentBlob>, Error> {
        if self.lose_content.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_content(id).await
    }

    async fn save_content(&self, blob: &ContentBlob) -> Result<ContentBlob, Error> {
        Self::check(&self.fail_content_writes)?;
        self.inner.save_content(blob).await
    }
}

/// Seed a success record together with its blob.
pub async fn seed_success(store: &SqliteStore, url: &str, content: &str) -> UrlRecord {
    let blob = store.insert_content(url, content).await.unwrap();
    let meta = ContentMeta {
        content_id: blob.id,
        content_type: Some("text/html".to_string()),
        content_length: content.len() as u64,
        final_url: None,
    };
    store
        .insert_record(NewUrlRecord { url: url.to_string(), state: RecordState::Success(meta), redirects: Vec::new() })
        .await
        .unwrap()
}

/// Seed an error record with no content.
pub async fn seed_error(store: &SqliteStore, url: &str, message: &str) -> UrlRecord {
    let state = RecordState::Error { message: message.to_string(), last_good: None };
    store
        .insert_record(NewUrlRecord { url: url.to_string(), state, redirects: Vec::new() })
        .await
        .unwrap()
}
