//! Batch ingestion of URLs.
//!
//! A URL already in the store is answered from the store and never fetched
//! again here; refreshing known URLs is the job of [`crate::refetch`].
//! Unknown URLs are fetched once and their outcome is persisted, content
//! blob first so the record can reference it.

use std::sync::Arc;

use linkstash_client::{FetchError, FetchOutcome, FetchedPage, Fetcher, canonicalize};
use linkstash_core::{ContentMeta, Error, NewUrlRecord, RecordState, RecordStore, Status, UrlRecord, UrlRecordView};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Result of one `store_urls` batch, each list in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StoreUrlsOutput {
    pub success: Vec<UrlRecordView>,
    pub failed: Vec<UrlRecordView>,
}

pub struct IngestService {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn RecordStore>,
}

impl IngestService {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn RecordStore>) -> Self {
        Self { fetcher, store }
    }

    /// Store a batch of URLs and partition the results into success and failure.
    ///
    /// Per-URL problems end up in `failed`. Only a failed store lookup aborts
    /// the whole call.
    pub async fn store_urls(&self, urls: &[String]) -> Result<StoreUrlsOutput, Error> {
        let mut output = StoreUrlsOutput::default();

        for input in urls {
            let view = self.store_one(input).await?;
            match view.status {
                Status::Success => output.success.push(view),
                Status::Error => output.failed.push(view),
            }
        }

        tracing::info!(
            requested = urls.len(),
            succeeded = output.success.len(),
            failed = output.failed.len(),
            "stored url batch"
        );

        Ok(output)
    }

    /// Every stored record, with content inlined for success records.
    pub async fn list_urls(&self) -> Result<Vec<UrlRecordView>, Error> {
        let records = self.store.find_all().await?;
        let mut views = Vec::with_capacity(records.len());

        for record in &records {
            let content = self.resolve_content(record).await?;
            views.push(UrlRecordView::from_record(record, content));
        }

        Ok(views)
    }

    async fn store_one(&self, input: &str) -> Result<UrlRecordView, Error> {
        let url = match canonicalize(input) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!(url = input, error = %e, "rejected url");
                let message = FetchError::from(e).to_string();
                return Ok(UrlRecordView::unsaved_failure(input.trim(), message, Vec::new()));
            }
        };

        match self.store.find_by_url(&url).await? {
            Some(record) => Ok(self.known(&record).await),
            None => Ok(self.ingest(&url).await),
        }
    }

    async fn known(&self, record: &UrlRecord) -> UrlRecordView {
        match self.resolve_content(record).await {
            Ok(content) => UrlRecordView::from_record(record, content),
            Err(e) => {
                tracing::warn!(url = %record.url, error = %e, "failed to load stored content");
                UrlRecordView::unsaved_failure(&record.url, e.to_string(), record.redirects.clone())
            }
        }
    }

    /// Content of a success record. Error records never expose content.
    async fn resolve_content(&self, record: &UrlRecord) -> Result<Option<String>, Error> {
        let RecordState::Success(meta) = &record.state else {
            return Ok(None);
        };

        match self.store.find_content(meta.content_id).await? {
            Some(blob) => Ok(Some(blob.content)),
            None => {
                tracing::warn!(url = %record.url, content_id = %meta.content_id, "content blob missing");
                Ok(None)
            }
        }
    }

    async fn ingest(&self, url: &str) -> UrlRecordView {
        match self.fetcher.fetch(url).await {
            FetchOutcome::Success(page) => {
                let redirects = page.redirects.clone();
                match self.persist_success(url, page).await {
                    Ok(view) => view,
                    Err(e) => {
                        tracing::warn!(url, error = %e, "failed to persist fetched content");
                        UrlRecordView::unsaved_failure(url, e.to_string(), redirects)
                    }
                }
            }
            FetchOutcome::Failure(failure) => {
                let message = failure.error.to_string();
                let record = NewUrlRecord {
                    url: url.to_string(),
                    state: RecordState::Error { message: message.clone(), last_good: None },
                    redirects: failure.redirects.clone(),
                };

                let inserted = match self.store.insert_record(record).await {
                    Ok(saved) => Ok(UrlRecordView::from_record(&saved, None)),
                    Err(e) => self.settle_conflict(url, e).await,
                };

                match inserted {
                    Ok(view) => view,
                    Err(e) => {
                        tracing::warn!(url, error = %e, "failed to persist fetch failure");
                        UrlRecordView::unsaved_failure(url, message, failure.redirects)
                    }
                }
            }
        }
    }

    async fn persist_success(&self, url: &str, page: FetchedPage) -> Result<UrlRecordView, Error> {
        let blob = self.store.insert_content(url, &page.content).await?;
        let meta = ContentMeta {
            content_id: blob.id,
            content_type: page.content_type,
            content_length: page.content_length,
            final_url: page.final_url,
        };

        let record =
            NewUrlRecord { url: url.to_string(), state: RecordState::Success(meta), redirects: page.redirects };
        match self.store.insert_record(record).await {
            Ok(record) => Ok(UrlRecordView::from_record(&record, Some(blob.content))),
            Err(e) => self.settle_conflict(url, e).await,
        }
    }

    /// Answer from the store when a concurrent ingest recorded `url` first.
    ///
    /// Returns `err` unchanged when no record exists.
    async fn settle_conflict(&self, url: &str, err: Error) -> Result<UrlRecordView, Error> {
        match self.store.find_by_url(url).await {
            Ok(Some(existing)) => {
                tracing::debug!(url, error = %err, "record written concurrently, answering from store");
                Ok(self.known(&existing).await)
            }
            Ok(None) | Err(_) => Err(err),
        }
    }
}
