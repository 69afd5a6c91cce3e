//! Periodic refetch of stale records.
//!
//! Every `check_every` the reconciler selects records whose `updated_at` is
//! older than `stale_after` and fetches them again. Error records are
//! selected like any other, which makes this the only retry path for URLs
//! that failed at ingestion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use linkstash_client::{FetchOutcome, Fetcher};
use linkstash_core::{AppConfig, ContentMeta, Error, RecordStore, UrlRecord};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Timing of the refetch loop.
#[derive(Debug, Clone, Copy)]
pub struct RefetchConfig {
    /// Records untouched for longer than this are refetched.
    pub stale_after: chrono::Duration,
    /// Period between ticks.
    pub check_every: Duration,
}

impl From<&AppConfig> for RefetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { stale_after: config.refetch_interval(), check_every: config.refetch_check_interval() }
    }
}

/// Counts for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub total: usize,
    pub succeeded: usize,
    pub errored: usize,
    /// Successful refetches whose body differs from what was stored.
    pub changed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// Another tick was still running.
    Skipped,
    Completed(TickSummary),
}

enum Refreshed {
    Succeeded { changed: bool },
    Errored,
}

/// Clears the running flag when a tick ends, including on early return.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Refetcher {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn RecordStore>,
    config: RefetchConfig,
    running: AtomicBool,
}

impl Refetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn RecordStore>, config: RefetchConfig) -> Self {
        Self { fetcher, store, config, running: AtomicBool::new(false) }
    }

    pub async fn tick(&self) -> Result<TickReport, Error> {
        self.tick_at(Utc::now()).await
    }

    /// Run one reconciliation pass as of `now`.
    ///
    /// Fails only when stale records cannot be selected; per-record
    /// problems are logged and counted as errored.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport, Error> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("refetch already in progress, skipping tick");
            return Ok(TickReport::Skipped);
        }
        let _guard = RunGuard(&self.running);

        let cutoff = now
            .checked_sub_signed(self.config.stale_after)
            .ok_or_else(|| Error::Config(format!("staleness threshold {} is out of range", self.config.stale_after)))?;
        let stale = self.store.find_stale(cutoff).await?;
        if stale.is_empty() {
            tracing::debug!(cutoff = %cutoff, "no stale records");
            return Ok(TickReport::Completed(TickSummary::default()));
        }

        let mut summary = TickSummary { total: stale.len(), ..Default::default() };
        for record in stale {
            match self.refresh_record(record).await {
                Refreshed::Succeeded { changed } => {
                    summary.succeeded += 1;
                    if changed {
                        summary.changed += 1;
                    }
                }
                Refreshed::Errored => summary.errored += 1,
            }
        }

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            errored = summary.errored,
            changed = summary.changed,
            "refetch tick complete"
        );

        Ok(TickReport::Completed(summary))
    }

    async fn refresh_record(&self, mut record: UrlRecord) -> Refreshed {
        match self.try_refresh(&mut record).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(url = %record.url, error = %e, "refetch failed");
                record.mark_error(e.to_string());
                if let Err(save_err) = self.store.save_record(&record).await {
                    tracing::error!(url = %record.url, error = %save_err, "failed to record refetch error");
                }
                Refreshed::Errored
            }
        }
    }

    async fn try_refresh(&self, record: &mut UrlRecord) -> Result<Refreshed, Error> {
        match self.fetcher.fetch(&record.url).await {
            FetchOutcome::Success(page) => {
                let (blob, changed) = match self.store.find_content_by_url(&record.url).await? {
                    Some(mut blob) => {
                        let changed = blob.replace_content(page.content);
                        (self.store.save_content(&blob).await?, changed)
                    }
                    None => (self.store.insert_content(&record.url, &page.content).await?, true),
                };

                let meta = ContentMeta {
                    content_id: blob.id,
                    content_type: page.content_type,
                    content_length: page.content_length,
                    final_url: page.final_url,
                };
                record.mark_success(meta, page.redirects);
                self.store.save_record(record).await?;

                tracing::debug!(url = %record.url, changed, "refetched");
                Ok(Refreshed::Succeeded { changed })
            }
            FetchOutcome::Failure(failure) => {
                record.mark_error(failure.error.to_string());
                self.store.save_record(record).await?;
                Ok(Refreshed::Errored)
            }
        }
    }

    /// Start the periodic loop. The first tick fires one period after start.
    pub fn spawn(self: Arc<Self>) -> RefetchHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let period = self.config.check_every;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(period_secs = period.as_secs(), "refetch loop started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.tick().await {
                            tracing::error!(error = %e, "refetch tick failed");
                        }
                    }
                }
            }
            tracing::info!("refetch loop stopped");
        });

        RefetchHandle { token, join }
    }
}

/// Owner of a running refetch loop.
pub struct RefetchHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl RefetchHandle {
    /// Cancel the loop and wait for it to exit. A tick in progress runs to completion.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "refetch task ended abnormally");
        }
    }
}
