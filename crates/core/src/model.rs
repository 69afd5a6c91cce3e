//! Record and content models.
//!
//! A [`UrlRecord`] exists for every URL the service has ever attempted. A
//! [`ContentBlob`] exists for every URL that has ever been fetched
//! successfully, and the record points at it through an explicit
//! [`ContentId`].

use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Store identity of a [`ContentBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub i64);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of a successfully fetched body, including the reference to its blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMeta {
    pub content_id: ContentId,
    pub content_type: Option<String>,
    pub content_length: u64,
    /// Set only when redirects led somewhere other than the requested URL.
    pub final_url: Option<String>,
}

/// Outcome of the latest fetch of a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    Success(ContentMeta),
    Error {
        message: String,
        /// Content from an earlier successful fetch. Never produced by the failed attempt itself.
        last_good: Option<ContentMeta>,
    },
}

/// Wire form of [`RecordState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

impl RecordState {
    pub fn status(&self) -> Status {
        match self {
            RecordState::Success(_) => Status::Success,
            RecordState::Error { .. } => Status::Error,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RecordState::Success(_) => None,
            RecordState::Error { message, .. } => Some(message),
        }
    }

    /// The content owned by the record, whether current or retained.
    pub fn content_meta(&self) -> Option<&ContentMeta> {
        match self {
            RecordState::Success(meta) => Some(meta),
            RecordState::Error { last_good, .. } => last_good.as_ref(),
        }
    }
}

/// A URL record as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub state: RecordState,
    pub redirects: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UrlRecord {
    /// Replace the state with a success, dropping any error message.
    pub fn mark_success(&mut self, meta: ContentMeta, redirects: Vec<String>) {
        self.state = RecordState::Success(meta);
        self.redirects = redirects;
    }

    /// Flip the record to error, keeping whatever content it already owns.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        let last_good = self.state.content_meta().cloned();
        self.state = RecordState::Error { message: message.into(), last_good };
    }

    pub fn content_id(&self) -> Option<ContentId> {
        self.state.content_meta().map(|m| m.content_id)
    }
}

/// A record that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUrlRecord {
    pub url: String,
    pub state: RecordState,
    pub redirects: Vec<String>,
}

/// Body of a successfully fetched URL, keyed by that URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    pub id: ContentId,
    pub url: String,
    pub content: String,
    /// SHA-256 of `content`, hex encoded.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentBlob {
    /// Replace the body in place, keeping the blob's identity.
    ///
    /// Returns true when the new body differs from the old one.
    pub fn replace_content(&mut self, content: String) -> bool {
        let checksum = checksum(&content);
        let changed = checksum != self.checksum;
        self.content = content;
        self.checksum = checksum;
        changed
    }
}

/// Hex SHA-256 of a body.
pub fn checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Fixed-width RFC 3339 used for every stored timestamp, so text ordering matches time ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serializable view of a record, with content inlined where available.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UrlRecordView {
    pub url: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UrlRecordView {
    /// View of a stored record. `content` is only attached to success records.
    pub fn from_record(record: &UrlRecord, content: Option<String>) -> Self {
        let (meta, error_message, content) = match &record.state {
            RecordState::Success(meta) => (Some(meta), None, content),
            RecordState::Error { message, .. } => (None, Some(message.clone()), None),
        };

        Self {
            url: record.url.clone(),
            status: record.state.status(),
            error_message,
            redirects: record.redirects.clone(),
            content_type: meta.and_then(|m| m.content_type.clone()),
            content_length: meta.map(|m| m.content_length),
            final_url: meta.and_then(|m| m.final_url.clone()),
            content,
            created_at: Some(format_timestamp(&record.created_at)),
            updated_at: Some(format_timestamp(&record.updated_at)),
        }
    }

    /// View of a failure that never reached the store.
    pub fn unsaved_failure(url: impl Into<String>, message: impl Into<String>, redirects: Vec<String>) -> Self {
        Self {
            url: url.into(),
            status: Status::Error,
            error_message: Some(message.into()),
            redirects,
            content_type: None,
            content_length: None,
            final_url: None,
            content: None,
            created_at: None,
            updated_at: None,
        }
    }
}
