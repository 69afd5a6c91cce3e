//! URL record persistence.

use super::connection::SqliteStore;
use crate::Error;
use crate::model::{ContentId, ContentMeta, NewUrlRecord, RecordState, UrlRecord, format_timestamp};
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const RECORD_COLUMNS: &str = "id, url, status, error_message, redirects_json, content_id,
    content_type, content_length, final_url, created_at, updated_at";

/// Raw column values of a `url_records` row.
struct RecordRow {
    id: i64,
    url: String,
    status: String,
    error_message: Option<String>,
    redirects_json: String,
    content_id: Option<i64>,
    content_type: Option<String>,
    content_length: Option<i64>,
    final_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        url: row.get(1)?,
        status: row.get(2)?,
        error_message: row.get(3)?,
        redirects_json: row.get(4)?,
        content_id: row.get(5)?,
        content_type: row.get(6)?,
        content_length: row.get(7)?,
        final_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRecord(format!("bad timestamp {value:?}: {e}")))
}

impl TryFrom<RecordRow> for UrlRecord {
    type Error = Error;

    fn try_from(row: RecordRow) -> Result<Self, Error> {
        let meta = row.content_id.map(|id| ContentMeta {
            content_id: ContentId(id),
            content_type: row.content_type,
            content_length: row.content_length.unwrap_or(0).max(0) as u64,
            final_url: row.final_url,
        });

        let state = match (row.status.as_str(), row.error_message) {
            ("success", _) => RecordState::Success(
                meta.ok_or_else(|| Error::CorruptRecord(format!("{}: success without content", row.url)))?,
            ),
            ("error", Some(message)) => RecordState::Error { message, last_good: meta },
            ("error", None) => {
                return Err(Error::CorruptRecord(format!("{}: error without message", row.url)));
            }
            (other, _) => return Err(Error::CorruptRecord(format!("{}: unknown status {other}", row.url))),
        };

        let redirects: Vec<String> = serde_json::from_str(&row.redirects_json)
            .map_err(|e| Error::CorruptRecord(format!("{}: bad redirects: {e}", row.url)))?;

        Ok(UrlRecord {
            id: row.id,
            url: row.url,
            state,
            redirects,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Column values derived from a record state.
struct StateColumns {
    status: &'static str,
    error_message: Option<String>,
    content_id: Option<i64>,
    content_type: Option<String>,
    content_length: Option<i64>,
    final_url: Option<String>,
}

impl From<&RecordState> for StateColumns {
    fn from(state: &RecordState) -> Self {
        let meta = state.content_meta();
        Self {
            status: state.status().as_str(),
            error_message: state.error_message().map(str::to_string),
            content_id: meta.map(|m| m.content_id.0),
            content_type: meta.and_then(|m| m.content_type.clone()),
            content_length: meta.map(|m| m.content_length as i64),
            final_url: meta.and_then(|m| m.final_url.clone()),
        }
    }
}

fn select_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<UrlRecord>, Error> {
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM url_records WHERE id = ?1"))?;
    match stmt.query_row(params![id], read_row) {
        Ok(row) => Ok(Some(UrlRecord::try_from(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn encode_redirects(redirects: &[String]) -> Result<String, Error> {
    serde_json::to_string(redirects).map_err(|e| Error::InvalidInput(format!("unencodable redirects: {e}")))
}

impl SqliteStore {
    /// Get a record by its normalized URL.
    ///
    /// Returns None if the URL has never been stored.
    pub async fn find_by_url(&self, url: &str) -> Result<Option<UrlRecord>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<UrlRecord>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM url_records WHERE url = ?1"))?;
                match stmt.query_row(params![url], read_row) {
                    Ok(row) => Ok(Some(UrlRecord::try_from(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Every record, oldest first.
    pub async fn find_all(&self) -> Result<Vec<UrlRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<UrlRecord>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM url_records ORDER BY id ASC"))?;
                let rows = stmt.query_map([], read_row)?;
                let records = rows.map(|row| UrlRecord::try_from(row?)).collect::<Result<Vec<_>, Error>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// Records whose `updated_at` is strictly before `cutoff`, least recently updated first.
    pub async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<UrlRecord>, Error> {
        let cutoff = format_timestamp(&cutoff);
        self.conn
            .call(move |conn| -> Result<Vec<UrlRecord>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM url_records WHERE updated_at < ?1 ORDER BY updated_at ASC"
                ))?;
                let rows = stmt.query_map(params![cutoff], read_row)?;
                let records = rows.map(|row| UrlRecord::try_from(row?)).collect::<Result<Vec<_>, Error>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a new record. Fails if the URL already has one.
    pub async fn insert_record(&self, record: NewUrlRecord) -> Result<UrlRecord, Error> {
        let now = format_timestamp(&Utc::now());
        let redirects_json = encode_redirects(&record.redirects)?;
        let cols = StateColumns::from(&record.state);

        self.conn
            .call(move |conn| -> Result<UrlRecord, Error> {
                conn.execute(
                    "INSERT INTO url_records (
                        url, status, error_message, redirects_json, content_id,
                        content_type, content_length, final_url, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![
                        &record.url,
                        cols.status,
                        &cols.error_message,
                        &redirects_json,
                        &cols.content_id,
                        &cols.content_type,
                        &cols.content_length,
                        &cols.final_url,
                        &now,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                select_by_id(conn, id)?.ok_or_else(|| Error::NotFound(format!("record {id} vanished after insert")))
            })
            .await
            .map_err(Error::from)
    }

    /// Write a record's state and redirects back, refreshing `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the clock does.
    pub async fn save_record(&self, record: &UrlRecord) -> Result<UrlRecord, Error> {
        let id = record.id;
        let now = format_timestamp(&Utc::now());
        let redirects_json = encode_redirects(&record.redirects)?;
        let cols = StateColumns::from(&record.state);

        self.conn
            .call(move |conn| -> Result<UrlRecord, Error> {
                let changed = conn.execute(
                    "UPDATE url_records SET
                        status = ?2,
                        error_message = ?3,
                        redirects_json = ?4,
                        content_id = ?5,
                        content_type = ?6,
                        content_length = ?7,
                        final_url = ?8,
                        updated_at = MAX(updated_at, ?9)
                    WHERE id = ?1",
                    params![
                        id,
                        cols.status,
                        &cols.error_message,
                        &redirects_json,
                        &cols.content_id,
                        &cols.content_type,
                        &cols.content_length,
                        &cols.final_url,
                        &now,
                    ],
                )?;
                if changed == 0 {
                    return Err(Error::NotFound(format!("record {id}")));
                }
                select_by_id(conn, id)?.ok_or_else(|| Error::NotFound(format!("record {id}")))
            })
            .await
            .map_err(Error::from)
    }
}
