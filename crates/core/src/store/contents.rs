//! Content blob persistence.

use super::connection::SqliteStore;
use super::records::parse_timestamp;
use crate::Error;
use crate::model::{ContentBlob, ContentId, checksum, format_timestamp};
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn read_blob(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn into_blob(
    (id, url, content, checksum, created_at, updated_at): (i64, String, String, String, String, String),
) -> Result<ContentBlob, Error> {
    Ok(ContentBlob {
        id: ContentId(id),
        url,
        content,
        checksum,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn select_one(
    conn: &rusqlite::Connection, clause: &str, key: &dyn rusqlite::ToSql,
) -> Result<Option<ContentBlob>, Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, url, content, checksum, created_at, updated_at FROM contents WHERE {clause} = ?1"
    ))?;
    match stmt.query_row([key], read_blob) {
        Ok(row) => Ok(Some(into_blob(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl SqliteStore {
    /// Store the body fetched for `url` and return the blob with its identity.
    ///
    /// Uses UPSERT semantics on the URL, so a URL never ends up with two
    /// blobs; an existing blob keeps its id and gets the new body.
    pub async fn insert_content(&self, url: &str, content: &str) -> Result<ContentBlob, Error> {
        let url = url.to_string();
        let content = content.to_string();
        let sum = checksum(&content);
        let now = format_timestamp(&Utc::now());

        self.conn
            .call(move |conn| -> Result<ContentBlob, Error> {
                conn.execute(
                    "INSERT INTO contents (url, content, checksum, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?4)
                    ON CONFLICT(url) DO UPDATE SET
                        content = excluded.content,
                        checksum = excluded.checksum,
                        updated_at = MAX(contents.updated_at, excluded.updated_at)",
                    params![&url, &content, &sum, &now],
                )?;
                select_one(conn, "url", &url)?.ok_or_else(|| Error::NotFound(format!("content for {url}")))
            })
            .await
            .map_err(Error::from)
    }

    /// Get the blob stored for a URL.
    pub async fn find_content_by_url(&self, url: &str) -> Result<Option<ContentBlob>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ContentBlob>, Error> { select_one(conn, "url", &url) })
            .await
            .map_err(Error::from)
    }

    /// Resolve a record's content reference.
    pub async fn find_content(&self, id: ContentId) -> Result<Option<ContentBlob>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<ContentBlob>, Error> { select_one(conn, "id", &id.0) })
            .await
            .map_err(Error::from)
    }

    /// Overwrite a blob's body in place.
    pub async fn save_content(&self, blob: &ContentBlob) -> Result<ContentBlob, Error> {
        let id = blob.id.0;
        let content = blob.content.clone();
        let sum = checksum(&content);
        let now = format_timestamp(&Utc::now());

        self.conn
            .call(move |conn| -> Result<ContentBlob, Error> {
                let changed = conn.execute(
                    "UPDATE contents SET content = ?2, checksum = ?3, updated_at = MAX(updated_at, ?4)
                    WHERE id = ?1",
                    params![id, &content, &sum, &now],
                )?;
                if changed == 0 {
                    return Err(Error::NotFound(format!("content {id}")));
                }
                select_one(conn, "id", &id)?.ok_or_else(|| Error::NotFound(format!("content {id}")))
            })
            .await
            .map_err(Error::from)
    }
}
