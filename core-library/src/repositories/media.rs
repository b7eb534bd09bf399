//! Media repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Album, CaptureSource, Media, MediaKind, ROOT_ALBUM_PATH};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};
use std::collections::BTreeMap;

/// Media repository interface for data access operations
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Find a media record by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Media>>;

    /// Find the media record for `filename` inside an album
    async fn find_by_album_and_filename(
        &self,
        album_id: &str,
        filename: &str,
    ) -> Result<Option<Media>>;

    /// Insert or overwrite a media record
    ///
    /// Runs in one transaction: the media row is written, then the owning
    /// album's cover is pointed at it if the album has none yet.
    ///
    /// # Returns
    /// `Ok(true)` if the media became the album cover
    async fn upsert(&self, media: &Media) -> Result<bool>;

    /// List media in an album ordered by capture time, then filename
    async fn list_by_album(&self, album_id: &str) -> Result<Vec<Media>>;

    /// Blob keys of every media record in `album` and its descendants
    async fn blob_keys_in_tree(&self, album: &Album) -> Result<Vec<String>>;

    /// Delete a media record by ID
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Count total media records
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of MediaRepository
pub struct SqliteMediaRepository {
    pool: SqlitePool,
}

impl SqliteMediaRepository {
    /// Create a new SqliteMediaRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a media record
#[derive(Debug, FromRow)]
struct MediaRow {
    id: String,
    album_id: String,
    filename: String,
    content_hash: String,
    kind: String,
    captured_at: i64,
    captured_at_source: String,
    width: Option<i64>,
    height: Option<i64>,
    size_bytes: i64,
    thumbnail: Vec<u8>,
    metadata: String,
    blob_key: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<MediaRow> for Media {
    type Error = LibraryError;

    fn try_from(row: MediaRow) -> Result<Self> {
        let kind: MediaKind = row.kind.parse().map_err(|e| LibraryError::InvalidInput {
            field: "kind".to_string(),
            message: e,
        })?;
        let captured_at_source: CaptureSource =
            row.captured_at_source
                .parse()
                .map_err(|e| LibraryError::InvalidInput {
                    field: "captured_at_source".to_string(),
                    message: e,
                })?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&row.metadata)?;

        Ok(Media {
            id: row.id,
            album_id: row.album_id,
            filename: row.filename,
            content_hash: row.content_hash,
            kind,
            captured_at: row.captured_at,
            captured_at_source,
            width: row.width.map(|w| w as u32),
            height: row.height.map(|h| h as u32),
            size_bytes: row.size_bytes,
            thumbnail: row.thumbnail,
            metadata,
            blob_key: row.blob_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl MediaRepository for SqliteMediaRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Media>> {
        let row = query_as::<_, MediaRow>("SELECT * FROM media WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Media::try_from).transpose()
    }

    async fn find_by_album_and_filename(
        &self,
        album_id: &str,
        filename: &str,
    ) -> Result<Option<Media>> {
        let row =
            query_as::<_, MediaRow>("SELECT * FROM media WHERE album_id = ? AND filename = ?")
                .bind(album_id)
                .bind(filename)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Media::try_from).transpose()
    }

    async fn upsert(&self, media: &Media) -> Result<bool> {
        media.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Media".to_string(),
            message: e,
        })?;

        let metadata = serde_json::to_string(&media.metadata)?;

        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO media (
                id, album_id, filename, content_hash, kind,
                captured_at, captured_at_source, width, height, size_bytes,
                thumbnail, metadata, blob_key, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(album_id, filename) DO UPDATE SET
                content_hash = excluded.content_hash,
                kind = excluded.kind,
                captured_at = excluded.captured_at,
                captured_at_source = excluded.captured_at_source,
                width = excluded.width,
                height = excluded.height,
                size_bytes = excluded.size_bytes,
                thumbnail = excluded.thumbnail,
                metadata = excluded.metadata,
                blob_key = excluded.blob_key,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&media.id)
        .bind(&media.album_id)
        .bind(&media.filename)
        .bind(&media.content_hash)
        .bind(media.kind.as_str())
        .bind(media.captured_at)
        .bind(media.captured_at_source.as_str())
        .bind(media.width.map(i64::from))
        .bind(media.height.map(i64::from))
        .bind(media.size_bytes)
        .bind(&media.thumbnail)
        .bind(metadata)
        .bind(&media.blob_key)
        .bind(media.created_at)
        .bind(media.updated_at)
        .execute(&mut *tx)
        .await?;

        let cover = query(
            r#"
            UPDATE albums
            SET thumbnail_media_id = ?, updated_at = ?
            WHERE id = ? AND thumbnail_media_id IS NULL
            "#,
        )
        .bind(&media.id)
        .bind(media.updated_at)
        .bind(&media.album_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cover.rows_affected() > 0)
    }

    async fn list_by_album(&self, album_id: &str) -> Result<Vec<Media>> {
        let rows = query_as::<_, MediaRow>(
            "SELECT * FROM media WHERE album_id = ? ORDER BY captured_at ASC, filename ASC",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Media::try_from).collect()
    }

    async fn blob_keys_in_tree(&self, album: &Album) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = if album.path == ROOT_ALBUM_PATH {
            query_as("SELECT blob_key FROM media ORDER BY blob_key")
                .fetch_all(&self.pool)
                .await?
        } else {
            query_as(
                r#"
                SELECT m.blob_key FROM media m
                JOIN albums a ON a.id = m.album_id
                WHERE a.path = ? OR substr(a.path, 1, ?) = ?
                ORDER BY m.blob_key
                "#,
            )
            .bind(&album.path)
            .bind(album.path.len() as i64 + 1)
            .bind(format!("{}/", album.path))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM media")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
