//! # Media Ingestion
//!
//! Per-file pipeline turning a file into a persisted media record:
//!
//! 1. Read the bytes and hash them
//! 2. Skip when the album already holds the same file with the same hash
//! 3. Decode, thumbnail and extract metadata (photos only)
//! 4. Resolve the capture time, falling back to the file modification time
//! 5. Write the original bytes to the blob store
//! 6. Upsert the media record (and claim the album cover) in one transaction
//!
//! The blob write always precedes the record write. A crash between the two
//! leaves an orphaned blob, never a record pointing at missing bytes.

use crate::{Result, SyncError};
use bridge_traits::{BlobStore, Clock};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_library::models::{Album, AlbumId, CaptureSource, Media, MediaId, MediaKind};
use core_library::repositories::MediaRepository;
use core_metadata::{ContentHasher, MetadataExtractor, ThumbnailEncoder};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Annotation recorded when the capture time comes from the filesystem
pub const MTIME_FALLBACK_WARNING: &str = "capture time taken from file modification time";

/// How ingesting one file ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The stored record already has this content
    Unchanged,
    /// A record was created or replaced
    Ingested {
        media_id: String,
        warnings: Vec<String>,
    },
}

/// Output of the CPU-bound stage
struct Prepared {
    thumbnail: Vec<u8>,
    width: Option<u32>,
    height: Option<u32>,
    metadata: BTreeMap<String, String>,
    captured_at: Option<DateTime<Utc>>,
}

/// Runs the ingestion pipeline against both stores
pub struct MediaIngestor {
    media: Arc<dyn MediaRepository>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    hasher: ContentHasher,
    encoder: ThumbnailEncoder,
    extractor: MetadataExtractor,
}

impl MediaIngestor {
    pub fn new(
        media: Arc<dyn MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        encoder: ThumbnailEncoder,
    ) -> Self {
        Self {
            media,
            blobs,
            clock,
            event_bus,
            hasher: ContentHasher::new(),
            encoder,
            extractor: MetadataExtractor::new(),
        }
    }

    /// Ingest the file at `path` into `album`
    ///
    /// # Errors
    ///
    /// Any failure aborts this file only; the caller records it and moves on.
    pub async fn ingest(&self, path: &Path, album: &Album, kind: MediaKind) -> Result<IngestOutcome> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SyncError::Ingestion(format!("Invalid file name: {:?}", path)))?
            .to_string();

        let file_meta = tokio::fs::metadata(path).await?;
        let data = Bytes::from(tokio::fs::read(path).await?);

        let hasher = self.hasher;
        let hash_input = data.clone();
        let content_hash = tokio::task::spawn_blocking(move || hasher.hash(&hash_input))
            .await
            .map_err(|e| SyncError::Ingestion(format!("Hash task failed: {}", e)))?;

        let existing = self
            .media
            .find_by_album_and_filename(&album.id, &filename)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        if existing
            .as_ref()
            .is_some_and(|m| m.content_hash == content_hash)
        {
            debug!(file = %filename, "Unchanged, skipping");
            return Ok(IngestOutcome::Unchanged);
        }

        let prepared = self.prepare(data.clone(), kind).await?;

        let mut warnings = Vec::new();
        let (captured_at, captured_at_source) = match prepared.captured_at {
            Some(ts) => (ts.timestamp(), CaptureSource::Metadata),
            None => {
                warn!(file = %filename, "No capture time in metadata, using mtime");
                warnings.push(MTIME_FALLBACK_WARNING.to_string());
                let mtime = file_meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or_else(|| self.clock.unix_timestamp());
                (mtime, CaptureSource::FileModified)
            }
        };

        let blob_key = blob_key(&album.path, &filename);
        self.blobs
            .write(&blob_key, data.clone())
            .await
            .map_err(|e| SyncError::Storage(format!("Blob write failed: {}", e)))?;

        let now = self.clock.unix_timestamp();
        let media_id = MediaId::for_file(&AlbumId::from_path(&album.path), &filename).to_string();
        let record = Media {
            id: media_id.clone(),
            album_id: album.id.clone(),
            filename: filename.clone(),
            content_hash,
            kind,
            captured_at,
            captured_at_source,
            width: prepared.width,
            height: prepared.height,
            size_bytes: data.len() as i64,
            thumbnail: prepared.thumbnail,
            metadata: prepared.metadata,
            blob_key,
            created_at: existing.as_ref().map_or(now, |m| m.created_at),
            updated_at: now,
        };

        let became_cover = self
            .media
            .upsert(&record)
            .await
            .map_err(|e| SyncError::Storage(format!("Record write failed: {}", e)))?;

        debug!(file = %filename, album = %album.path, became_cover, "Ingested");

        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::MediaIngested {
                media_id: media_id.clone(),
                album_id: album.id.clone(),
                filename,
            }))
            .ok();

        Ok(IngestOutcome::Ingested { media_id, warnings })
    }

    /// Thumbnail and metadata on a blocking thread
    async fn prepare(&self, data: Bytes, kind: MediaKind) -> Result<Prepared> {
        let encoder = self.encoder;
        let extractor = self.extractor;

        tokio::task::spawn_blocking(move || -> Result<Prepared> {
            match kind {
                MediaKind::Photo => {
                    let extracted = extractor.extract(&data);
                    let thumb = encoder.encode(&data, extracted.orientation)?;
                    Ok(Prepared {
                        thumbnail: thumb.bytes,
                        width: Some(thumb.width),
                        height: Some(thumb.height),
                        metadata: extracted.fields,
                        captured_at: extracted.captured_at,
                    })
                }
                MediaKind::Video => Ok(Prepared {
                    thumbnail: encoder.placeholder()?,
                    width: None,
                    height: None,
                    metadata: BTreeMap::new(),
                    captured_at: None,
                }),
            }
        })
        .await
        .map_err(|e| SyncError::Ingestion(format!("Thumbnail task failed: {}", e)))?
    }
}

/// Blob store key for `filename` in the album at `album_path`
pub fn blob_key(album_path: &str, filename: &str) -> String {
    let dir = album_path.trim_start_matches('/');
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key() {
        assert_eq!(blob_key("/", "a.jpg"), "a.jpg");
        assert_eq!(blob_key("/trip", "a.jpg"), "trip/a.jpg");
        assert_eq!(blob_key("/trip/day-1", "a.jpg"), "trip/day-1/a.jpg");
    }
}
