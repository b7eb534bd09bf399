//! Core service façade and bootstrap helpers.
//!
//! This crate wires the configured stores into the gallery core and exposes
//! the operations host applications call: submitting and controlling sync
//! jobs, browsing albums and media, reading original bytes and deleting
//! albums. Desktop hosts enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) to get a filesystem byte store from `blob_dir`; other
//! hosts inject their own [`BlobStore`] through the configuration.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::{BlobStore, Clock, SystemClock};
use bytes::Bytes;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::models::{Album, Media};
use core_library::repositories::{
    AlbumRepository, MediaRepository, SqliteAlbumRepository, SqliteMediaRepository,
};
use core_runtime::config::{DatabaseLocation, GalleryConfig};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, Receiver};
use core_sync::{JobId, JobScheduler, JobSnapshot, JobStatus, SyncConfig};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct GalleryService {
    pool: SqlitePool,
    albums: Arc<dyn AlbumRepository>,
    media: Arc<dyn MediaRepository>,
    blobs: Arc<dyn BlobStore>,
    scheduler: JobScheduler,
    events: EventBus,
}

impl GalleryService {
    /// Open the stores described by `config` and start the scheduler.
    ///
    /// ```ignore
    /// let config = GalleryConfig::builder()
    ///     .library_root("/srv/photos")
    ///     .database_path("/var/lib/gallery/gallery.db")
    ///     .blob_dir("/var/lib/gallery/blobs")
    ///     .build()?;
    /// let gallery = GalleryService::bootstrap(config).await?;
    /// let job_id = gallery.start_sync("2023/trip").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the database cannot be opened
    /// or migrated, no byte store is available or the library root is not a
    /// directory.
    pub async fn bootstrap(config: GalleryConfig) -> Result<Self> {
        config.validate()?;

        let database = match &config.database {
            DatabaseLocation::File(path) => DatabaseConfig::new(path),
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(database).await?;

        let blobs = resolve_blob_store(&config)?;
        let clock: Arc<dyn Clock> = config.clock.clone().unwrap_or_else(|| Arc::new(SystemClock));
        let events = EventBus::new(config.event_buffer_size);

        let albums: Arc<dyn AlbumRepository> = Arc::new(SqliteAlbumRepository::new(pool.clone()));
        let media: Arc<dyn MediaRepository> = Arc::new(SqliteMediaRepository::new(pool.clone()));

        let scheduler = JobScheduler::new(
            SyncConfig::from(&config),
            albums.clone(),
            media.clone(),
            blobs.clone(),
            clock,
            events.clone(),
        )?;

        info!(library_root = %scheduler.library_root().display(), "Gallery core ready");

        Ok(Self {
            pool,
            albums,
            media,
            blobs,
            scheduler,
            events,
        })
    }

    // ========================================================================
    // Jobs
    // ========================================================================

    /// Submit a sync of `path` (absolute, or relative to the library root).
    pub async fn start_sync(&self, path: impl AsRef<Path>) -> Result<JobId> {
        Ok(self.scheduler.start_sync(path).await?)
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<JobSnapshot> {
        Ok(self.scheduler.get_job(job_id).await?)
    }

    pub async fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.scheduler.list_jobs().await
    }

    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Vec<JobSnapshot> {
        self.scheduler.list_jobs_by_status(status).await
    }

    /// Toggle pause; returns whether the job is now set to pause.
    pub async fn pause_job(&self, job_id: JobId) -> Result<bool> {
        Ok(self.scheduler.pause_job(job_id).await?)
    }

    pub async fn resume_job(&self, job_id: JobId) -> Result<()> {
        Ok(self.scheduler.resume_job(job_id).await?)
    }

    pub async fn stop_job(&self, job_id: JobId) -> Result<()> {
        Ok(self.scheduler.stop_job(job_id).await?)
    }

    pub async fn stop_all_jobs(&self) -> usize {
        self.scheduler.stop_all_jobs().await
    }

    pub async fn clear_finished_jobs(&self) -> usize {
        self.scheduler.clear_finished_jobs().await
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait_for_job(&self, job_id: JobId) -> Result<JobSnapshot> {
        Ok(self.scheduler.wait_for_job(job_id).await?)
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Every album, ordered by path.
    pub async fn list_albums(&self) -> Result<Vec<Album>> {
        Ok(self.albums.list_all().await?)
    }

    pub async fn get_album(&self, album_id: &str) -> Result<Album> {
        self.albums
            .find_by_id(album_id)
            .await?
            .ok_or_else(|| not_found("album", album_id))
    }

    pub async fn list_album_children(&self, album_id: &str) -> Result<Vec<Album>> {
        Ok(self.albums.list_children(album_id).await?)
    }

    /// Media of one album, ordered by capture time.
    pub async fn list_media_in_album(&self, album_id: &str) -> Result<Vec<Media>> {
        Ok(self.media.list_by_album(album_id).await?)
    }

    pub async fn get_media(&self, media_id: &str) -> Result<Media> {
        self.media
            .find_by_id(media_id)
            .await?
            .ok_or_else(|| not_found("media", media_id))
    }

    /// Original bytes of a media item.
    pub async fn read_media_bytes(&self, media_id: &str) -> Result<Bytes> {
        let media = self.get_media(media_id).await?;
        Ok(self.blobs.read(&media.blob_key).await?)
    }

    /// Stream the original bytes of a media item.
    pub async fn open_media_stream(
        &self,
        media_id: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let media = self.get_media(media_id).await?;
        Ok(self.blobs.open_read_stream(&media.blob_key).await?)
    }

    /// Delete an album, its descendants and their media.
    ///
    /// Records are removed first through the store's cascade; original
    /// bytes are then deleted best-effort. A blob that cannot be deleted is
    /// logged and left behind. Returns the number of media removed.
    ///
    /// # Errors
    ///
    /// Returns [`core_sync::SyncError::OverlappingJob`] while an active job
    /// covers the album's directory. New syncs wait until the records are
    /// gone.
    #[instrument(skip(self))]
    pub async fn delete_album(&self, album_id: &str) -> Result<usize> {
        let album = self.get_album(album_id).await?;

        let keys = {
            let _guard = self.scheduler.hold_album_tree(&album.path).await?;
            let keys = self.media.blob_keys_in_tree(&album).await?;
            if !self.albums.delete(&album.id).await? {
                return Err(not_found("album", album_id));
            }
            keys
        };

        for key in &keys {
            if let Err(e) = self.blobs.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete blob");
            }
        }

        info!(path = %album.path, media = keys.len(), "Album deleted");
        self.events
            .emit(CoreEvent::Library(LibraryEvent::AlbumDeleted {
                album_id: album.id,
                path: album.path,
            }))
            .ok();

        Ok(keys.len())
    }

    // ========================================================================
    // Events & Lifecycle
    // ========================================================================

    /// Subscribe to job and library events.
    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Stop every active job, wait for the workers to finish and close the
    /// database.
    pub async fn shutdown(&self) {
        self.scheduler.stop_all_jobs().await;
        for job in self.scheduler.list_jobs().await {
            if job.status.is_active() {
                if let Ok(id) = JobId::from_string(&job.id) {
                    self.scheduler.wait_for_job(id).await.ok();
                }
            }
        }
        self.pool.close().await;
        info!("Gallery core shut down");
    }
}

fn not_found(entity_type: &str, id: &str) -> CoreError {
    CoreError::NotFound {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
    }
}

fn resolve_blob_store(config: &GalleryConfig) -> Result<Arc<dyn BlobStore>> {
    if let Some(store) = &config.blob_store {
        return Ok(store.clone());
    }

    #[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
    if let Some(dir) = &config.blob_dir {
        return Ok(Arc::new(bridge_desktop::LocalBlobStore::new(dir.clone())));
    }

    Err(CoreError::CapabilityMissing {
        capability: "BlobStore".to_string(),
        message: "inject a blob store or enable desktop-shims with a blob_dir".to_string(),
    })
}
