//! # Album Tree Reconciliation
//!
//! Maps directories to album records. An album's id is derived from its
//! canonical path, so reconciling the same folder always resolves to the same
//! album. Missing albums are created with the directory's base name and the
//! parent directory's album as parent; existing albums are left untouched.
//! Albums whose directory disappeared are never deleted here.

use crate::{Result, SyncError};
use core_library::models::{parent_album_path, Album, ROOT_ALBUM_PATH};
use core_library::repositories::AlbumRepository;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of reconciling one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// A new album was created
    Created(Album),
    /// The album already existed
    Existing(Album),
}

impl Reconciled {
    pub fn album(&self) -> &Album {
        match self {
            Reconciled::Created(album) | Reconciled::Existing(album) => album,
        }
    }

    pub fn into_album(self) -> Album {
        match self {
            Reconciled::Created(album) | Reconciled::Existing(album) => album,
        }
    }
}

/// Per-job reconciler; caches albums it has resolved
pub struct AlbumTreeReconciler {
    albums: Arc<dyn AlbumRepository>,
    root_album_name: String,
    event_bus: EventBus,
    resolved: HashMap<String, Album>,
}

impl AlbumTreeReconciler {
    pub fn new(
        albums: Arc<dyn AlbumRepository>,
        root_album_name: impl Into<String>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            albums,
            root_album_name: root_album_name.into(),
            event_bus,
            resolved: HashMap::new(),
        }
    }

    /// Reconcile the root album and every ancestor of `album_path`, then the
    /// album itself
    ///
    /// Used at job start so the sync root's album chain exists before the
    /// walk is processed.
    pub async fn ensure_path(&mut self, album_path: &str) -> Result<Album> {
        let mut album = self.reconcile(ROOT_ALBUM_PATH).await?.into_album();

        let mut prefix = String::new();
        for segment in album_path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            album = self.reconcile(&prefix).await?.into_album();
        }

        Ok(album)
    }

    /// Reconcile the directory mapped to `album_path`
    ///
    /// # Errors
    ///
    /// Returns an error if the parent album cannot be resolved or the store
    /// rejects the write.
    pub async fn reconcile(&mut self, album_path: &str) -> Result<Reconciled> {
        let candidate = match parent_album_path(album_path) {
            None => Album::root(self.root_album_name.clone()),
            Some(parent_path) => {
                let parent = self.album_for(&parent_path).await?;
                let name = album_path.rsplit('/').next().unwrap_or(album_path);
                Album::child_of(&parent, name)
            }
        };

        let outcome = if self.albums.insert_if_missing(&candidate).await? {
            debug!(path = %candidate.path, "Created album");
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::AlbumCreated {
                    album_id: candidate.id.clone(),
                    path: candidate.path.clone(),
                }))
                .ok();
            Reconciled::Created(candidate)
        } else {
            let existing = self
                .albums
                .find_by_path(&candidate.path)
                .await?
                .ok_or_else(|| {
                    SyncError::Storage(format!("Album {} vanished during sync", candidate.path))
                })?;
            Reconciled::Existing(existing)
        };

        self.resolved
            .insert(album_path.to_string(), outcome.album().clone());
        Ok(outcome)
    }

    /// Album for `album_path`, from this job's cache or the store
    pub async fn album_for(&mut self, album_path: &str) -> Result<Album> {
        if let Some(album) = self.resolved.get(album_path) {
            return Ok(album.clone());
        }

        let album = self
            .albums
            .find_by_path(album_path)
            .await?
            .ok_or_else(|| SyncError::Ingestion(format!("Album {} is not available", album_path)))?;

        self.resolved.insert(album_path.to_string(), album.clone());
        Ok(album)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::db::create_test_pool;
    use core_library::models::AlbumId;
    use core_library::repositories::SqliteAlbumRepository;

    async fn setup() -> (Arc<SqliteAlbumRepository>, AlbumTreeReconciler) {
        let pool = create_test_pool().await.unwrap();
        let albums = Arc::new(SqliteAlbumRepository::new(pool));
        let reconciler = AlbumTreeReconciler::new(albums.clone(), "Library", EventBus::new(16));
        (albums, reconciler)
    }

    #[tokio::test]
    async fn test_ensure_path_creates_chain() {
        let (albums, mut reconciler) = setup().await;

        let album = reconciler.ensure_path("/trip/day-1").await.unwrap();

        assert_eq!(album.path, "/trip/day-1");
        assert_eq!(album.name, "day-1");
        assert_eq!(album.id, AlbumId::from_path("/trip/day-1").to_string());
        assert_eq!(albums.count().await.unwrap(), 3);

        let trip = albums.find_by_path("/trip").await.unwrap().unwrap();
        assert_eq!(album.parent_id.as_deref(), Some(trip.id.as_str()));
        let root = albums.find_by_path("/").await.unwrap().unwrap();
        assert_eq!(root.name, "Library");
        assert_eq!(root.parent_id, None);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (albums, mut reconciler) = setup().await;
        reconciler.ensure_path("/").await.unwrap();

        let first = reconciler.reconcile("/sub").await.unwrap();
        assert!(matches!(first, Reconciled::Created(_)));

        let mut rerun = AlbumTreeReconciler::new(albums.clone(), "Library", EventBus::new(16));
        let second = rerun.reconcile("/sub").await.unwrap();
        assert!(matches!(second, Reconciled::Existing(_)));
        assert_eq!(first.album().id, second.album().id);
        assert_eq!(albums.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_existing_album_is_left_untouched() {
        let (albums, mut reconciler) = setup().await;
        reconciler.ensure_path("/sub").await.unwrap();

        let mut edited = albums.find_by_path("/sub").await.unwrap().unwrap();
        edited.description = Some("kept".to_string());
        albums.update(&edited).await.unwrap();

        let again = reconciler.reconcile("/sub").await.unwrap();
        assert_eq!(again.album().description.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_reconcile_without_parent_fails() {
        let (_albums, mut reconciler) = setup().await;
        let result = reconciler.reconcile("/a/b").await;
        assert!(matches!(result, Err(SyncError::Ingestion(_))));
    }

    #[tokio::test]
    async fn test_album_created_event() {
        let pool = create_test_pool().await.unwrap();
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let mut reconciler =
            AlbumTreeReconciler::new(Arc::new(SqliteAlbumRepository::new(pool)), "Library", bus);

        reconciler.ensure_path("/trip").await.unwrap();

        let mut created = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CoreEvent::Library(LibraryEvent::AlbumCreated { path, .. }) = event {
                created.push(path);
            }
        }
        assert_eq!(created, vec!["/".to_string(), "/trip".to_string()]);
    }
}
