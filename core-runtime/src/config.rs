//! # Core Configuration Module
//!
//! Provides configuration management for the gallery core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`GalleryConfig`] holding the library root, storage locations, worker pool
//! size and thumbnail settings. It enforces fail-fast validation so an invalid
//! setup is rejected before any job can be scheduled.
//!
//! ## Required Settings
//!
//! - `library_root` - The directory tree that sync jobs are confined to
//! - `database_path` - SQLite file (or `in_memory_database()` for tests)
//! - `blob_dir` - Byte store root, unless a [`BlobStore`] is injected
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::GalleryConfig;
//!
//! let config = GalleryConfig::builder()
//!     .library_root("/srv/photos")
//!     .database_path("/var/lib/gallery/gallery.db")
//!     .blob_dir("/var/lib/gallery/blobs")
//!     .worker_pool_size(4)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::GalleryConfig;
//!
//! // Missing library root
//! let config = GalleryConfig::builder()
//!     .database_path("/tmp/gallery.db")
//!     .blob_dir("/tmp/blobs")
//!     .build()
//!     .expect("Should fail - library root is required");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{BlobStore, Clock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of jobs allowed to run at the same time.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 2;

/// Default bound for the long edge of generated thumbnails, in pixels.
pub const DEFAULT_THUMBNAIL_MAX_EDGE: u32 = 512;

/// Default JPEG quality for generated thumbnails.
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 75;

/// Default display name of the album mapped to the library root.
pub const DEFAULT_ROOT_ALBUM_NAME: &str = "Library";

const MIN_THUMBNAIL_EDGE: u32 = 16;
const MAX_THUMBNAIL_EDGE: u32 = 4096;
const MAX_WORKER_POOL_SIZE: usize = 64;

/// Where the relational store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite database file, created if missing
    File(PathBuf),
    /// Private in-memory database, discarded on shutdown
    InMemory,
}

/// Gallery core configuration.
///
/// Use [`GalleryConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct GalleryConfig {
    /// Directory tree sync jobs are confined to
    pub library_root: PathBuf,

    /// Relational store location
    pub database: DatabaseLocation,

    /// Root directory of the desktop byte store
    pub blob_dir: Option<PathBuf>,

    /// Host-provided byte store, overriding `blob_dir`
    pub blob_store: Option<Arc<dyn BlobStore>>,

    /// Host-provided clock (defaults to system time)
    pub clock: Option<Arc<dyn Clock>>,

    /// Maximum number of jobs running at once
    pub worker_pool_size: usize,

    /// Long-edge bound for thumbnails, in pixels
    pub thumbnail_max_edge: u32,

    /// JPEG quality used when re-encoding thumbnails (1-100)
    pub thumbnail_quality: u8,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    /// Display name of the root album
    pub root_album_name: String,
}

impl std::fmt::Debug for GalleryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryConfig")
            .field("library_root", &self.library_root)
            .field("database", &self.database)
            .field("blob_dir", &self.blob_dir)
            .field(
                "blob_store",
                &self.blob_store.as_ref().map(|_| "BlobStore { ... }"),
            )
            .field("clock", &self.clock.as_ref().map(|_| "Clock { ... }"))
            .field("worker_pool_size", &self.worker_pool_size)
            .field("thumbnail_max_edge", &self.thumbnail_max_edge)
            .field("thumbnail_quality", &self.thumbnail_quality)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("root_album_name", &self.root_album_name)
            .finish()
    }
}

impl GalleryConfig {
    /// Create a new configuration builder
    pub fn builder() -> GalleryConfigBuilder {
        GalleryConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.library_root.as_os_str().is_empty() {
            return Err(Error::Config("Library root cannot be empty".to_string()));
        }

        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        match (&self.blob_store, &self.blob_dir) {
            (None, None) => {
                return Err(Error::Config(
                    "Blob directory is required unless a BlobStore is injected. \
                     Use .blob_dir() or .blob_store() to set it."
                        .to_string(),
                ))
            }
            (None, Some(dir)) if dir.as_os_str().is_empty() => {
                return Err(Error::Config("Blob directory cannot be empty".to_string()))
            }
            _ => {}
        }

        if self.worker_pool_size == 0 {
            return Err(Error::Config(
                "Worker pool size must be at least 1".to_string(),
            ));
        }

        if self.worker_pool_size > MAX_WORKER_POOL_SIZE {
            return Err(Error::Config(format!(
                "Worker pool size exceeds maximum of {}",
                MAX_WORKER_POOL_SIZE
            )));
        }

        if !(MIN_THUMBNAIL_EDGE..=MAX_THUMBNAIL_EDGE).contains(&self.thumbnail_max_edge) {
            return Err(Error::Config(format!(
                "Thumbnail edge must be between {} and {} pixels, got {}",
                MIN_THUMBNAIL_EDGE, MAX_THUMBNAIL_EDGE, self.thumbnail_max_edge
            )));
        }

        if !(1..=100).contains(&self.thumbnail_quality) {
            return Err(Error::Config(format!(
                "Thumbnail quality must be between 1 and 100, got {}",
                self.thumbnail_quality
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        if self.root_album_name.trim().is_empty() {
            return Err(Error::Config(
                "Root album name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Library root directory
    pub fn library_root(&self) -> &Path {
        &self.library_root
    }
}

/// Builder for [`GalleryConfig`].
#[derive(Default)]
pub struct GalleryConfigBuilder {
    library_root: Option<PathBuf>,
    database: Option<DatabaseLocation>,
    blob_dir: Option<PathBuf>,
    blob_store: Option<Arc<dyn BlobStore>>,
    clock: Option<Arc<dyn Clock>>,
    worker_pool_size: Option<usize>,
    thumbnail_max_edge: Option<u32>,
    thumbnail_quality: Option<u8>,
    event_buffer_size: Option<usize>,
    root_album_name: Option<String>,
}

impl GalleryConfigBuilder {
    /// Set the directory tree sync jobs are confined to (required)
    pub fn library_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_root = Some(path.into());
        self
    }

    /// Store the library in a SQLite file (required unless in-memory)
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Store the library in a private in-memory database
    pub fn in_memory_database(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Root directory of the desktop byte store
    pub fn blob_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.blob_dir = Some(path.into());
        self
    }

    /// Inject a host byte store
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Inject a host clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Maximum number of jobs running at once (default: 2)
    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = Some(size);
        self
    }

    /// Long-edge bound for thumbnails in pixels (default: 512)
    pub fn thumbnail_max_edge(mut self, edge: u32) -> Self {
        self.thumbnail_max_edge = Some(edge);
        self
    }

    /// JPEG quality for thumbnails (default: 75)
    pub fn thumbnail_quality(mut self, quality: u8) -> Self {
        self.thumbnail_quality = Some(quality);
        self
    }

    /// Event bus buffer size (default: 256)
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Display name of the root album (default: "Library")
    pub fn root_album_name(mut self, name: impl Into<String>) -> Self {
        self.root_album_name = Some(name.into());
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required setting is missing or a value
    /// is out of range.
    pub fn build(self) -> Result<GalleryConfig> {
        let library_root = self.library_root.ok_or_else(|| {
            Error::Config("Library root is required. Use .library_root() to set it.".to_string())
        })?;

        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or \
                 .in_memory_database() to set it."
                    .to_string(),
            )
        })?;

        let config = GalleryConfig {
            library_root,
            database,
            blob_dir: self.blob_dir,
            blob_store: self.blob_store,
            clock: self.clock,
            worker_pool_size: self.worker_pool_size.unwrap_or(DEFAULT_WORKER_POOL_SIZE),
            thumbnail_max_edge: self
                .thumbnail_max_edge
                .unwrap_or(DEFAULT_THUMBNAIL_MAX_EDGE),
            thumbnail_quality: self.thumbnail_quality.unwrap_or(DEFAULT_THUMBNAIL_QUALITY),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            root_album_name: self
                .root_album_name
                .unwrap_or_else(|| DEFAULT_ROOT_ALBUM_NAME.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}
