//! Scheduler settings derived from [`GalleryConfig`].

use crate::Result;
use core_metadata::{
    MediaTypeDetector, ThumbnailEncoder, DEFAULT_PHOTO_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS,
};
use core_runtime::config::{
    GalleryConfig, DEFAULT_ROOT_ALBUM_NAME, DEFAULT_THUMBNAIL_MAX_EDGE, DEFAULT_THUMBNAIL_QUALITY,
    DEFAULT_WORKER_POOL_SIZE,
};
use std::path::PathBuf;

/// Configuration for the job scheduler
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory tree jobs are confined to
    pub library_root: PathBuf,

    /// Number of jobs processed at the same time
    pub worker_pool_size: usize,

    /// Long-edge bound for generated thumbnails
    pub thumbnail_max_edge: u32,

    /// JPEG quality for generated thumbnails
    pub thumbnail_quality: u8,

    /// Display name of the album mapped to the library root
    pub root_album_name: String,

    /// Photo file extensions to include
    pub photo_extensions: Vec<String>,

    /// Video file extensions to include
    pub video_extensions: Vec<String>,
}

impl SyncConfig {
    /// Defaults for everything but the library root
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            thumbnail_max_edge: DEFAULT_THUMBNAIL_MAX_EDGE,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            root_album_name: DEFAULT_ROOT_ALBUM_NAME.to_string(),
            photo_extensions: to_strings(DEFAULT_PHOTO_EXTENSIONS),
            video_extensions: to_strings(DEFAULT_VIDEO_EXTENSIONS),
        }
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    pub fn detector(&self) -> MediaTypeDetector {
        MediaTypeDetector::new(&self.photo_extensions, &self.video_extensions)
    }

    /// # Errors
    ///
    /// Returns an error if the thumbnail settings are out of range.
    pub fn thumbnail_encoder(&self) -> Result<ThumbnailEncoder> {
        Ok(ThumbnailEncoder::new(
            self.thumbnail_max_edge,
            self.thumbnail_quality,
        )?)
    }
}

impl From<&GalleryConfig> for SyncConfig {
    fn from(config: &GalleryConfig) -> Self {
        Self {
            library_root: config.library_root.clone(),
            worker_pool_size: config.worker_pool_size,
            thumbnail_max_edge: config.thumbnail_max_edge,
            thumbnail_quality: config.thumbnail_quality,
            root_album_name: config.root_album_name.clone(),
            ..Self::new(config.library_root.clone())
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
