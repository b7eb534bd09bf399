//! # Media Transforms Module
//!
//! Stateless transforms the ingestion pipeline runs on a file's bytes.
//!
//! ## Overview
//!
//! This module handles:
//! - Content hashing for change detection across syncs
//! - Thumbnail generation (decode, orient, downscale, re-encode as JPEG)
//! - Best-effort EXIF extraction, including the capture timestamp
//! - Media kind detection from file extensions
//!
//! Everything here is synchronous and CPU-bound; callers run it on a
//! blocking thread.

pub mod error;
pub mod extractor;
pub mod hasher;
pub mod kind;
pub mod thumbnail;

pub use error::{MetadataError, Result};
pub use extractor::{ExtractedMetadata, MetadataExtractor};
pub use hasher::ContentHasher;
pub use kind::{MediaTypeDetector, DEFAULT_PHOTO_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS};
pub use thumbnail::{Orientation, Thumbnail, ThumbnailEncoder};
