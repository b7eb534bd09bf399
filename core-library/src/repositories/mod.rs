//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the gallery store.
//!
//! ## Architecture
//!
//! - Traits define the interface the sync pipeline and the façade consume
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `AlbumRepository` - Album hierarchy mirrored from directories
//! - `MediaRepository` - Media records, upserted together with album covers

pub mod album;
pub mod media;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use media::{MediaRepository, SqliteMediaRepository};
