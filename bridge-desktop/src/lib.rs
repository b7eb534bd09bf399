//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `BlobStore` using `tokio::fs`, rooted at a single directory
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::LocalBlobStore;
//! use bridge_traits::BlobStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = LocalBlobStore::new("/var/lib/gallery/blobs");
//!     store.write("album/photo.jpg", bytes::Bytes::from_static(b"...")).await.unwrap();
//! }
//! ```

mod filesystem;

pub use filesystem::LocalBlobStore;
