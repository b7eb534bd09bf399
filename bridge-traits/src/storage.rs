//! Byte Store Abstraction
//!
//! The byte store holds the original bytes of every ingested media file,
//! addressed by a `/`-separated key derived from the album path and filename
//! (for example `2023/trip/beach.jpg`). The relational record written after a
//! successful `write` refers to the blob by that key.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BridgeError, Result};

/// Key-addressable store for original media bytes.
///
/// Implementations must make `write` durable before returning `Ok`: the
/// ingestion pipeline persists the relational record only after this call
/// succeeds, so a record never points at bytes that were not stored.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::BlobStore;
///
/// async fn archive(store: &dyn BlobStore, data: bytes::Bytes) -> bridge_traits::Result<()> {
///     store.write("holidays/beach.jpg", data).await?;
///     assert!(store.exists("holidays/beach.jpg").await?);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `key`, replacing any previous blob.
    async fn write(&self, key: &str, data: Bytes) -> Result<()>;

    /// Read the entire blob stored under `key`.
    async fn read(&self, key: &str) -> Result<Bytes>;

    /// Open the blob under `key` for streaming reads.
    async fn open_read_stream(
        &self,
        key: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

    /// Delete the blob under `key`. Deleting a missing blob is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Validate a blob key: relative, `/`-separated, no empty or parent segments.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidKey`] describing the first violated rule.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: &str| BridgeError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(invalid("key must be relative and '/'-separated"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("key contains an empty segment")),
            "." | ".." => return Err(invalid("key contains a relative segment")),
            _ => {}
        }
    }

    Ok(())
}
