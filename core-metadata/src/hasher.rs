//! Content fingerprints for change detection

use sha2::{Digest, Sha256};

/// Length of a hex-encoded digest
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 over a file's bytes, hex encoded.
///
/// Used to decide whether a file changed since the last sync; it is not a
/// security boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a complete buffer
    pub fn hash(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }
}
