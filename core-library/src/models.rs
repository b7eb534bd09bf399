//! Domain models for the gallery library
//!
//! Albums mirror directories under the library root and are addressed by a
//! canonical path: `/` for the root, `/trip/day-1` for descendants. Both album
//! and media ids are derived from stable inputs, so re-syncing an unchanged
//! tree resolves to the same rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for name-based album and media ids.
const GALLERY_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c52_8e0b_4d7f_9b21_5e4c_7a90_d3e8);

/// Canonical path of the album mapped to the library root.
pub const ROOT_ALBUM_PATH: &str = "/";

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for an album, derived from its canonical path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlbumId(pub Uuid);

impl AlbumId {
    /// Deterministic id for the album at `path`
    pub fn from_path(path: &str) -> Self {
        Self(Uuid::new_v5(&GALLERY_NAMESPACE, format!("album:{}", path).as_bytes()))
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a media record, derived from album and filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub Uuid);

impl MediaId {
    /// Deterministic id for `filename` inside `album_id`
    pub fn for_file(album_id: &AlbumId, filename: &str) -> Self {
        Self(Uuid::new_v5(
            &GALLERY_NAMESPACE,
            format!("media:{}/{}", album_id, filename).as_bytes(),
        ))
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Album paths
// =============================================================================

/// Join a child directory name onto an album path.
pub fn child_album_path(parent_path: &str, name: &str) -> String {
    if parent_path == ROOT_ALBUM_PATH {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent_path, name)
    }
}

/// Parent album path, or `None` for the root.
pub fn parent_album_path(path: &str) -> Option<String> {
    if path == ROOT_ALBUM_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_ALBUM_PATH.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Whether `path` lies strictly below `ancestor`.
pub fn is_descendant_path(path: &str, ancestor: &str) -> bool {
    if path == ancestor {
        return false;
    }
    if ancestor == ROOT_ALBUM_PATH {
        return path.starts_with('/');
    }
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Check an album path is canonical: `/` or `/seg(/seg)*` without `.`/`..`.
pub fn validate_album_path(path: &str) -> Result<(), String> {
    if path == ROOT_ALBUM_PATH {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(format!("Album path '{}' must start with '/'", path));
    };
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(format!("Album path '{}' is not canonical", path));
        }
    }
    Ok(())
}

// =============================================================================
// Album
// =============================================================================

/// Album backed by a directory under the library root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    /// Deterministic id (see [`AlbumId::from_path`])
    pub id: String,
    /// Canonical path relative to the library root
    pub path: String,
    /// Display name (directory base name)
    pub name: String,
    /// Optional user-provided description
    pub description: Option<String>,
    /// Parent album; `None` only for the root
    pub parent_id: Option<String>,
    /// Media used as the album cover
    pub thumbnail_media_id: Option<String>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    /// Create the root album
    pub fn root(name: impl Into<String>) -> Self {
        Self::with_path(ROOT_ALBUM_PATH.to_string(), name.into(), None)
    }

    /// Create a child album for directory `name` under `parent`
    pub fn child_of(parent: &Album, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = child_album_path(&parent.path, &name);
        Self::with_path(path, name, Some(parent.id.clone()))
    }

    fn with_path(path: String, name: String, parent_id: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: AlbumId::from_path(&path).to_string(),
            path,
            name,
            description: None,
            parent_id,
            thumbnail_media_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this is the library root album
    pub fn is_root(&self) -> bool {
        self.path == ROOT_ALBUM_PATH
    }

    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        validate_album_path(&self.path)?;

        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }

        if self.id != AlbumId::from_path(&self.path).to_string() {
            return Err(format!("Album id does not match path '{}'", self.path));
        }

        match (&self.parent_id, self.is_root()) {
            (Some(_), true) => Err("Root album cannot have a parent".to_string()),
            (None, false) => Err(format!("Album '{}' must have a parent", self.path)),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Media
// =============================================================================

/// Kind of media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("Unknown media kind: {}", other)),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Origin of a media capture timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// Read from embedded metadata
    Metadata,
    /// Fell back to the file modification time
    FileModified,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Metadata => "metadata",
            CaptureSource::FileModified => "file_modified",
        }
    }
}

impl FromStr for CaptureSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" => Ok(CaptureSource::Metadata),
            "file_modified" => Ok(CaptureSource::FileModified),
            other => Err(format!("Unknown capture source: {}", other)),
        }
    }
}

/// Media record for one ingested file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Deterministic id (see [`MediaId::for_file`])
    pub id: String,
    /// Owning album
    pub album_id: String,
    /// File name within the album directory
    pub filename: String,
    /// SHA-256 hex digest of the original bytes
    pub content_hash: String,
    /// Photo or video
    pub kind: MediaKind,
    /// Capture time (Unix seconds)
    pub captured_at: i64,
    /// Where `captured_at` came from
    pub captured_at_source: CaptureSource,
    /// Native pixel dimensions, when decoded
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Size of the original bytes
    pub size_bytes: i64,
    /// Encoded preview (JPEG)
    #[serde(skip_serializing)]
    pub thumbnail: Vec<u8>,
    /// Extracted key/value metadata
    pub metadata: BTreeMap<String, String>,
    /// Byte store key of the original bytes
    pub blob_key: String,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl Media {
    /// Validate media data
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("Media filename cannot be empty".to_string());
        }

        if self.filename.contains('/') || self.filename.contains('\\') {
            return Err(format!(
                "Media filename '{}' must not contain path separators",
                self.filename
            ));
        }

        if self.content_hash.len() != 64 {
            return Err("Content hash must be a SHA-256 hex digest".to_string());
        }

        if self.size_bytes < 0 {
            return Err("Media size cannot be negative".to_string());
        }

        if self.thumbnail.is_empty() {
            return Err("Media thumbnail cannot be empty".to_string());
        }

        if self.blob_key.is_empty() {
            return Err("Media blob key cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_id_is_deterministic() {
        assert_eq!(AlbumId::from_path("/trip"), AlbumId::from_path("/trip"));
        assert_ne!(AlbumId::from_path("/trip"), AlbumId::from_path("/trip2"));
    }

    #[test]
    fn test_media_id_is_scoped_to_album() {
        let a = AlbumId::from_path("/a");
        let b = AlbumId::from_path("/b");
        assert_eq!(MediaId::for_file(&a, "x.jpg"), MediaId::for_file(&a, "x.jpg"));
        assert_ne!(MediaId::for_file(&a, "x.jpg"), MediaId::for_file(&b, "x.jpg"));
    }

    #[test]
    fn test_album_paths() {
        assert_eq!(child_album_path("/", "trip"), "/trip");
        assert_eq!(child_album_path("/trip", "day-1"), "/trip/day-1");
        assert_eq!(parent_album_path("/trip/day-1").as_deref(), Some("/trip"));
        assert_eq!(parent_album_path("/trip").as_deref(), Some("/"));
        assert_eq!(parent_album_path("/"), None);
    }

    #[test]
    fn test_is_descendant_path() {
        assert!(is_descendant_path("/trip", "/"));
        assert!(is_descendant_path("/trip/day-1", "/trip"));
        assert!(!is_descendant_path("/trip", "/trip"));
        assert!(!is_descendant_path("/tripx", "/trip"));
        assert!(!is_descendant_path("/", "/"));
    }

    #[test]
    fn test_validate_album_path() {
        assert!(validate_album_path("/").is_ok());
        assert!(validate_album_path("/a/b").is_ok());
        assert!(validate_album_path("a/b").is_err());
        assert!(validate_album_path("/a//b").is_err());
        assert!(validate_album_path("/a/../b").is_err());
        assert!(validate_album_path("/a/").is_err());
    }

    #[test]
    fn test_album_tree_construction() {
        let root = Album::root("Library");
        let child = Album::child_of(&root, "trip");
        let grandchild = Album::child_of(&child, "day-1");

        assert!(root.is_root());
        assert!(root.validate().is_ok());
        assert_eq!(child.path, "/trip");
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(grandchild.path, "/trip/day-1");
        assert_eq!(grandchild.id, AlbumId::from_path("/trip/day-1").to_string());
        assert!(grandchild.validate().is_ok());
    }

    #[test]
    fn test_album_validation_rejects_orphans() {
        let mut album = Album::child_of(&Album::root("Library"), "trip");
        album.parent_id = None;
        assert!(album.validate().is_err());

        let mut root = Album::root("Library");
        root.parent_id = Some("someone".to_string());
        assert!(root.validate().is_err());
    }

    #[test]
    fn test_media_kind_round_trip() {
        assert_eq!("photo".parse::<MediaKind>().unwrap(), MediaKind::Photo);
        assert_eq!("VIDEO".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert!("audio".parse::<MediaKind>().is_err());
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
