//! # Directory Walk
//!
//! Produces the ordered unit-of-work list for a job. Units are every
//! sub-directory of the sync root and every supported photo or video file.
//!
//! Order is pre-order depth first with siblings sorted by file name, so a
//! directory always precedes its contents and reruns over an unchanged tree
//! yield the same sequence. Hidden entries (leading `.`) are pruned,
//! symlinks are not followed and unsupported files are not units.
//!
//! The walk is blocking; callers run it on a blocking thread.

use crate::{Result, SyncError};
use core_library::models::{child_album_path, MediaKind};
use core_metadata::MediaTypeDetector;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// What a unit of work is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A directory to reconcile into an album
    Folder,
    /// A file to ingest
    File(MediaKind),
}

/// One entry of the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the sync root, `/`-separated
    pub item: String,
    /// For folders the album the folder maps to; for files the album that
    /// contains them
    pub album_path: String,
    pub kind: UnitKind,
}

impl WorkUnit {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, UnitKind::Folder)
    }

    /// File name of the entry
    pub fn file_name(&self) -> &str {
        self.item.rsplit('/').next().unwrap_or(&self.item)
    }
}

/// Walk `root`, whose album path is `root_album_path`
///
/// # Errors
///
/// Returns an error if the root itself cannot be read. Unreadable entries
/// below it are logged and left out.
pub fn walk(
    root: &Path,
    root_album_path: &str,
    detector: &MediaTypeDetector,
) -> Result<Vec<WorkUnit>> {
    std::fs::read_dir(root).map_err(|e| SyncError::InvalidPath {
        path: root.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut units = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let Some(components) = relative_components(root, entry.path()) else {
            warn!(path = ?entry.path(), "Skipping entry with non UTF-8 name");
            continue;
        };

        let file_type = entry.file_type();
        let kind = if file_type.is_dir() {
            UnitKind::Folder
        } else if file_type.is_file() {
            match detector.detect(entry.path()) {
                Some(kind) => UnitKind::File(kind),
                None => continue,
            }
        } else {
            debug!(path = ?entry.path(), "Skipping non-regular entry");
            continue;
        };

        let album_components = match kind {
            UnitKind::Folder => &components[..],
            UnitKind::File(_) => &components[..components.len() - 1],
        };
        let album_path = album_components
            .iter()
            .fold(root_album_path.to_string(), |parent, name| {
                child_album_path(&parent, name)
            });

        units.push(WorkUnit {
            path: entry.path().to_path_buf(),
            item: components.join("/"),
            album_path,
            kind,
        });
    }

    debug!(root = ?root, units = units.len(), "Walk finished");
    Ok(units)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn relative_components(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Option<Vec<String>> = relative
        .components()
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect();
    components.filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn items(units: &[WorkUnit]) -> Vec<&str> {
        units.iter().map(|u| u.item.as_str()).collect()
    }

    #[test]
    fn test_walk_order_and_filtering() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("b.jpg"));
        touch(&root.join("a.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/c.mp4"));
        touch(&root.join("sub/deeper/d.jpeg"));
        touch(&root.join(".hidden/e.jpg"));
        touch(&root.join(".f.jpg"));
        fs::create_dir_all(root.join("empty")).unwrap();

        let units = walk(root, "/", &MediaTypeDetector::default()).unwrap();

        assert_eq!(
            items(&units),
            vec![
                "a.png",
                "b.jpg",
                "empty",
                "sub",
                "sub/c.mp4",
                "sub/deeper",
                "sub/deeper/d.jpeg",
            ]
        );

        let sub = &units[3];
        assert!(sub.is_folder());
        assert_eq!(sub.album_path, "/sub");

        let video = &units[4];
        assert_eq!(video.kind, UnitKind::File(MediaKind::Video));
        assert_eq!(video.album_path, "/sub");
        assert_eq!(video.file_name(), "c.mp4");

        assert_eq!(units[6].album_path, "/sub/deeper");
        assert_eq!(units[0].album_path, "/");
    }

    #[test]
    fn test_walk_from_nested_album() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("day-1/a.jpg"));

        let units = walk(dir.path(), "/trip", &MediaTypeDetector::default()).unwrap();
        assert_eq!(items(&units), vec!["day-1", "day-1/a.jpg"]);
        assert_eq!(units[0].album_path, "/trip/day-1");
        assert_eq!(units[1].album_path, "/trip/day-1");
    }

    #[test]
    fn test_walk_is_reproducible() {
        let dir = TempDir::new().unwrap();
        for name in ["z.jpg", "m/a.jpg", "m/b.jpg", "a/z.jpg"] {
            touch(&dir.path().join(name));
        }

        let detector = MediaTypeDetector::default();
        let first = walk(dir.path(), "/", &detector).unwrap();
        let second = walk(dir.path(), "/", &detector).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = walk(&dir.path().join("gone"), "/", &MediaTypeDetector::default());
        assert!(matches!(result, Err(SyncError::InvalidPath { .. })));
    }
}
