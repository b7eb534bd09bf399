//! Media kind detection from file extensions

use core_library::models::MediaKind;
use std::path::Path;

/// Photo extensions recognised when none are configured
pub const DEFAULT_PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp",
];

/// Video extensions recognised when none are configured
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv", "webm"];

/// Classifies files as photo, video or unsupported by extension
#[derive(Debug, Clone)]
pub struct MediaTypeDetector {
    photo_extensions: Vec<String>,
    video_extensions: Vec<String>,
}

impl MediaTypeDetector {
    /// Create a detector from extension lists (case-insensitive, no dot)
    pub fn new<P, V>(photo_extensions: P, video_extensions: V) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let normalize = |ext: &str| ext.trim_start_matches('.').to_ascii_lowercase();
        Self {
            photo_extensions: photo_extensions
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .collect(),
            video_extensions: video_extensions
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .collect(),
        }
    }

    /// Kind of the file at `path`, or `None` if unsupported
    pub fn detect(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        if self.photo_extensions.iter().any(|e| *e == ext) {
            Some(MediaKind::Photo)
        } else if self.video_extensions.iter().any(|e| *e == ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Whether the file at `path` is a supported photo or video
    pub fn is_supported(&self, path: &Path) -> bool {
        self.detect(path).is_some()
    }
}

impl Default for MediaTypeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PHOTO_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_default_kinds() {
        let detector = MediaTypeDetector::default();
        assert_eq!(detector.detect(Path::new("a/b.JPG")), Some(MediaKind::Photo));
        assert_eq!(detector.detect(Path::new("clip.mov")), Some(MediaKind::Video));
        assert_eq!(detector.detect(Path::new("notes.txt")), None);
        assert_eq!(detector.detect(Path::new("README")), None);
    }

    #[test]
    fn test_custom_extensions() {
        let detector = MediaTypeDetector::new([".HEIC"], Vec::<String>::new());
        assert!(detector.is_supported(Path::new("shot.heic")));
        assert!(!detector.is_supported(Path::new("shot.jpg")));
    }
}
