//! # Thumbnail Generation
//!
//! Decodes an image, applies its stored EXIF orientation, scales the long
//! edge down to a fixed bound and re-encodes the result as JPEG.
//!
//! Images already within the bound keep their size; thumbnails are never
//! upscaled. Dimensions reported in [`Thumbnail`] are the decoded image's
//! native pixel size, before orientation is applied.

use crate::error::{MetadataError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

/// Smallest accepted long-edge bound
pub const MIN_MAX_EDGE: u32 = 16;
/// Largest accepted long-edge bound
pub const MAX_MAX_EDGE: u32 = 4096;

/// Edge of the neutral placeholder used for files that are not decoded
const PLACEHOLDER_EDGE: u32 = 64;
const PLACEHOLDER_GREY: [u8; 3] = [128, 128, 128];

/// EXIF orientation (tag 0x0112) as the transform needed to display upright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Normal,
    MirroredHorizontal,
    Rotated180,
    MirroredVertical,
    MirroredHorizontalAnd270CW,
    Rotated90CW,
    MirroredHorizontalAnd90CW,
    Rotated270CW,
}

impl Orientation {
    /// Map an EXIF orientation value; out-of-range values read as normal
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::MirroredHorizontal,
            3 => Self::Rotated180,
            4 => Self::MirroredVertical,
            5 => Self::MirroredHorizontalAnd270CW,
            6 => Self::Rotated90CW,
            7 => Self::MirroredHorizontalAnd90CW,
            8 => Self::Rotated270CW,
            _ => Self::Normal,
        }
    }

    /// Rotate or flip `img` so it displays upright
    #[must_use]
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::MirroredHorizontal => img.fliph(),
            Self::Rotated180 => img.rotate180(),
            Self::MirroredVertical => img.flipv(),
            Self::MirroredHorizontalAnd270CW => img.fliph().rotate270(),
            Self::Rotated90CW => img.rotate90(),
            Self::MirroredHorizontalAnd90CW => img.fliph().rotate90(),
            Self::Rotated270CW => img.rotate270(),
        }
    }

    /// Stable name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::MirroredHorizontal => "mirrored-horizontal",
            Self::Rotated180 => "rotated-180",
            Self::MirroredVertical => "mirrored-vertical",
            Self::MirroredHorizontalAnd270CW => "mirrored-horizontal-270cw",
            Self::Rotated90CW => "rotated-90cw",
            Self::MirroredHorizontalAnd90CW => "mirrored-horizontal-90cw",
            Self::Rotated270CW => "rotated-270cw",
        }
    }
}

/// Encoded preview plus the source's native dimensions
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    /// Native width of the decoded source
    pub width: u32,
    /// Native height of the decoded source
    pub height: u32,
}

/// Produces bounded JPEG previews
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEncoder {
    max_edge: u32,
    quality: u8,
}

impl ThumbnailEncoder {
    /// Create an encoder bounding the long edge to `max_edge` pixels and
    /// encoding at JPEG `quality` (1..=100)
    pub fn new(max_edge: u32, quality: u8) -> Result<Self> {
        if !(MIN_MAX_EDGE..=MAX_MAX_EDGE).contains(&max_edge) {
            return Err(MetadataError::InvalidConfig(format!(
                "thumbnail max edge {} outside {}..={}",
                max_edge, MIN_MAX_EDGE, MAX_MAX_EDGE
            )));
        }
        if !(1..=100).contains(&quality) {
            return Err(MetadataError::InvalidConfig(format!(
                "thumbnail quality {} outside 1..=100",
                quality
            )));
        }
        Ok(Self { max_edge, quality })
    }

    pub fn max_edge(&self) -> u32 {
        self.max_edge
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Target size for a `width` x `height` image: long edge scaled down to
    /// the bound, aspect ratio kept, never upscaled, never below 1px.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let long_edge = width.max(height);
        if long_edge <= self.max_edge {
            return (width, height);
        }

        let scale = f64::from(self.max_edge) / f64::from(long_edge);
        let scaled = |edge: u32| ((f64::from(edge) * scale).round() as u32).max(1);

        if width >= height {
            (self.max_edge, scaled(height))
        } else {
            (scaled(width), self.max_edge)
        }
    }

    /// Decode `data`, orient it and encode the preview
    pub fn encode(&self, data: &[u8], orientation: Orientation) -> Result<Thumbnail> {
        let img =
            image::load_from_memory(data).map_err(|e| MetadataError::Decode(e.to_string()))?;
        let (width, height) = (img.width(), img.height());

        let oriented = orientation.apply(img);
        let (target_w, target_h) = self.target_dimensions(oriented.width(), oriented.height());

        let resized = if (target_w, target_h) == (oriented.width(), oriented.height()) {
            oriented
        } else {
            oriented.resize_exact(target_w, target_h, FilterType::Lanczos3)
        };

        debug!(
            width,
            height,
            target_w,
            target_h,
            orientation = orientation.as_str(),
            "Encoding thumbnail"
        );

        let bytes = self.encode_jpeg(DynamicImage::ImageRgb8(resized.to_rgb8()))?;

        Ok(Thumbnail {
            bytes,
            width,
            height,
        })
    }

    /// Neutral grey preview for media that is not decoded (videos)
    pub fn placeholder(&self) -> Result<Vec<u8>> {
        let edge = PLACEHOLDER_EDGE.min(self.max_edge);
        let img = RgbImage::from_pixel(edge, edge, Rgb(PLACEHOLDER_GREY));
        self.encode_jpeg(DynamicImage::ImageRgb8(img))
    }

    fn encode_jpeg(&self, img: DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
        img.write_with_encoder(encoder)
            .map_err(|e| MetadataError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn decode(bytes: &[u8]) -> DynamicImage {
        image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_settings() {
        assert!(ThumbnailEncoder::new(8, 75).is_err());
        assert!(ThumbnailEncoder::new(5000, 75).is_err());
        assert!(ThumbnailEncoder::new(256, 0).is_err());
        assert!(ThumbnailEncoder::new(256, 101).is_err());
        assert!(ThumbnailEncoder::new(256, 75).is_ok());
    }

    #[test]
    fn test_target_dimensions() {
        let encoder = ThumbnailEncoder::new(100, 75).unwrap();
        assert_eq!(encoder.target_dimensions(400, 200), (100, 50));
        assert_eq!(encoder.target_dimensions(200, 400), (50, 100));
        assert_eq!(encoder.target_dimensions(80, 40), (80, 40));
        assert_eq!(encoder.target_dimensions(1000, 1), (100, 1));
    }

    #[test]
    fn test_encode_downscales_and_reports_native_size() {
        let encoder = ThumbnailEncoder::new(32, 70).unwrap();
        let thumb = encoder.encode(&png_bytes(128, 64), Orientation::Normal).unwrap();

        assert_eq!((thumb.width, thumb.height), (128, 64));
        let preview = decode(&thumb.bytes);
        assert_eq!((preview.width(), preview.height()), (32, 16));
    }

    #[test]
    fn test_encode_never_upscales() {
        let encoder = ThumbnailEncoder::new(512, 70).unwrap();
        let thumb = encoder.encode(&png_bytes(40, 20), Orientation::Normal).unwrap();

        let preview = decode(&thumb.bytes);
        assert_eq!((preview.width(), preview.height()), (40, 20));
    }

    #[test]
    fn test_encode_applies_orientation() {
        let encoder = ThumbnailEncoder::new(512, 70).unwrap();
        let thumb = encoder
            .encode(&png_bytes(40, 20), Orientation::Rotated90CW)
            .unwrap();

        assert_eq!((thumb.width, thumb.height), (40, 20));
        let preview = decode(&thumb.bytes);
        assert_eq!((preview.width(), preview.height()), (20, 40));
    }

    #[test]
    fn test_encode_rejects_corrupt_bytes() {
        let encoder = ThumbnailEncoder::new(512, 70).unwrap();
        let result = encoder.encode(b"definitely not an image", Orientation::Normal);
        assert!(matches!(result, Err(MetadataError::Decode(_))));
    }

    #[test]
    fn test_placeholder_is_small_jpeg() {
        let encoder = ThumbnailEncoder::new(32, 70).unwrap();
        let preview = decode(&encoder.placeholder().unwrap());
        assert_eq!((preview.width(), preview.height()), (32, 32));
    }

    #[test]
    fn test_orientation_from_exif() {
        assert_eq!(Orientation::from_exif(1), Orientation::Normal);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotated90CW);
        assert_eq!(Orientation::from_exif(42), Orientation::Normal);
        assert_eq!(Orientation::from_exif(8).as_str(), "rotated-270cw");
    }
}
