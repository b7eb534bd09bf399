//! EXIF Extraction
//!
//! Best-effort key/value extraction of embedded capture metadata using
//! `kamadak-exif`. Files without EXIF yield an empty result; unknown or
//! malformed fields are dropped with a warning. Nothing here fails: missing
//! metadata must never block ingestion.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::MetadataExtractor;
//!
//! let metadata = MetadataExtractor::new().extract(&bytes);
//! if let Some(ts) = metadata.captured_at {
//!     println!("Captured at {}", ts);
//! }
//! ```

use crate::thumbnail::Orientation;
use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, Field, In, Tag, Value};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

/// Longest value kept in the key/value map
const MAX_VALUE_LEN: usize = 256;

/// EXIF date format (`YYYY:MM:DD HH:MM:SS`)
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Capture time tags in order of preference
const CAPTURE_TIME_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Metadata extracted from a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    /// Tag name to display value, primary image only
    pub fields: BTreeMap<String, String>,
    /// Capture time, when a timestamp tag is present and parses
    pub captured_at: Option<DateTime<Utc>>,
    /// Stored orientation; `Normal` when absent
    pub orientation: Orientation,
}

impl ExtractedMetadata {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Reads EXIF from image bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract metadata from an in-memory file
    pub fn extract(&self, data: &[u8]) -> ExtractedMetadata {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => {
                debug!("No EXIF data present");
                return ExtractedMetadata::default();
            }
            Err(e) => {
                warn!(error = %e, "Unreadable EXIF data, ignoring");
                return ExtractedMetadata::default();
            }
        };

        ExtractedMetadata {
            fields: collect_fields(&exif),
            captured_at: capture_time(&exif),
            orientation: exif
                .get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
                .map(Orientation::from_exif)
                .unwrap_or_default(),
        }
    }
}

fn collect_fields(exif: &Exif) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        if field.tag.description().is_none() {
            warn!(tag = %field.tag, "Dropping unknown EXIF tag");
            continue;
        }

        match display_value(field, exif) {
            Some(value) => {
                fields.insert(field.tag.to_string(), value);
            }
            None => warn!(tag = %field.tag, "Dropping malformed EXIF field"),
        }
    }

    fields
}

/// Printable value of a field, or `None` for binary or oversized values
fn display_value(field: &Field, exif: &Exif) -> Option<String> {
    if let Value::Undefined(..) = field.value {
        // Opaque blobs (MakerNote and friends) only print as hex dumps.
        if field.tag != Tag::ExifVersion && field.tag != Tag::FlashpixVersion {
            return None;
        }
    }

    let value = field.display_value().with_unit(exif).to_string();
    let value = value.trim_matches(|c: char| c == '"' || c.is_whitespace());

    if value.is_empty() || value.len() > MAX_VALUE_LEN || value.contains('\0') {
        return None;
    }

    Some(value.to_string())
}

fn capture_time(exif: &Exif) -> Option<DateTime<Utc>> {
    for tag in CAPTURE_TIME_TAGS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };

        match parse_exif_datetime(&field.value) {
            Some(ts) => return Some(ts),
            None => warn!(tag = %tag, "Unparsable EXIF timestamp"),
        }
    }

    None
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(values) => values
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|s| s.trim_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Parse an EXIF timestamp; it carries no zone, so it is read as UTC
fn parse_exif_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let raw = ascii_value(value)?;
    NaiveDateTime::parse_from_str(&raw, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
