//! Best-effort EXIF reading.
//!
//! EXIF here is advisory only: orientation feeds the transform pipeline and
//! the dimension report, and a tag summary rides along on `properties` for
//! display. Files without EXIF (or with blobs rexif cannot parse) simply
//! yield `None` — never an error, since most PNGs/GIFs and plenty of JPEGs
//! carry nothing.

use std::path::Path;

use serde::Serialize;

use super::orientation::Orientation;

/// Human-readable EXIF tags of one photo, in file order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExifSummary {
    pub entries: Vec<(String, String)>,
}

fn parse(path: &Path) -> Option<rexif::ExifData> {
    let bytes = std::fs::read(path).ok()?;
    rexif::parse_buffer_quiet(&bytes).0.ok()
}

/// The photo's EXIF orientation, if one is recorded.
pub fn orientation_of(path: &Path) -> Option<Orientation> {
    let data = parse(path)?;
    data.entries
        .iter()
        .find(|entry| entry.tag == rexif::ExifTag::Orientation)
        .and_then(|entry| match &entry.value {
            rexif::TagValue::U16(values) => values.first().copied(),
            _ => None,
        })
        .and_then(Orientation::from_code)
}

/// All recognized EXIF tags, rendered readably.
pub fn read_exif(path: &Path) -> Option<ExifSummary> {
    let data = parse(path)?;
    let entries: Vec<(String, String)> = data
        .entries
        .iter()
        .filter(|entry| entry.tag != rexif::ExifTag::UnknownToMe)
        .map(|entry| {
            (
                entry.tag.to_string(),
                entry.value_more_readable.to_string(),
            )
        })
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(ExifSummary { entries })
    }
}
