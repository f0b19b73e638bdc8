//! Recognized output formats and content-type sniffing.
//!
//! Three output formats exist, each with a MIME type, a canonical file
//! extension (used in artifact names), and an `image` crate encoder
//! identifier. Requests may name a format as either the bare subtype
//! (`"jpeg"`) or the full MIME type (`"image/jpeg"`); anything else is
//! rejected before any work is queued.
//!
//! Source files are sniffed by magic bytes, never by extension — a
//! mislabeled `.jpg` that is really a GIF keeps its animation-capable
//! format on output.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unrecognized image format: {0:?}")]
    Unrecognized(String),
}

/// An output format the transform pipeline can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Gif];

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }

    /// Canonical extension used in artifact filenames.
    pub fn ext(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Gif => image::ImageFormat::Gif,
        }
    }

    /// Parse a user-supplied format name (`"jpeg"`, `"jpg"`, `"image/png"`,
    /// ...). Unknown names are an error, raised before any queueing.
    pub fn parse(name: &str) -> Result<Self, FormatError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(OutputFormat::Jpeg),
            "png" | "image/png" => Ok(OutputFormat::Png),
            "gif" | "image/gif" => Ok(OutputFormat::Gif),
            other => Err(FormatError::Unrecognized(other.to_string())),
        }
    }

    /// Sniff a source file's format from its magic bytes.
    ///
    /// Returns `None` for content that decodes but is not one of the three
    /// recognized formats (the caller falls back to quality-based selection).
    pub fn sniff(path: &Path) -> io::Result<Option<Self>> {
        let mut header = [0u8; 32];
        let mut file = File::open(path)?;
        let read = file.read(&mut header)?;
        Ok(match image::guess_format(&header[..read]) {
            Ok(image::ImageFormat::Jpeg) => Some(OutputFormat::Jpeg),
            Ok(image::ImageFormat::Png) => Some(OutputFormat::Png),
            Ok(image::ImageFormat::Gif) => Some(OutputFormat::Gif),
            _ => None,
        })
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}
