//! Image model and the blocking transform pipeline — pure Rust.
//!
//! | Concern | Where | Crate / function |
//! |---|---|---|
//! | **Output formats** | [`format`] | `image::guess_format` for sniffing |
//! | **Dimension math** | [`calculations`] | pure functions, no I/O |
//! | **EXIF orientation** | [`orientation`], [`exif`] | `rexif` + `image::imageops` |
//! | **Decode → orient → rotate → resize → encode** | [`transform`] | `image` crate, Lanczos3 |
//!
//! Everything under [`transform`] is blocking and must run on the worker
//! pool; the rest is cheap enough for the dispatcher.

pub mod calculations;
pub mod exif;
pub mod format;
pub mod orientation;
pub mod transform;

pub use calculations::{derive_size, fit_size};
pub use exif::ExifSummary;
pub use format::{FormatError, OutputFormat};
pub use orientation::Orientation;
pub use transform::{TransformError, TransformJob};
