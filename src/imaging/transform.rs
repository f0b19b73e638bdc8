//! The blocking transform pipeline.
//!
//! [`run`] is the work item the coordinator hands to the worker pool. It is
//! deliberately self-contained: given a fully-resolved [`TransformJob`] it
//! re-checks artifact freshness (the caller's fast-path check raced with
//! disk state by definition), decodes the source, corrects EXIF orientation,
//! applies the user rotation on an expanded canvas, resizes with Lanczos3,
//! encodes, persists the artifact, and returns the encoded bytes.
//!
//! Everything here blocks; nothing here may run on the dispatcher.
//!
//! ## Rotation
//!
//! User rotation is counter-clockwise degrees. Exact quarter turns use the
//! lossless 90°-rotations; any other angle is resampled bilinearly onto a
//! canvas sized by [`rotated_extent`] so no corner is clipped. Uncovered
//! canvas stays transparent and flattens to black in RGB outputs.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use thiserror::Error;

use super::calculations::rotated_extent;
use super::format::OutputFormat;
use super::orientation::Orientation;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot encode as {format}: {source}")]
    Encode {
        format: OutputFormat,
        #[source]
        source: image::ImageError,
    },
}

/// A fully-resolved transform: absolute paths, final dimensions, normalized
/// rotation. Built by the coordinator, executed verbatim by a worker.
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Counter-clockwise degrees, normalized into `[0, 360)`.
    pub rotation: f64,
    pub orientation: Orientation,
    pub format: OutputFormat,
}

/// Execute the transform, returning the encoded artifact bytes.
pub fn run(job: &TransformJob) -> Result<Vec<u8>, TransformError> {
    let source_meta = fs::metadata(&job.source).map_err(|e| io_at(&job.source, e))?;
    let source_mtime = source_meta.modified().map_err(|e| io_at(&job.source, e))?;

    // The per-key lock serializes producers, but the fast path runs without
    // it — a concurrent producer may have landed the artifact between the
    // caller's check and this worker starting.
    if let Some(bytes) = read_fresh(&job.artifact, source_mtime)? {
        tracing::debug!(artifact = %job.artifact.display(), "artifact appeared while queued");
        return Ok(bytes);
    }

    if let Some(parent) = job.artifact.parent() {
        fs::create_dir_all(parent).map_err(|e| io_at(parent, e))?;
    }

    let img = decode(&job.source)?;
    let img = job.orientation.apply(img);
    let img = rotate_expand(img, job.rotation);
    let img = img.resize_exact(job.width, job.height, FilterType::Lanczos3);
    let bytes = encode(&img, job.format, job.quality)?;

    fs::write(&job.artifact, &bytes).map_err(|e| io_at(&job.artifact, e))?;
    Ok(bytes)
}

/// Read the artifact if it is present, non-empty, and at least as new as
/// the source. `Ok(None)` means "compute it".
pub fn read_fresh(
    artifact: &Path,
    source_mtime: SystemTime,
) -> Result<Option<Vec<u8>>, TransformError> {
    let meta = match fs::metadata(artifact) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_at(artifact, e)),
    };
    if meta.len() == 0 {
        return Ok(None);
    }
    let mtime = meta.modified().map_err(|e| io_at(artifact, e))?;
    if mtime >= source_mtime {
        fs::read(artifact).map(Some).map_err(|e| io_at(artifact, e))
    } else {
        Ok(None)
    }
}

fn io_at(path: impl AsRef<Path>, source: io::Error) -> TransformError {
    TransformError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    }
}

fn decode(path: &Path) -> Result<DynamicImage, TransformError> {
    ImageReader::open(path)
        .map_err(|e| io_at(path, e))?
        .with_guessed_format()
        .map_err(|e| io_at(path, e))?
        .decode()
        .map_err(|e| TransformError::Decode {
            path: path.to_path_buf(),
            source: e,
        })
}

fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let mut buf = Cursor::new(Vec::new());
    let encode_err = |source| TransformError::Encode { format, source };
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            rgb.write_with_encoder(encoder).map_err(encode_err)?;
        }
        OutputFormat::Png => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_to(&mut buf, image::ImageFormat::Png)
                .map_err(encode_err)?;
        }
        OutputFormat::Gif => {
            img.write_to(&mut buf, image::ImageFormat::Gif)
                .map_err(encode_err)?;
        }
    }
    Ok(buf.into_inner())
}

/// Rotate counter-clockwise by `degrees`, expanding the canvas so nothing
/// is clipped.
fn rotate_expand(img: DynamicImage, degrees: f64) -> DynamicImage {
    let turns = degrees.rem_euclid(360.0);
    if turns == 0.0 {
        return img;
    }
    // Quarter turns are exact pixel shuffles; `rotate90` is clockwise.
    if turns == 90.0 {
        return img.rotate270();
    }
    if turns == 180.0 {
        return img.rotate180();
    }
    if turns == 270.0 {
        return img.rotate90();
    }

    let (out_w, out_h) = rotated_extent(img.width(), img.height(), turns);
    let src = img.to_rgba8();
    let radians = turns.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (cx_dst, cy_dst) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
    let (cx_src, cy_src) = (src.width() as f64 / 2.0, src.height() as f64 / 2.0);

    let mut out = RgbaImage::new(out_w, out_h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - cx_dst;
        let dy = y as f64 + 0.5 - cy_dst;
        // Inverse mapping of a visually-CCW rotation in y-down coordinates.
        let sx = dx * cos - dy * sin + cx_src - 0.5;
        let sy = dx * sin + dy * cos + cy_src - 0.5;
        *px = bilinear(&src, sx, sy);
    }
    DynamicImage::ImageRgba8(out)
}

/// Bilinear sample at a fractional position; positions off the image blend
/// toward transparent.
fn bilinear(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;

    let fetch = |xi: i64, yi: i64| -> [f64; 4] {
        if xi < 0 || yi < 0 || xi >= src.width() as i64 || yi >= src.height() as i64 {
            [0.0; 4]
        } else {
            let p = src.get_pixel(xi as u32, yi as u32).0;
            [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
        }
    };

    let (xi, yi) = (x0 as i64, y0 as i64);
    let p00 = fetch(xi, yi);
    let p10 = fetch(xi + 1, yi);
    let p01 = fetch(xi, yi + 1);
    let p11 = fetch(xi + 1, yi + 1);

    let mut out = [0u8; 4];
    for channel in 0..4 {
        let top = p00[channel] * (1.0 - tx) + p10[channel] * tx;
        let bottom = p01[channel] * (1.0 - tx) + p11[channel] * tx;
        out[channel] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs::FileTimes;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
    }

    fn job(tmp: &TempDir, format: OutputFormat) -> TransformJob {
        TransformJob {
            source: tmp.path().join("source.jpg"),
            artifact: tmp.path().join("cache").join("out.bin"),
            width: 100,
            height: 75,
            quality: 75,
            rotation: 0.0,
            orientation: Orientation::TopLeft,
            format,
        }
    }

    // =========================================================================
    // run
    // =========================================================================

    #[test]
    fn produces_artifact_with_requested_dimensions() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Jpeg);
        write_jpeg(&job.source, 400, 300);

        let bytes = run(&job).unwrap();
        assert_eq!(fs::read(&job.artifact).unwrap(), bytes);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 75));
    }

    #[test]
    fn fresh_artifact_short_circuits_decode() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Jpeg);
        // Deliberately undecodable source: if the pipeline tried to decode
        // it the test would fail, proving the freshness re-check runs first.
        fs::write(&job.source, b"not an image at all").unwrap();

        fs::create_dir_all(job.artifact.parent().unwrap()).unwrap();
        fs::write(&job.artifact, b"cached bytes").unwrap();
        let newer = SystemTime::now() + Duration::from_secs(5);
        fs::File::options()
            .append(true)
            .open(&job.artifact)
            .unwrap()
            .set_times(FileTimes::new().set_modified(newer))
            .unwrap();

        assert_eq!(run(&job).unwrap(), b"cached bytes");
    }

    #[test]
    fn stale_artifact_is_recomputed() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Jpeg);
        write_jpeg(&job.source, 400, 300);

        fs::create_dir_all(job.artifact.parent().unwrap()).unwrap();
        fs::write(&job.artifact, b"stale").unwrap();
        let older = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .append(true)
            .open(&job.artifact)
            .unwrap()
            .set_times(FileTimes::new().set_modified(older))
            .unwrap();

        let bytes = run(&job).unwrap();
        assert_ne!(bytes, b"stale");
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn empty_artifact_is_recomputed() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Png);
        write_jpeg(&job.source, 200, 150);

        fs::create_dir_all(job.artifact.parent().unwrap()).unwrap();
        fs::write(&job.artifact, b"").unwrap();

        let bytes = run(&job).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Jpeg);
        assert!(matches!(run(&job), Err(TransformError::Io { .. })));
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let job = job(&tmp, OutputFormat::Jpeg);
        fs::write(&job.source, b"JFIF but not really").unwrap();
        assert!(matches!(run(&job), Err(TransformError::Decode { .. })));
    }

    #[test]
    fn output_format_matches_request() {
        for (format, expected) in [
            (OutputFormat::Jpeg, image::ImageFormat::Jpeg),
            (OutputFormat::Png, image::ImageFormat::Png),
            (OutputFormat::Gif, image::ImageFormat::Gif),
        ] {
            let tmp = TempDir::new().unwrap();
            let job = job(&tmp, format);
            write_jpeg(&job.source, 64, 48);

            let bytes = run(&job).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), expected);
        }
    }

    // =========================================================================
    // rotate_expand
    // =========================================================================

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }))
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = gradient(10, 20);
        let out = rotate_expand(img.clone(), 0.0);
        assert_eq!(out.to_rgb8().as_raw(), img.to_rgb8().as_raw());
    }

    #[test]
    fn quarter_turns_swap_dimensions_exactly() {
        for degrees in [90.0, 270.0] {
            let out = rotate_expand(gradient(10, 20), degrees);
            assert_eq!((out.width(), out.height()), (20, 10), "{degrees}");
        }
        let out = rotate_expand(gradient(10, 20), 180.0);
        assert_eq!((out.width(), out.height()), (10, 20));
    }

    #[test]
    fn negative_angles_normalize() {
        let ccw = rotate_expand(gradient(10, 20), 90.0);
        let neg = rotate_expand(gradient(10, 20), -270.0);
        assert_eq!(ccw.to_rgba8().as_raw(), neg.to_rgba8().as_raw());
    }

    #[test]
    fn diagonal_rotation_expands_canvas() {
        let out = rotate_expand(gradient(100, 100), 45.0);
        assert_eq!((out.width(), out.height()), (141, 141));
        // Corners fall outside the rotated square and stay transparent.
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn ninety_ccw_moves_top_row_to_left_column() {
        // 2x1 with a red pixel left, blue right; 90° CCW puts blue on top.
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        let out = rotate_expand(DynamicImage::ImageRgb8(img), 90.0).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [255, 0, 0]);
    }
}
