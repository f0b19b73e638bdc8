//! The resize cache coordinator.
//!
//! [`ResizerPool::resize`] is the crate's primary operation: given a
//! transformation request it either serves an existing on-disk artifact or
//! produces one — exactly once per distinct parameter set — through the
//! bounded worker pool.
//!
//! ## Paths through a request
//!
//! 1. **Resolve** the output format (sniffed from the source unless given)
//!    and the target dimensions (derived from the source aspect ratio when
//!    one side is missing).
//! 2. **Fast path**: if the canonical artifact exists, is non-empty, and is
//!    at least as new as the source photo, return it. No lock, no pool.
//! 3. **Slow path**: take the per-key lock, re-check the fast path (a
//!    concurrent producer may have finished first), then run the transform
//!    on the worker pool and return its bytes. The lock guard is released
//!    on every exit, success or failure.
//!
//! ## Canonical artifact layout
//!
//! ```text
//! <cache_root>/<gallery>/<stem>/<gallery>-<stem>-<w>x<h>-<q>-<rotation>.<ext>
//! ```
//!
//! where `<stem>` is the photo name without its extension and `<rotation>`
//! carries six fixed decimals (`0.000000`, `90.500000`). Every numeric field
//! is formatted with fixed precision so identical tuples always collide on
//! the same file and distinct tuples never do.
//!
//! ## Locks
//!
//! Per-key locks exist to avoid duplicate CPU work, not to protect the
//! artifact: two racing producers would write byte-identical content. The
//! registry holds only [`Weak`] references and sweeps dead entries once it
//! grows, so idle keys cost nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use crate::fsprov::{FsError, FsProvider};
use crate::imaging::exif::{self, ExifSummary};
use crate::imaging::{
    Orientation, OutputFormat, TransformError, TransformJob, derive_size, transform,
};
use crate::pool::{PoolError, WorkerPool};

/// Encoding quality when a request does not name one.
pub const DEFAULT_QUALITY: u8 = 60;
/// Rotation when a request does not name one.
pub const DEFAULT_ROTATION: f64 = 0.0;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("photo not found: {gallery}/{photo}")]
    NotFound { gallery: String, photo: String },
    #[error("transform failed for {gallery}/{photo}: {source}")]
    Transform {
        gallery: String,
        photo: String,
        #[source]
        source: TransformError,
    },
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ResizeError {
    /// The §404-vs-§500 distinction for callers that render responses:
    /// `true` means "the thing does not exist", everything else is a
    /// processing failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResizeError::NotFound { .. })
    }
}

/// One requested rendition of one photo. Immutable once built.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub gallery: String,
    pub photo: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    /// Counter-clockwise degrees; any float, normalized internally.
    pub rotation: f64,
    /// EXIF orientation of the source, as probed by the caller (the
    /// [`properties`](ResizerPool::properties) path or a metadata layer).
    pub orientation: Orientation,
    /// `None` means "detect": GIF sources stay GIF, otherwise PNG at
    /// quality 100 and JPEG below.
    pub format: Option<OutputFormat>,
}

impl TransformRequest {
    pub fn new(gallery: impl Into<String>, photo: impl Into<String>) -> Self {
        Self {
            gallery: gallery.into(),
            photo: photo.into(),
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
            rotation: DEFAULT_ROTATION,
            orientation: Orientation::TopLeft,
            format: None,
        }
    }
}

/// Fully-resolved identity of one rendition: the lock key for deduplication
/// and the seed of the canonical artifact filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransformKey {
    gallery: String,
    stem: String,
    width: u32,
    height: u32,
    quality: u8,
    /// Rotation in millionths of a degree, normalized into `[0°, 360°)` —
    /// integral so the key is hashable and formats identically everywhere.
    rotation_micro: u64,
    orientation: Orientation,
    format: OutputFormat,
}

impl TransformKey {
    fn rotation_degrees(&self) -> f64 {
        self.rotation_micro as f64 / 1_000_000.0
    }

    fn rotation_field(&self) -> String {
        format!(
            "{}.{:06}",
            self.rotation_micro / 1_000_000,
            self.rotation_micro % 1_000_000
        )
    }

    /// Canonical artifact filename.
    fn artifact_name(&self) -> String {
        format!(
            "{gallery}-{stem}-{width}x{height}-{quality}-{rotation}.{ext}",
            gallery = self.gallery,
            stem = self.stem,
            width = self.width,
            height = self.height,
            quality = self.quality,
            rotation = self.rotation_field(),
            ext = self.format.ext(),
        )
    }
}

fn normalize_rotation(degrees: f64) -> u64 {
    let normalized = degrees.rem_euclid(360.0);
    let micro = (normalized * 1_000_000.0).round() as u64;
    micro % 360_000_000
}

/// Photo stem: the name with its final extension stripped.
fn photo_stem(photo: &str) -> &str {
    match photo.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => photo,
    }
}

/// Raw dimensions and best-effort EXIF of one photo.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PhotoProperties {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifSummary>,
}

/// A served rendition: resolved format, canonical artifact name, bytes.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub format: OutputFormat,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Running counters for cache effectiveness, mirrored by [`fmt::Display`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResizeStats {
    /// Served straight off disk, lock-free.
    pub hits: u64,
    /// Produced by a concurrent holder of the same key while we waited.
    pub coalesced: u64,
    /// Actually transformed on the worker pool.
    pub misses: u64,
}

impl ResizeStats {
    pub fn total(&self) -> u64 {
        self.hits + self.coalesced + self.misses
    }
}

impl fmt::Display for ResizeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coalesced > 0 {
            write!(
                f,
                "{} cached, {} coalesced, {} transformed ({} total)",
                self.hits,
                self.coalesced,
                self.misses,
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} transformed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        }
    }
}

#[derive(Default)]
struct StatCounters {
    hits: AtomicU64,
    coalesced: AtomicU64,
    misses: AtomicU64,
}

/// Registry of per-key locks. Entries are weak; a key's lock lives exactly
/// as long as some request holds or awaits it.
struct LockRegistry {
    inner: StdMutex<HashMap<TransformKey, Weak<AsyncMutex<()>>>>,
}

/// Sweep dead weak entries once the map reaches this size.
const LOCK_SWEEP_AT: usize = 64;

impl LockRegistry {
    fn new() -> Self {
        Self {
            inner: StdMutex::new(HashMap::new()),
        }
    }

    fn acquire(&self, key: &TransformKey) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        if map.len() >= LOCK_SWEEP_AT {
            map.retain(|_, weak| weak.strong_count() > 0);
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        map.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// The coordinator: owns the cache layout, the per-key locks, and the
/// handle to the worker pool.
pub struct ResizerPool {
    photos: Arc<FsProvider>,
    cache: Arc<FsProvider>,
    pool: Arc<WorkerPool>,
    locks: LockRegistry,
    stats: StatCounters,
}

impl ResizerPool {
    pub fn new(photos: Arc<FsProvider>, cache: Arc<FsProvider>, pool: Arc<WorkerPool>) -> Self {
        Self {
            photos,
            cache,
            pool,
            locks: LockRegistry::new(),
            stats: StatCounters::default(),
        }
    }

    /// Serve one rendition, computing it at most once per distinct
    /// parameter set.
    pub async fn resize(&self, request: &TransformRequest) -> Result<ResizedImage, ResizeError> {
        let source_stat = self.stat_source(&request.gallery, &request.photo)?;
        let source = self.photos.resolve(&[&request.gallery, &request.photo])?;
        let quality = request.quality.clamp(1, 100);

        // 1. Format resolution: explicit beats detection.
        let format = match request.format {
            Some(format) => format,
            None => {
                let sniffed = OutputFormat::sniff(&source)
                    .map_err(|e| self.transform_error(request, io_error(&source, e)))?;
                match sniffed {
                    Some(OutputFormat::Gif) => OutputFormat::Gif,
                    _ if quality == 100 => OutputFormat::Png,
                    _ => OutputFormat::Jpeg,
                }
            }
        };

        // 2. Dimension resolution: only probe the source when a side is
        //    actually missing.
        let (width, height) = match (request.width, request.height) {
            (Some(w), Some(h)) => (w, h),
            (w, h) => {
                let mut raw = image::image_dimensions(&source)
                    .map_err(|e| self.transform_error(request, decode_error(&source, e)))?;
                // The transform orients the pixels before resizing, so the
                // ratio must come from the oriented dimensions too.
                if request.orientation.swaps_axes() {
                    raw = (raw.1, raw.0);
                }
                derive_size(raw, w, h)
            }
        };

        // 3. Canonical key and artifact path.
        let key = TransformKey {
            gallery: request.gallery.clone(),
            stem: photo_stem(&request.photo).to_string(),
            width,
            height,
            quality,
            rotation_micro: normalize_rotation(request.rotation),
            orientation: request.orientation,
            format,
        };
        let name = key.artifact_name();
        let artifact = self.cache.resolve(&[&key.gallery, &key.stem, &name])?;

        // 4. Fast path: fresh artifact, no lock, no pool.
        if let Some(bytes) = transform::read_fresh(&artifact, source_stat.mtime)
            .map_err(|e| self.transform_error(request, e))?
        {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%name, "artifact cache hit");
            return Ok(ResizedImage {
                format,
                name,
                bytes,
            });
        }

        // 5. Slow path, deduplicated: the guard drops on every exit.
        let lock = self.locks.acquire(&key);
        let _guard = lock.lock().await;

        if let Some(bytes) = transform::read_fresh(&artifact, source_stat.mtime)
            .map_err(|e| self.transform_error(request, e))?
        {
            self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%name, "artifact produced by concurrent request");
            return Ok(ResizedImage {
                format,
                name,
                bytes,
            });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%name, width, height, "transforming on worker pool");
        let job = TransformJob {
            source,
            artifact,
            width,
            height,
            quality,
            rotation: key.rotation_degrees(),
            orientation: key.orientation,
            format,
        };
        let outcome = self.pool.submit(move || transform::run(&job)).await?;
        let bytes = outcome.map_err(|e| {
            tracing::warn!(%name, error = %e, "transform failed");
            self.transform_error(request, e)
        })?;

        Ok(ResizedImage {
            format,
            name,
            bytes,
        })
    }

    /// Raw pixel dimensions and best-effort EXIF, independent of the
    /// resize path. Orientation codes 5–8 swap the reported axes.
    pub fn properties(
        &self,
        gallery: &str,
        photo: &str,
    ) -> Result<PhotoProperties, ResizeError> {
        self.stat_source(gallery, photo)?;
        let source = self.photos.resolve(&[gallery, photo])?;

        let (mut width, mut height) = image::image_dimensions(&source).map_err(|e| {
            ResizeError::Transform {
                gallery: gallery.to_string(),
                photo: photo.to_string(),
                source: decode_error(&source, e),
            }
        })?;
        if exif::orientation_of(&source).is_some_and(Orientation::swaps_axes) {
            std::mem::swap(&mut width, &mut height);
        }
        Ok(PhotoProperties {
            width,
            height,
            exif: exif::read_exif(&source),
        })
    }

    /// EXIF orientation of the source photo, defaulting to upright.
    pub fn orientation(&self, gallery: &str, photo: &str) -> Orientation {
        self.photos
            .resolve(&[gallery, photo])
            .ok()
            .and_then(|path| exif::orientation_of(&path))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> ResizeStats {
        ResizeStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            coalesced: self.stats.coalesced.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
        }
    }

    fn stat_source(
        &self,
        gallery: &str,
        photo: &str,
    ) -> Result<crate::fsprov::FileStat, ResizeError> {
        let not_found = || ResizeError::NotFound {
            gallery: gallery.to_string(),
            photo: photo.to_string(),
        };
        match self.photos.stat(&[gallery, photo]) {
            Ok(stat) if stat.is_file => Ok(stat),
            Ok(_) => Err(not_found()),
            Err(FsError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    fn transform_error(&self, request: &TransformRequest, source: TransformError) -> ResizeError {
        ResizeError::Transform {
            gallery: request.gallery.clone(),
            photo: request.photo.clone(),
            source,
        }
    }
}

fn io_error(path: &std::path::Path, source: std::io::Error) -> TransformError {
    TransformError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn decode_error(path: &std::path::Path, source: image::ImageError) -> TransformError {
    TransformError::Decode {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs::{self, FileTimes};
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn key(rotation: f64) -> TransformKey {
        TransformKey {
            gallery: "travel".into(),
            stem: "beach".into(),
            width: 800,
            height: 600,
            quality: 60,
            rotation_micro: normalize_rotation(rotation),
            orientation: Orientation::TopLeft,
            format: OutputFormat::Jpeg,
        }
    }

    // =========================================================================
    // Canonical names
    // =========================================================================

    #[test]
    fn artifact_name_layout() {
        assert_eq!(
            key(0.0).artifact_name(),
            "travel-beach-800x600-60-0.000000.jpg"
        );
    }

    #[test]
    fn rotation_formats_with_six_decimals() {
        assert_eq!(key(90.5).rotation_field(), "90.500000");
        assert_eq!(key(0.25).rotation_field(), "0.250000");
        assert_eq!(key(359.9999994).rotation_field(), "359.999999");
    }

    #[test]
    fn negative_rotation_normalizes() {
        assert_eq!(key(-90.0).rotation_field(), "270.000000");
        assert_eq!(key(-90.0), key(270.0));
    }

    #[test]
    fn full_turn_wraps_to_zero() {
        assert_eq!(key(360.0).rotation_field(), "0.000000");
        assert_eq!(key(720.0), key(0.0));
    }

    #[test]
    fn distinct_tuples_distinct_names() {
        let base = key(0.0);
        let mut other = key(0.0);
        other.quality = 90;
        assert_ne!(base.artifact_name(), other.artifact_name());

        let mut rotated = key(0.0);
        rotated.rotation_micro = normalize_rotation(0.000001);
        assert_ne!(base.artifact_name(), rotated.artifact_name());
    }

    #[test]
    fn stem_strips_final_extension_only() {
        assert_eq!(photo_stem("beach.jpg"), "beach");
        assert_eq!(photo_stem("beach.final.jpeg"), "beach.final");
        assert_eq!(photo_stem("noext"), "noext");
        assert_eq!(photo_stem(".hidden"), ".hidden");
    }

    // =========================================================================
    // Lock registry
    // =========================================================================

    #[test]
    fn same_key_shares_one_lock() {
        let registry = LockRegistry::new();
        let a = registry.acquire(&key(0.0));
        let b = registry.acquire(&key(0.0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_locks() {
        let registry = LockRegistry::new();
        let a = registry.acquire(&key(0.0));
        let b = registry.acquire(&key(90.0));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn dropped_locks_are_swept() {
        let registry = LockRegistry::new();
        for i in 0..LOCK_SWEEP_AT {
            // Guard dropped immediately: every entry goes dead.
            drop(registry.acquire(&key(i as f64 * 0.001)));
        }
        assert_eq!(registry.len(), LOCK_SWEEP_AT);

        // The next acquisition crosses the threshold and sweeps the dead.
        let _live = registry.acquire(&key(350.0));
        assert_eq!(registry.len(), 1);
    }

    // =========================================================================
    // Coordinator
    // =========================================================================

    struct Fixture {
        _tmp: TempDir,
        photos_root: std::path::PathBuf,
        cache_root: std::path::PathBuf,
        resizer: ResizerPool,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let photos_root = tmp.path().join("galleries");
        let cache_root = tmp.path().join("cache");
        fs::create_dir_all(photos_root.join("travel")).unwrap();

        let resizer = ResizerPool::new(
            Arc::new(FsProvider::new(&photos_root)),
            Arc::new(FsProvider::new(&cache_root)),
            Arc::new(WorkerPool::new(2)),
        );
        Fixture {
            _tmp: tmp,
            photos_root,
            cache_root,
            resizer,
        }
    }

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 99])
        })
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        fs::File::options()
            .append(true)
            .open(path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(time))
            .unwrap();
    }

    #[tokio::test]
    async fn repeat_requests_hit_the_fast_path() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/beach.jpg"), 400, 300);

        let mut request = TransformRequest::new("travel", "beach.jpg");
        request.width = Some(200);
        request.height = Some(150);

        let first = f.resizer.resize(&request).await.unwrap();
        let second = f.resizer.resize(&request).await.unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.name, "travel-beach-200x150-60-0.000000.jpg");
        let stats = f.resizer.stats();
        assert_eq!((stats.misses, stats.hits), (1, 1));
    }

    #[tokio::test]
    async fn concurrent_identical_requests_transform_once() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/beach.jpg"), 400, 300);

        let mut request = TransformRequest::new("travel", "beach.jpg");
        request.width = Some(128);
        request.height = Some(96);

        let (a, b, c) = tokio::join!(
            f.resizer.resize(&request),
            f.resizer.resize(&request),
            f.resizer.resize(&request),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(b.bytes, c.bytes);

        let stats = f.resizer.stats();
        assert_eq!(stats.misses, 1, "exactly one pool transform: {stats}");
        assert_eq!(stats.total(), 3);
    }

    #[tokio::test]
    async fn advancing_source_mtime_forces_one_recompute() {
        let f = fixture();
        let source = f.photos_root.join("travel/beach.jpg");
        write_jpeg(&source, 400, 300);

        let mut request = TransformRequest::new("travel", "beach.jpg");
        request.width = Some(100);
        request.height = Some(75);

        let first = f.resizer.resize(&request).await.unwrap();
        // Age the artifact so the source is strictly newer than it.
        let artifact = f.cache_root.join("travel/beach").join(&first.name);
        set_mtime(&artifact, SystemTime::now() - Duration::from_secs(3600));

        f.resizer.resize(&request).await.unwrap();
        f.resizer.resize(&request).await.unwrap();

        let stats = f.resizer.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn derives_missing_height_from_ratio() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/wide.jpg"), 1920, 1080);

        let mut request = TransformRequest::new("travel", "wide.jpg");
        request.width = Some(640);

        let out = f.resizer.resize(&request).await.unwrap();
        assert_eq!(out.name, "travel-wide-640x360-60-0.000000.jpg");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 360));
    }

    #[tokio::test]
    async fn quality_100_detects_png() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/beach.jpg"), 64, 48);

        let mut request = TransformRequest::new("travel", "beach.jpg");
        request.width = Some(32);
        request.height = Some(24);
        request.quality = 100;

        let out = f.resizer.resize(&request).await.unwrap();
        assert_eq!(out.format, OutputFormat::Png);
        assert!(out.name.ends_with(".png"));
    }

    #[tokio::test]
    async fn gif_source_stays_gif() {
        let f = fixture();
        let source = f.photos_root.join("travel/anim.gif");
        RgbImage::from_pixel(32, 32, Rgb([1, 2, 3]))
            .save_with_format(&source, image::ImageFormat::Gif)
            .unwrap();

        let mut request = TransformRequest::new("travel", "anim.gif");
        request.width = Some(16);
        request.height = Some(16);

        let out = f.resizer.resize(&request).await.unwrap();
        assert_eq!(out.format, OutputFormat::Gif);
        assert_eq!(
            image::guess_format(&out.bytes).unwrap(),
            image::ImageFormat::Gif
        );
    }

    #[tokio::test]
    async fn explicit_format_overrides_detection() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/beach.jpg"), 64, 48);

        let mut request = TransformRequest::new("travel", "beach.jpg");
        request.width = Some(32);
        request.height = Some(24);
        request.format = Some(OutputFormat::Png);

        let out = f.resizer.resize(&request).await.unwrap();
        assert_eq!(out.format, OutputFormat::Png);
    }

    #[tokio::test]
    async fn missing_photo_is_not_found() {
        let f = fixture();
        let request = TransformRequest::new("travel", "absent.jpg");
        let err = f.resizer.resize(&request).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn corrupt_photo_is_transform_failure() {
        let f = fixture();
        fs::write(f.photos_root.join("travel/broken.jpg"), b"garbage").unwrap();

        let mut request = TransformRequest::new("travel", "broken.jpg");
        request.width = Some(10);
        request.height = Some(10);

        let err = f.resizer.resize(&request).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, ResizeError::Transform { .. }));
    }

    #[tokio::test]
    async fn properties_reports_raw_dimensions() {
        let f = fixture();
        write_jpeg(&f.photos_root.join("travel/beach.jpg"), 320, 240);

        let props = f.resizer.properties("travel", "beach.jpg").unwrap();
        assert_eq!((props.width, props.height), (320, 240));
        assert!(props.exif.is_none());
    }

    #[tokio::test]
    async fn properties_missing_photo_is_not_found() {
        let f = fixture();
        let err = f.resizer.properties("travel", "absent.jpg").unwrap_err();
        assert!(err.is_not_found());
    }

    // =========================================================================
    // Stats display
    // =========================================================================

    #[test]
    fn stats_display_without_coalesced() {
        let stats = ResizeStats {
            hits: 5,
            coalesced: 0,
            misses: 2,
        };
        assert_eq!(stats.to_string(), "5 cached, 2 transformed (7 total)");
    }

    #[test]
    fn stats_display_with_coalesced() {
        let stats = ResizeStats {
            hits: 3,
            coalesced: 2,
            misses: 1,
        };
        assert_eq!(
            stats.to_string(),
            "3 cached, 2 coalesced, 1 transformed (6 total)"
        );
    }
}
