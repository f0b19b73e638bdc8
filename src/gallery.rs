//! The gallery collection model.
//!
//! Three layers, top down: a [`Collection`] rooted at the configured
//! directory behaves as a lazy name → [`Gallery`] map; each gallery behaves
//! as a lazy name → [`Photo`] map over the image files in its directory; a
//! photo is a handle that reaches the shared services (metadata store,
//! resize coordinator) for everything it does. The shared services are
//! injected once at construction and owned by the collection — galleries
//! and photos hold plain `Arc` handles, never back-references.
//!
//! ## Laziness
//!
//! Galleries are materialized on first access and kept in a sliding-TTL
//! cache. A gallery re-enumerates its directory only when the directory's
//! own mtime advances; between changes, listings come from memory.
//!
//! ## Metadata
//!
//! A gallery's `info.txt` sidecar carries `.title`/`.desc` root fields and
//! per-photo child sections. A photo's own `<stem>.txt` sidecar takes
//! precedence for its fields; the gallery child section is the fallback.
//! All metadata is optional — missing files and missing keys fall back to
//! defaults, they are never errors here.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::SystemTime;
use thiserror::Error;

use crate::config::Config;
use crate::expiry::ExpiringCache;
use crate::fsprov::{FsError, FsProvider};
use crate::imaging::calculations::fit_size;
use crate::imaging::{OutputFormat, Orientation};
use crate::metadata::{MetadataRecord, MetadataStore};
use crate::pool::WorkerPool;
use crate::resizer::{PhotoProperties, ResizeError, ResizedImage, ResizerPool, TransformRequest};

/// File extensions recognized as photos when listing a gallery.
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpe", "jpeg", "gif", "png", "tif", "tiff", "bmp"];

/// Gallery sidecar filename.
const INFO_FILE: &str = "info.txt";

/// Thumbnails are heavily downscaled; quality buys nothing at that size.
const THUMB_QUALITY: u8 = 25;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery not found: {0}")]
    NotFound(String),
    #[error("photo not found: {gallery}/{photo}")]
    PhotoNotFound { gallery: String, photo: String },
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// A container that materializes items by name on demand.
///
/// Both the collection (names → galleries) and a gallery (names → photos)
/// expose this shape. `names` is a fresh, restartable listing each call.
pub trait LazyDir {
    type Item;
    type Error;

    fn get(&self, name: &str) -> Result<Self::Item, Self::Error>;
    fn names(&self) -> Result<Vec<String>, Self::Error>;
    fn len(&self) -> Result<usize, Self::Error> {
        Ok(self.names()?.len())
    }
}

/// Sizing defaults applied when a caller names no dimensions.
#[derive(Debug, Clone, Copy)]
pub struct ViewDefaults {
    pub view: (u32, u32),
    pub thumb: (u32, u32),
    pub quality: u8,
}

/// The services every gallery and photo handle reaches through.
pub struct Shared {
    pub photos: Arc<FsProvider>,
    pub metadata: Arc<MetadataStore>,
    pub resizer: Arc<ResizerPool>,
    pub defaults: ViewDefaults,
}

/// The collection of photo galleries under one root.
pub struct Collection {
    shared: Arc<Shared>,
    galleries: StdMutex<ExpiringCache<String, Gallery>>,
}

impl Collection {
    /// Wire up the full service stack from configuration.
    ///
    /// Must run inside a tokio runtime — the worker pool spawns its
    /// dispatch loop onto the current one.
    pub fn new(config: &Config) -> Self {
        let photos = Arc::new(FsProvider::new(&config.root_dir));
        let artifact_cache = Arc::new(FsProvider::new(config.cache_path()));
        let pool = Arc::new(WorkerPool::new(config.worker_count()));
        let resizer = Arc::new(ResizerPool::new(
            Arc::clone(&photos),
            artifact_cache,
            pool,
        ));
        let metadata = Arc::new(MetadataStore::new(config.cache_ttl()));
        let shared = Arc::new(Shared {
            photos,
            metadata,
            resizer,
            defaults: ViewDefaults {
                view: (config.view.width, config.view.height),
                thumb: (config.thumb.width, config.thumb.height),
                quality: config.default_quality,
            },
        });
        Self {
            galleries: StdMutex::new(ExpiringCache::new(config.cache_ttl())),
            shared,
        }
    }

    pub fn resizer(&self) -> &ResizerPool {
        &self.shared.resizer
    }

    /// Drop expired gallery handles and metadata records.
    pub fn purge(&self) {
        self.galleries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .purge();
        self.shared.metadata.purge();
    }
}

impl LazyDir for Collection {
    type Item = Gallery;
    type Error = GalleryError;

    fn get(&self, name: &str) -> Result<Gallery, GalleryError> {
        let shared = Arc::clone(&self.shared);
        let mut galleries = self
            .galleries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        galleries
            .get_with(name.to_string(), || {
                match shared.photos.stat(&[name]) {
                    Ok(stat) if stat.is_dir => Ok(Gallery::new(name, shared.clone())),
                    Ok(_) => Err(GalleryError::NotFound(name.to_string())),
                    Err(FsError::NotFound(_)) => Err(GalleryError::NotFound(name.to_string())),
                    Err(e) => Err(e.into()),
                }
            })
            .cloned()
    }

    fn names(&self) -> Result<Vec<String>, GalleryError> {
        let mut names = Vec::new();
        for name in self.shared.photos.list(&[])? {
            if self.shared.photos.stat(&[&name])?.is_dir {
                names.push(name);
            }
        }
        Ok(names)
    }
}

struct ContentCache {
    mtime: Option<SystemTime>,
    names: Vec<String>,
}

/// One photo gallery: a directory of images plus an optional `info.txt`.
#[derive(Clone)]
pub struct Gallery {
    name: String,
    shared: Arc<Shared>,
    content: Arc<StdMutex<ContentCache>>,
}

impl Gallery {
    fn new(name: &str, shared: Arc<Shared>) -> Self {
        Self {
            name: name.to_string(),
            shared,
            content: Arc::new(StdMutex::new(ContentCache {
                mtime: None,
                names: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gallery title from `info.txt`, falling back to the directory name.
    pub fn title(&self) -> String {
        self.meta()
            .and_then(|meta| meta.get("title").map(str::to_string))
            .unwrap_or_else(|| self.name.clone())
    }

    /// Gallery description, if `info.txt` carries one.
    pub fn description(&self) -> Option<String> {
        self.meta()?.get("desc").map(str::to_string)
    }

    /// The parsed `info.txt`, if present and readable.
    fn meta(&self) -> Option<Arc<MetadataRecord>> {
        let path = self.shared.photos.resolve(&[&self.name, INFO_FILE]).ok()?;
        self.shared.metadata.get(&path).ok()
    }

    /// Photo names, re-enumerated only when the directory mtime advances.
    fn photo_names(&self) -> Result<Vec<String>, GalleryError> {
        let stat = match self.shared.photos.stat(&[&self.name]) {
            Ok(stat) => stat,
            Err(FsError::NotFound(_)) => {
                return Err(GalleryError::NotFound(self.name.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut content = self.content.lock().unwrap_or_else(PoisonError::into_inner);
        if content.mtime != Some(stat.mtime) {
            tracing::debug!(gallery = %self.name, "directory changed, re-listing photos");
            content.names = self
                .shared
                .photos
                .list(&[&self.name])?
                .into_iter()
                .filter(|name| is_photo_name(name))
                .collect();
            content.mtime = Some(stat.mtime);
        }
        Ok(content.names.clone())
    }
}

impl LazyDir for Gallery {
    type Item = Photo;
    type Error = GalleryError;

    fn get(&self, name: &str) -> Result<Photo, GalleryError> {
        let exists = is_photo_name(name)
            && matches!(
                self.shared.photos.stat(&[&self.name, name]),
                Ok(stat) if stat.is_file
            );
        if !exists {
            return Err(GalleryError::PhotoNotFound {
                gallery: self.name.clone(),
                photo: name.to_string(),
            });
        }
        Ok(Photo {
            gallery: self.name.clone(),
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }

    fn names(&self) -> Result<Vec<String>, GalleryError> {
        self.photo_names()
    }
}

fn is_photo_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && PHOTO_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// One photo in one gallery: a lightweight handle over the shared services.
#[derive(Clone)]
pub struct Photo {
    gallery: String,
    name: String,
    shared: Arc<Shared>,
}

impl Photo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Annotation text: the photo's own sidecar wins, then the gallery's
    /// child section, then nothing.
    pub fn annotation(&self) -> Option<String> {
        self.own_field("annotation")
            .or_else(|| self.gallery_field("annotation"))
    }

    /// Preferred display width from metadata, if any.
    pub fn preferred_width(&self) -> Option<u32> {
        self.numeric_field("width")
    }

    /// Preferred display height from metadata, if any.
    pub fn preferred_height(&self) -> Option<u32> {
        self.numeric_field("height")
    }

    /// Raw dimensions (orientation-corrected) and best-effort EXIF.
    pub fn properties(&self) -> Result<PhotoProperties, ResizeError> {
        self.shared.resizer.properties(&self.gallery, &self.name)
    }

    /// The display size for a view box: caller-supplied dimensions win,
    /// then metadata preferences, then the configured view box capped at
    /// the photo's own size.
    pub fn view_size(
        &self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(u32, u32), ResizeError> {
        let props = self.properties()?;
        let raw = (props.width, props.height);
        let (view_w, view_h) = self.shared.defaults.view;
        let box_w = width
            .or_else(|| self.preferred_width())
            .unwrap_or(raw.0.min(view_w));
        let box_h = height
            .or_else(|| self.preferred_height())
            .unwrap_or(raw.1.min(view_h));
        Ok(fit_size(raw, (box_w, box_h)))
    }

    /// Serve a rendition of this photo through the resize cache.
    pub async fn resize(
        &self,
        width: Option<u32>,
        height: Option<u32>,
        quality: Option<u8>,
        rotation: Option<f64>,
        format: Option<OutputFormat>,
    ) -> Result<ResizedImage, ResizeError> {
        let mut request = TransformRequest::new(&self.gallery, &self.name);
        request.width = width;
        request.height = height;
        request.quality = quality.unwrap_or(self.shared.defaults.quality);
        request.rotation = rotation.unwrap_or(0.0);
        request.orientation = self.orientation();
        request.format = format;
        self.shared.resizer.resize(&request).await
    }

    /// Serve the thumbnail rendition: the configured thumb box, fixed low
    /// quality, no rotation.
    pub async fn thumbnail(&self) -> Result<ResizedImage, ResizeError> {
        let props = self.properties()?;
        let (w, h) = fit_size((props.width, props.height), self.shared.defaults.thumb);
        let mut request = TransformRequest::new(&self.gallery, &self.name);
        request.width = Some(w);
        request.height = Some(h);
        request.quality = THUMB_QUALITY;
        request.orientation = self.orientation();
        self.shared.resizer.resize(&request).await
    }

    fn orientation(&self) -> Orientation {
        self.shared.resizer.orientation(&self.gallery, &self.name)
    }

    fn own_field(&self, key: &str) -> Option<String> {
        let sidecar = format!("{}.txt", self.stem());
        let path = self.shared.photos.resolve(&[&self.gallery, &sidecar]).ok()?;
        let meta = self.shared.metadata.get(&path).ok()?;
        meta.get(key).map(str::to_string)
    }

    fn gallery_field(&self, key: &str) -> Option<String> {
        let path = self
            .shared
            .photos
            .resolve(&[&self.gallery, INFO_FILE])
            .ok()?;
        let meta = self.shared.metadata.get(&path).ok()?;
        meta.child(&self.name, key).map(str::to_string)
    }

    fn numeric_field(&self, key: &str) -> Option<u32> {
        self.own_field(key)
            .or_else(|| self.gallery_field(key))?
            .trim()
            .parse()
            .ok()
    }
}
