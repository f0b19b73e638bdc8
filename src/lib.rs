//! # Darkroom
//!
//! An on-demand photo transformation cache. Given a gallery of source
//! photos, darkroom serves resized / rotated / reformatted renditions,
//! computing each one at most once and memoizing it on disk under a
//! filename derived from the full parameter set. Freshness comes from the
//! filesystem itself: an artifact is valid while it is newer than its
//! source photo, so edits invalidate implicitly — no manifest, no explicit
//! invalidation calls.
//!
//! # Architecture
//!
//! One single-threaded cooperative dispatcher issues requests; all blocking
//! CPU work (decode, rotate, resize, encode) runs on a bounded worker pool:
//!
//! ```text
//! request ──▶ ResizerPool ──▶ canonical key ──▶ fresh artifact? ──▶ bytes
//!                  │                                  │ no
//!                  │                          per-key lock
//!                  │                                  │
//!                  └────────────▶ WorkerPool ──▶ transform ──▶ persist
//! ```
//!
//! Concurrent requests for the same parameter tuple coalesce on a per-key
//! lock: exactly one performs the transform, the rest observe its artifact.
//! Requests for distinct tuples proceed independently, bounded only by the
//! pool size.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resizer`] | The coordinator — canonical keys, fast/slow paths, per-key locks, `resize` and `properties` |
//! | [`pool`] | Bounded worker pool: unbounded admission queue, semaphore gate, blocking execution |
//! | [`imaging`] | Format model, dimension math, EXIF orientation, and the blocking transform pipeline |
//! | [`gallery`] | Collection → Gallery → Photo model over the filesystem, with injected shared services |
//! | [`metadata`] | `key<TAB>value` sidecar parsing, cached and invalidated by file mtime |
//! | [`expiry`] | Generic sliding-TTL map under the metadata and gallery caches |
//! | [`fsprov`] | Root-anchored filesystem access; mtime is the only staleness oracle |
//! | [`config`] | `darkroom.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Parameter-Addressed Artifacts
//!
//! Artifact names embed every discriminating request field with fixed
//! numeric formatting (`<gallery>-<stem>-<w>x<h>-<q>-<rotation:.6f>.<ext>`),
//! so identical requests always map to one file and distinct requests never
//! collide. The alternative — content-hashing sources — survives renames
//! better but costs a full file read per request; mtime comparison is one
//! `stat`.
//!
//! ## Locks Prevent Waste, Not Corruption
//!
//! Two unsynchronized producers for the same key would write byte-identical
//! output, so racing writers cannot corrupt the cache. The per-key locks
//! exist purely to stop N simultaneous requests from burning N× CPU on the
//! same transform. They are weakly registered and swept, so the registry
//! does not grow with the key space.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling (Lanczos3), and encoding all go through the `image`
//! crate — no ImageMagick, no system dependencies, one self-contained
//! binary.

pub mod config;
pub mod expiry;
pub mod fsprov;
pub mod gallery;
pub mod imaging;
pub mod metadata;
pub mod pool;
pub mod resizer;

pub use config::Config;
pub use gallery::{Collection, Gallery, LazyDir, Photo};
pub use imaging::{Orientation, OutputFormat};
pub use resizer::{
    PhotoProperties, ResizeError, ResizedImage, ResizerPool, TransformRequest,
};
