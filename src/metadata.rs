//! Sidecar metadata parsing and the mtime-validated metadata store.
//!
//! Human-authored metadata lives in plain-text sidecar files next to the
//! content: `info.txt` inside a gallery directory, `<photo stem>.txt` next
//! to a photo. Each line is one `key<TAB>value` pair.
//!
//! ## File grammar
//!
//! Keys beginning with `.` are fields. A line whose key does *not* begin
//! with `.` is a bare name that opens a child section; every `.`-prefixed
//! line after it belongs to that child until the next bare name. Fields
//! before any bare name belong to the root section:
//!
//! ```text
//! .title	Holiday 2019
//! .desc	Two weeks on the coast
//! img1.jpg
//! .annotation	Sunrise from the pier
//! img2.jpg
//! .annotation	Low tide
//! .width	800
//! ```
//!
//! parses to root `{title, desc}` plus children `img1.jpg` and `img2.jpg`.
//! Repeated keys within one section concatenate (joined with a newline) —
//! a second `.annotation` line continues the text, it never overwrites.
//!
//! ## Caching
//!
//! [`MetadataStore`] keeps parsed records in an [`ExpiringCache`] keyed by
//! canonicalized absolute path, so hot sidecars are parsed once per change.
//! The stored record carries the file's mtime at parse time; a lookup whose
//! stat matches that mtime returns the record unchanged (and slides its
//! TTL), while an advanced mtime forces a re-read. A missing file is a
//! [`MetadataError::NotFound`] — distinct from a present file that simply
//! lacks the requested key, which is an `Option::None` at lookup time.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use thiserror::Error;

use crate::expiry::ExpiringCache;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("metadata file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parsed content of one sidecar file: a root section plus named children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    root: HashMap<String, String>,
    children: HashMap<String, HashMap<String, String>>,
}

impl MetadataRecord {
    /// Parse sidecar text per the file grammar in the module docs.
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();
        let mut current: Option<String> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = match line.split_once('\t') {
                Some((k, v)) => (k, v),
                None => (line, ""),
            };
            if let Some(field) = key.strip_prefix('.') {
                let section = match &current {
                    Some(child) => record.children.entry(child.clone()).or_default(),
                    None => &mut record.root,
                };
                append_field(section, field, value);
            } else {
                // A bare name opens a child context; anything after a stray
                // tab on the name line is discarded, not invented into a
                // field.
                let name = key.trim();
                record.children.entry(name.to_string()).or_default();
                current = Some(name.to_string());
            }
        }
        record
    }

    /// Root field lookup: `get("title")` finds a `.title` line.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.root.get(key).map(String::as_str)
    }

    /// Child field lookup: `child("img1.jpg", "annotation")`.
    pub fn child(&self, name: &str, key: &str) -> Option<&str> {
        self.children
            .get(name)
            .and_then(|fields| fields.get(key))
            .map(String::as_str)
    }

    /// Names of all child sections, in unspecified order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }
}

fn append_field(section: &mut HashMap<String, String>, key: &str, value: &str) {
    match section.get_mut(key) {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(value);
        }
        None => {
            section.insert(key.to_string(), value.to_string());
        }
    }
}

struct CachedRecord {
    mtime: SystemTime,
    record: Arc<MetadataRecord>,
}

/// Cache of parsed sidecar files, invalidated by file modification time.
pub struct MetadataStore {
    cache: Mutex<ExpiringCache<PathBuf, CachedRecord>>,
}

impl MetadataStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(ExpiringCache::new(ttl)),
        }
    }

    /// Fetch the parsed record for `path`, re-reading the file only when
    /// its modification time has advanced past the cached copy's.
    pub fn get(&self, path: &Path) -> Result<Arc<MetadataRecord>, MetadataError> {
        let path = fs::canonicalize(path).map_err(|e| map_io(path.to_path_buf(), e))?;
        let meta = fs::metadata(&path).map_err(|e| map_io(path.clone(), e))?;
        let mtime = meta.modified().map_err(|e| map_io(path.clone(), e))?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(&path) {
            if cached.mtime == mtime {
                return Ok(Arc::clone(&cached.record));
            }
            tracing::debug!(path = %path.display(), "sidecar changed on disk, reparsing");
        }

        let text = fs::read_to_string(&path).map_err(|e| map_io(path.clone(), e))?;
        let record = Arc::new(MetadataRecord::parse(&text));
        cache.insert(
            path,
            CachedRecord {
                mtime,
                record: Arc::clone(&record),
            },
        );
        Ok(record)
    }

    /// Drop expired records.
    pub fn purge(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .purge();
    }

    /// Earliest expiry across cached records, if any.
    pub fn next_expiry(&self) -> Option<std::time::Instant> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_expiry()
    }
}

fn map_io(path: PathBuf, source: io::Error) -> MetadataError {
    if source.kind() == io::ErrorKind::NotFound {
        MetadataError::NotFound(path)
    } else {
        MetadataError::Io { path, source }
    }
}
