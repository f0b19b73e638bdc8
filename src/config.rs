//! Configuration loading and validation.
//!
//! One sparse `darkroom.toml` over built-in defaults — override just the
//! values you want:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root_dir = "galleries"    # Gallery collection root
//! # cache_dir defaults to "<root_dir>/.cache"
//! # workers defaults to the host CPU count
//! cache_ttl_secs = 300      # Sliding TTL for in-memory caches
//! default_quality = 60      # Encoding quality when a request names none
//!
//! [view]
//! width = 1024              # Default view box
//! height = 768
//!
//! [thumb]
//! width = 80                # Thumbnail box
//! height = 60
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::pool;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// A width × height box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SizeBox {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Root directory holding one subdirectory per gallery.
    pub root_dir: PathBuf,
    /// Artifact cache root; defaults to `.cache` inside the gallery root.
    pub cache_dir: Option<PathBuf>,
    /// Worker pool size; `None` means one per CPU.
    pub workers: Option<usize>,
    /// Sliding TTL for gallery handles and parsed sidecar metadata.
    pub cache_ttl_secs: u64,
    /// Encoding quality when a request names none.
    pub default_quality: u8,
    /// Default view box for photo pages.
    pub view: SizeBox,
    /// Bounding box for thumbnails.
    pub thumb: SizeBox,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("galleries"),
            cache_dir: None,
            workers: None,
            cache_ttl_secs: 300,
            default_quality: 60,
            view: SizeBox {
                width: 1024,
                height: 768,
            },
            thumb: SizeBox {
                width: 80,
                height: 60,
            },
        }
    }
}

impl Config {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved artifact cache root.
    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => self.root_dir.join(".cache"),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(pool::default_workers)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));
        if self.workers == Some(0) {
            return fail("workers must be at least 1".into());
        }
        if self.cache_ttl_secs == 0 {
            return fail("cache_ttl_secs must be at least 1".into());
        }
        if !(1..=100).contains(&self.default_quality) {
            return fail(format!(
                "default_quality must be 1-100, got {}",
                self.default_quality
            ));
        }
        for (name, size) in [("view", self.view), ("thumb", self.thumb)] {
            if size.width == 0 || size.height == 0 {
                return fail(format!("{name} box must have non-zero dimensions"));
            }
        }
        Ok(())
    }
}
