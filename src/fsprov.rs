//! Filesystem provider — the boundary between cache logic and disk.
//!
//! All gallery content is addressed by *relative names* (a gallery name, a
//! photo name) resolved against a fixed root. The provider exposes exactly
//! what the cache layers need: `stat`, single-level enumeration, and byte
//! read/write. Modification time from `stat` is the sole staleness oracle in
//! this crate — there is no manifest file and no content hashing.
//!
//! Name components are validated before they touch the filesystem: empty
//! components, `.`/`..`, and embedded path separators are rejected so a
//! request can never escape the configured root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(PathBuf),
    #[error("invalid path component: {0:?}")]
    InvalidComponent(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of a `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime: SystemTime,
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

/// Root-anchored filesystem access for gallery content and cached artifacts.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve relative name components to an absolute path under the root.
    pub fn resolve(&self, parts: &[&str]) -> Result<PathBuf, FsError> {
        let mut path = self.root.clone();
        for part in parts {
            validate_component(part)?;
            path.push(part);
        }
        Ok(path)
    }

    pub fn stat(&self, parts: &[&str]) -> Result<FileStat, FsError> {
        let path = self.resolve(parts)?;
        let meta = fs::metadata(&path).map_err(|e| io_error(path.clone(), e))?;
        let mtime = meta.modified().map_err(|e| io_error(path, e))?;
        Ok(FileStat {
            mtime,
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        })
    }

    /// Enumerate the entry names of a directory, sorted by name.
    ///
    /// Single level only; dotfiles are skipped (sidecar conventions and the
    /// cache directory both live behind visible names or separate roots).
    pub fn list(&self, parts: &[&str]) -> Result<Vec<String>, FsError> {
        let path = self.resolve(parts)?;
        let entries = fs::read_dir(&path).map_err(|e| io_error(path.clone(), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(path.clone(), e))?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn read(&self, parts: &[&str]) -> Result<Vec<u8>, FsError> {
        let path = self.resolve(parts)?;
        fs::read(&path).map_err(|e| io_error(path, e))
    }

    /// Write bytes, creating intermediate directories as needed.
    pub fn write(&self, parts: &[&str], bytes: &[u8]) -> Result<(), FsError> {
        let path = self.resolve(parts)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent.to_path_buf(), e))?;
        }
        fs::write(&path, bytes).map_err(|e| io_error(path, e))
    }
}

fn validate_component(part: &str) -> Result<(), FsError> {
    let invalid = part.is_empty()
        || part == "."
        || part == ".."
        || part.contains('/')
        || part.contains('\\')
        || part.contains('\0');
    if invalid {
        return Err(FsError::InvalidComponent(part.to_string()));
    }
    Ok(())
}

fn io_error(path: PathBuf, source: io::Error) -> FsError {
    if source.kind() == io::ErrorKind::NotFound {
        FsError::NotFound(path)
    } else {
        FsError::Io { path, source }
    }
}
