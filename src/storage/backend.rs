//! Storage backend trait and the default filesystem implementation.
//!
//! The backend exposes the three atomic primitives the engine is written
//! against - exclusive-create, read, delete - plus the small helpers around
//! them. Concurrency safety for new records rests entirely on the
//! filesystem's exclusive-create guarantee; no in-process lock is used, and
//! cross-process writers racing on the same new ID resolve to exactly one
//! winner.

use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Size ceiling for a single record file. Anything larger is rejected as
/// malformed rather than loaded.
pub const MAX_RECORD_BYTES: u64 = 1024 * 1024;

/// Zero-byte marker keeping an empty backlog directory git-trackable.
pub const MARKER_FILE: &str = ".gitkeep";

/// Raw persistence operations for discovery record files.
///
/// The store manager and the scanner are written against this trait so the
/// same logic could later target an embedded key-value store.
pub trait StoreBackend: Send + Sync {
    /// Idempotently create the backing directory and its marker file.
    fn ensure_dir(&self) -> Result<()>;

    /// Whether the backing directory has been initialized.
    fn initialized(&self) -> bool;

    /// Exclusive-create: write `bytes` to `name`, failing with
    /// [`Error::DuplicateId`] if the file already exists. The write is
    /// synced before returning.
    fn create_new(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a file, enforcing the [`MAX_RECORD_BYTES`] ceiling.
    /// Missing file -> [`Error::NotFound`], oversized -> [`Error::Malformed`].
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Replace an existing file's contents. Synced before returning.
    fn overwrite(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a file. Missing file -> [`Error::NotFound`].
    fn delete(&self, name: &str) -> Result<()>;

    /// Whether a file exists.
    fn exists(&self, name: &str) -> bool;

    /// Enumerate file names in the backing directory (single pass, no
    /// recursion).
    fn list_files(&self) -> Result<Vec<String>>;

    /// Storage location description, for display purposes.
    fn location(&self) -> String;
}

/// Filesystem-backed store: one file per record in a single directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl StoreBackend for FileBackend {
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let marker = self.dir.join(MARKER_FILE);
        if !marker.exists() {
            File::create(&marker)?;
        }
        Ok(())
    }

    fn initialized(&self) -> bool {
        self.dir.is_dir()
    }

    fn create_new(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::DuplicateId(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes)?;
        // Durable before the record is considered created.
        file.sync_all()?;
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.len() > MAX_RECORD_BYTES {
            return Err(Error::Malformed {
                file: name.to_string(),
                reason: format!(
                    "{} bytes exceeds the {} byte record ceiling",
                    metadata.len(),
                    MAX_RECORD_BYTES
                ),
            });
        }
        Ok(fs::read(&path)?)
    }

    fn overwrite(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut file = File::create(self.path_for(name))?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn list_files(&self) -> Result<Vec<String>> {
        if !self.initialized() {
            return Err(Error::NotInitialized);
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
