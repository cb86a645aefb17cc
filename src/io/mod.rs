//! Read-only memory-mapped inputs.
//!
//! The decoding engine only ever sees `&[u8]`. `MappedFile` is the buffer source used by the
//! command-line tool: it maps a file once, enforces the configured size limit, and hands out
//! the whole mapping as a slice. Slicing is free; nothing is copied.

pub mod error;

use crate::config::IoConfig;
use crate::io::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file mapped read-only for the lifetime of this value.
pub struct MappedFile {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Opens and maps a file, failing if it exceeds `config.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, config: &IoConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(IoError::access(path))?;
        let file_size = file.metadata().map_err(IoError::access(path))?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limit = config.max_file_size,
            "Mapping file"
        );

        if file_size > config.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = config.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                path: path.to_path_buf(),
                limit: config.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map; the engine never writes through it. Concurrent truncation
            // of the underlying file by another process is outside what we can guard against.
            Some(unsafe { Mmap::map(&file) }.map_err(IoError::access(path))?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// The mapped bytes.
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
