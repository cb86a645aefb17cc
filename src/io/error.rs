//! Errors raised while mapping input files.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("{}: {found} bytes is over the mapping limit of {limit} bytes", path.display())]
    FileTooLarge {
        path: PathBuf,
        limit: u64,
        found: u64,
    },

    #[error("{}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IoError {
    pub(crate) fn access(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| IoError::Access {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
