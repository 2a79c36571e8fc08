//! Error taxonomy shared by every large-file operation.
//!
//! Failures are recovered at the open/scan boundary of each component and
//! surfaced as a typed value. Nothing here is retried automatically.

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, LargeFileError>;

#[derive(Debug, thiserror::Error)]
pub enum LargeFileError {
    /// Path does not exist or is not a regular file.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// Open/read failure past the existence check (permissions, unmounted device, ...).
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Cooperative cancellation observed mid-scan. No result was produced.
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LargeFileError {
    /// Classify an `io::Error` raised while operating on `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Open `path` for reading, rejecting anything that is not a regular file.
pub(crate) fn open_regular(path: &Path) -> Result<std::fs::File> {
    let file = std::fs::File::open(path).map_err(|e| LargeFileError::from_io(path, e))?;
    let meta = file
        .metadata()
        .map_err(|e| LargeFileError::from_io(path, e))?;
    if !meta.is_file() {
        return Err(LargeFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(file)
}
