//! Error type shared by tree construction and queries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    /// Listing a directory or reading a file failed
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The build root exists but is not a directory
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Blank search word, unknown build method, bad exclude pattern, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pool task panicked or the pool finished without producing a root
    #[error("worker error: {0}")]
    Worker(String),
}

impl TreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotADirectory(path) => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
