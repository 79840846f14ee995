//! Error types for the content pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning one content file into a post.
///
/// These never reach callers of the public store API: listing skips the
/// offending file and single-post lookups report `None`.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid front-matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("content task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ContentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;
