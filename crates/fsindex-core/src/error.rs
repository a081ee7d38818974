use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the index. `NotFound` and `FilterSkip` are ordinary
/// control flow in most callers (see module docs); they are still real
/// variants so a caller that *does* need to distinguish "absent" from
/// "I/O failed" can match on them directly instead of inspecting strings.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("io error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("filtered: {0}")]
    FilterSkip(PathBuf),
}

pub type IndexResult<T> = Result<T, IndexError>;
