use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineCountError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("path unreadable: {}: {source}", .path.display())]
    PathUnreadable { path: PathBuf, source: io::Error },

    #[error("read failed: {0}")]
    ReadFailure(#[from] io::Error),

    #[error("no newline found in {bytes_read} sampled bytes, cannot extrapolate")]
    InsufficientSampleData { bytes_read: u64 },

    #[error("invalid estimate parameters: {0}")]
    InvalidParameters(String),

    #[error("reference counter failed: {0}")]
    Reference(String),

    #[error("dropping the page cache failed: {0}")]
    CacheDrop(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, LineCountError>;

impl LineCountError {
    /// Classifies an error raised while opening or stat-ing `path`.
    pub fn from_path(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::PathNotFound(path.to_path_buf()),
            _ => Self::PathUnreadable {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| LineCountError::from_path(path, e))
}

pub(crate) fn metadata(path: &Path) -> Result<Metadata> {
    std::fs::metadata(path).map_err(|e| LineCountError::from_path(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified_by_kind() {
        let err = LineCountError::from_path(
            Path::new("/nope"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, LineCountError::PathNotFound(p) if p == Path::new("/nope")));
    }

    #[test]
    fn permission_denied_is_unreadable() {
        let err = LineCountError::from_path(
            Path::new("/secret"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, LineCountError::PathUnreadable { .. }));
        assert!(err.to_string().starts_with("path unreadable: /secret"));
    }
}
