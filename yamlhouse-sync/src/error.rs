//! Error types for yamlhouse-sync.

use std::path::PathBuf;

use thiserror::Error;

/// A version-control operation failed.
#[derive(Debug, Error)]
#[error("git {op} in {path} failed: {detail}")]
pub struct RepositorySyncError {
    pub op: &'static str,
    pub path: PathBuf,
    pub detail: String,
}

/// All errors that can arise from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Repository(#[from] RepositorySyncError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A service name, path segment or id that cannot be used as a file name.
    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidSegment {
        segment: String,
        reason: &'static str,
    },
}

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Clone or pull failed; nothing was written.
    #[error("cannot prepare working tree: {0}")]
    WorkingTree(#[source] StoreError),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_includes_sources_once() {
        let err = SyncError::WorkingTree(io_err(
            "/repo",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        let text = error_chain(&err);
        assert!(text.starts_with("cannot prepare working tree"));
        assert_eq!(text.matches("denied").count(), 1, "got: {text}");
    }
}
