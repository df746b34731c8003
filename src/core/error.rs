use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the updater.
/// Every module returns `Result<T, UpdaterError>`.
///
/// Variants fall into two classes. Recoverable ones describe a single
/// manifest entry that cannot be resolved; the graph builder logs them and
/// drops that entry with its subtree. Everything else aborts the run.
#[derive(Debug, Error)]
pub enum UpdaterError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Registry returned HTTP {status} for {url}")]
    RegistryStatus { url: String, status: u16 },

    // ── Remote target ───────────────────────────────────
    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("FTP session is no longer available")]
    FtpSessionLost,

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Manifest ────────────────────────────────────────
    #[error("Invalid manifest {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    // ── Per-entry resolution (recoverable) ──────────────
    #[error("No provider source declared for {entry}")]
    MissingSource { entry: String },

    #[error("Multiple provider sources declared for {entry}: {tags:?}")]
    AmbiguousSource { entry: String, tags: Vec<String> },

    #[error("Unknown provider source '{tag}' for {entry}")]
    UnknownSource { entry: String, tag: String },

    #[error("Invalid {tag} metadata for {entry}: {reason}")]
    InvalidSource {
        entry: String,
        tag: String,
        reason: String,
    },

    #[error("No compatible versions found for {entry}")]
    NoCompatibleVersions { entry: String },

    #[error("Wanted version '{wanted}' not found for {entry}")]
    VersionNotFound { entry: String, wanted: String },

    #[error("No primary file found for {entry}")]
    NoPrimaryFile { entry: String },

    #[error("Refusing to place {entry} under unsafe file name '{file_name}'")]
    UnsafeFileName { entry: String, file_name: String },

    #[error("Dependency cycle detected: {chain}")]
    DependencyCycle { chain: String },

    #[error("Dependency tree deeper than {limit} levels below {entry}")]
    DepthExceeded { entry: String, limit: usize },

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl UpdaterError {
    /// Whether this error only invalidates the entry it was raised for.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpdaterError::MissingSource { .. }
                | UpdaterError::AmbiguousSource { .. }
                | UpdaterError::UnknownSource { .. }
                | UpdaterError::InvalidSource { .. }
                | UpdaterError::NoCompatibleVersions { .. }
                | UpdaterError::VersionNotFound { .. }
                | UpdaterError::NoPrimaryFile { .. }
                | UpdaterError::UnsafeFileName { .. }
                | UpdaterError::DependencyCycle { .. }
                | UpdaterError::DepthExceeded { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type UpdaterResult<T> = Result<T, UpdaterError>;

impl From<std::io::Error> for UpdaterError {
    fn from(source: std::io::Error) -> Self {
        UpdaterError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_entry_errors_are_recoverable() {
        let err = UpdaterError::VersionNotFound {
            entry: "plugin.jar".into(),
            wanted: "1.0".into(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn transport_errors_are_fatal() {
        let err = UpdaterError::DownloadFailed {
            url: "https://example.com/a.jar".into(),
            status: 503,
        };
        assert!(!err.is_recoverable());
        assert!(!UpdaterError::FtpSessionLost.is_recoverable());
    }
}
