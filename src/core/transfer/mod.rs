// ─── Transfer ───
// Moving fetched artifacts onto the server, either a local directory or a
// remote FTP directory. Paths handed to a target are always relative to its
// root and use `/` as separator.

mod ftp;
mod local;

use std::path::Path;

use async_trait::async_trait;
use tempfile::TempPath;

use crate::core::error::UpdaterResult;

pub use ftp::{FtpSession, FtpTarget};
pub use local::LocalTarget;

/// A fetched artifact waiting in a temporary file.
///
/// The file is deleted when this value is dropped unless a target took
/// ownership of it with [`StagedFile::keep`].
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop tracking the file; used after it was moved elsewhere.
    pub fn keep(self) {
        let _ = self.path.keep();
    }
}

/// Source of artifact bytes.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> UpdaterResult<StagedFile>;
}

/// Where artifacts end up.
#[async_trait]
pub trait PlacementTarget: Send {
    /// Short description for log lines.
    fn describe(&self) -> String;

    /// Put `staged` at `relative`, creating parent directories and replacing
    /// whatever was there.
    async fn place(&mut self, relative: &str, staged: StagedFile) -> UpdaterResult<()>;

    async fn remove(&mut self, relative: &str) -> UpdaterResult<()>;

    /// Read a small document stored at the root. `None` when it does not exist.
    async fn read_document(&mut self, name: &str) -> UpdaterResult<Option<Vec<u8>>>;

    /// Replace a document at the root without ever exposing a partial file.
    async fn write_document(&mut self, name: &str, contents: &[u8]) -> UpdaterResult<()>;

    /// Release any held session.
    async fn close(&mut self) -> UpdaterResult<()> {
        Ok(())
    }
}

/// Join relative path segments with `/`, skipping empty and `.` segments.
pub fn join_relative(dir: &str, name: &str) -> String {
    dir.split('/')
        .chain(name.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory segments of a relative path, without the final file name.
pub fn parent_segments(relative: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

/// A file name may not escape the directory it is placed in.
pub fn is_safe_file_name(name: &str) -> bool {
    if name.trim().is_empty() || name.starts_with('/') || name.starts_with('\\') {
        return false;
    }
    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return false;
    }
    !name.split(['/', '\\']).any(|segment| segment == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_paths() {
        assert_eq!(join_relative("plugins", "a.jar"), "plugins/a.jar");
        assert_eq!(
            join_relative("plugins/Typewriter/extensions", "Basic.jar"),
            "plugins/Typewriter/extensions/Basic.jar"
        );
        assert_eq!(join_relative(".", "updater_cache.json"), "updater_cache.json");
        assert_eq!(join_relative("mods/", "/x.jar"), "mods/x.jar");
    }

    #[test]
    fn splits_parent_segments() {
        assert_eq!(parent_segments("plugins/Typewriter/x.jar"), vec!["plugins", "Typewriter"]);
        assert!(parent_segments("x.jar").is_empty());
    }

    #[test]
    fn rejects_escaping_file_names() {
        assert!(is_safe_file_name("plugin-1.0.jar"));
        assert!(is_safe_file_name("sub/plugin.jar"));
        assert!(!is_safe_file_name("../plugin.jar"));
        assert!(!is_safe_file_name("a/../../b.jar"));
        assert!(!is_safe_file_name("/etc/passwd"));
        assert!(!is_safe_file_name("C:\\x.jar"));
        assert!(!is_safe_file_name("  "));
    }
}
