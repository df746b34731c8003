use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PlacementTarget, StagedFile};
use crate::core::error::{UpdaterError, UpdaterResult};

/// Places artifacts below a directory on this machine.
pub struct LocalTarget {
    root: PathBuf,
}

impl LocalTarget {
    /// Open `root`, creating it when missing.
    pub async fn open(root: impl Into<PathBuf>) -> UpdaterResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| UpdaterError::Io {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> UpdaterError + '_ {
    move |source| UpdaterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl PlacementTarget for LocalTarget {
    fn describe(&self) -> String {
        format!("local directory {:?}", self.root)
    }

    async fn place(&mut self, relative: &str, staged: StagedFile) -> UpdaterResult<()> {
        let dest = self.resolve(relative);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }

        // rename onto an existing file is not portable
        if tokio::fs::try_exists(&dest).await.map_err(io_err(&dest))? {
            tokio::fs::remove_file(&dest).await.map_err(io_err(&dest))?;
        }

        let renamed = tokio::fs::rename(staged.path(), &dest).await;
        match renamed {
            Ok(()) => staged.keep(),
            Err(e) => {
                // staging area may live on another filesystem
                debug!("rename into {:?} failed ({}), copying instead", dest, e);
                tokio::fs::copy(staged.path(), &dest)
                    .await
                    .map_err(io_err(&dest))?;
            }
        }

        debug!("Placed {:?}", dest);
        Ok(())
    }

    async fn remove(&mut self, relative: &str) -> UpdaterResult<()> {
        let path = self.resolve(relative);
        tokio::fs::remove_file(&path).await.map_err(io_err(&path))
    }

    async fn read_document(&mut self, name: &str) -> UpdaterResult<Option<Vec<u8>>> {
        let path = self.resolve(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    async fn write_document(&mut self, name: &str, contents: &[u8]) -> UpdaterResult<()> {
        let path = self.resolve(name);
        let tmp = self.resolve(&format!("{}.tmp", name));

        tokio::fs::write(&tmp, contents).await.map_err(io_err(&tmp))?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err(&path))
    }
}
