use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::transfer::{ArtifactFetcher, StagedFile};

/// Streams artifacts over HTTP into temporary files.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` into a fresh temporary file.
    ///
    /// The body is streamed chunk by chunk so large jars never sit in memory.
    /// The file handle is flushed and dropped before returning so the staged
    /// path can be moved on every platform.
    pub async fn download_file(&self, url: &str) -> UpdaterResult<StagedFile> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let staged = NamedTempFile::new()?;
        let (std_file, path) = staged.into_parts();
        let staged = StagedFile::new(path);

        let mut written: u64 = 0;
        {
            let mut file = tokio::fs::File::from_std(std_file);
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await.map_err(|e| UpdaterError::Io {
                    path: staged.path().to_path_buf(),
                    source: e,
                })?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| UpdaterError::Io {
                path: staged.path().to_path_buf(),
                source: e,
            })?;
        }

        debug!("Downloaded {} ({} bytes) -> {:?}", url, written, staged.path());
        Ok(staged)
    }
}

#[async_trait]
impl ArtifactFetcher for Downloader {
    async fn fetch(&self, url: &str) -> UpdaterResult<StagedFile> {
        self.download_file(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn streams_body_into_staged_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/plugin.jar");
                then.status(200).body("jar-bytes");
            })
            .await;

        let downloader = Downloader::new(Client::new());
        let staged = downloader.fetch(&server.url("/files/plugin.jar")).await.unwrap();

        let contents = tokio::fs::read(staged.path()).await.unwrap();
        assert_eq!(contents, b"jar-bytes");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/gone.jar");
                then.status(410);
            })
            .await;

        let downloader = Downloader::new(Client::new());
        let err = downloader
            .fetch(&server.url("/files/gone.jar"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::DownloadFailed { status: 410, .. }));
    }

    #[tokio::test]
    async fn staged_file_is_removed_on_drop() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a.jar");
                then.status(200).body("a");
            })
            .await;

        let downloader = Downloader::new(Client::new());
        let staged = downloader.fetch(&server.url("/a.jar")).await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }
}
