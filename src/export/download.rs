//! Streaming attachment downloads

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Fetches a remote file into a local path
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `destination`, returning the number of bytes written
    async fn download(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// Downloads over HTTP, writing the body to disk chunk by chunk
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn stream_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status,
                message: format!("download of {} failed", url),
            });
        }

        let mut file = File::create(destination)
            .await
            .map_err(|e| Error::io_at(destination, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_at(destination, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::io_at(destination, e))?;

        Ok(written)
    }
}

/// Removes a download target on drop unless the download finished.
///
/// Covers both a failed transfer and a transfer whose future is dropped
/// mid-stream, e.g. when a sibling attachment fails.
struct PartialDownload<'a> {
    path: &'a Path,
    complete: bool,
}

impl<'a> PartialDownload<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            complete: false,
        }
    }

    fn complete(mut self) {
        self.complete = true;
    }
}

impl Drop for PartialDownload<'_> {
    fn drop(&mut self) {
        if self.complete {
            return;
        }
        if let Err(err) = std::fs::remove_file(self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Could not remove partial download {}: {}",
                    self.path.display(),
                    err
                );
            }
        } else {
            debug!("Removed partial download {}", self.path.display());
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let partial = PartialDownload::new(destination);
        let written = self.stream_to_file(url, destination).await?;
        partial.complete();
        debug!("Downloaded {} bytes to {}", written, destination.display());
        Ok(written)
    }
}
