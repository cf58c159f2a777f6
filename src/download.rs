//! HTTP downloads for runtime archives and install scripts.

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors from fetching a URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("writing {path}: {message}")]
    Write { path: String, message: String },
}

/// Fetches remote resources.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch a small text document.
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;

    /// Stream a resource into `dest`, returning the lowercase hex SHA-256 of
    /// the bytes written.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<String, DownloadError>;
}

/// [`Downloader`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Build a client with a user agent and an overall request timeout.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cli-provisioner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        tracing::debug!(url, "fetching");
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<String, DownloadError> {
        tracing::debug!(url, dest = %dest.display(), "downloading");
        let write_err = |e: std::io::Error| DownloadError::Write {
            path: dest.display().to_string(),
            message: e.to_string(),
        };

        let response = self.get(url).await?;
        let mut file = tokio::fs::File::create(dest).await.map_err(write_err)?;
        let mut hasher = Sha256::new();
        let mut total_bytes = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(write_err)?;
            total_bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        tracing::debug!(url, bytes = total_bytes, "download complete");
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DownloadError::Status {
            url: "https://example.invalid/install.sh".to_string(),
            status: 404,
        };
        assert_eq!(
            error.to_string(),
            "https://example.invalid/install.sh returned HTTP 404"
        );
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpDownloader::new(Duration::from_secs(30)).is_ok());
    }
}
