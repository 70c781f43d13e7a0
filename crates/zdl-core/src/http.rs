use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info};
use zdl_types::{Fetcher, ToolchainError};

const PROGRESS_STEP_BYTES: u64 = 8 * 1024 * 1024;

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, ToolchainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(format!("zdl/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ToolchainError::network_request_from("build http client", error))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ToolchainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| ToolchainError::network_request_from("download", error))?;

        if !response.status().is_success() {
            return Err(ToolchainError::network_status(
                "download",
                format!("HTTP {} for {url}", response.status()),
            ));
        }

        let total = response.content_length().unwrap_or(0);
        let mut body = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
        let mut next_report = PROGRESS_STEP_BYTES;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|error| ToolchainError::network_request_from("download", error))?;
            body.extend_from_slice(&chunk);

            let downloaded = body.len() as u64;
            if downloaded >= next_report {
                debug!("downloaded {downloaded}/{total} bytes from {url}");
                next_report += PROGRESS_STEP_BYTES;
            }
        }

        info!("Download complete: {} bytes from {url}", body.len());
        Ok(body)
    }
}
