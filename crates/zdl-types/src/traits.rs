use std::path::Path;

use async_trait::async_trait;

use crate::error::ToolchainError;

/// Retrieves a complete response body.
///
/// Implementations must buffer the whole payload before returning; callers
/// hand the bytes to an [`ArchiveExtractor`] only once the transfer is done.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ToolchainError>;
}

/// Expands an in-memory archive into a destination directory.
pub trait ArchiveExtractor: Send + Sync {
    /// # Errors
    /// Returns an error if the archive cannot be decoded or written to `dest`.
    fn extract(&self, archive: &[u8], dest: &Path) -> Result<(), ToolchainError>;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct StaticFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ToolchainError> {
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| ToolchainError::network_status("download", "HTTP 404"))
        }
    }

    #[tokio::test]
    async fn boxed_fetcher_dispatches_and_reports_missing_urls() {
        let fetcher: Box<dyn Fetcher> = Box::new(StaticFetcher {
            bodies: HashMap::from([("https://a".to_string(), b"body".to_vec())]),
            calls: Mutex::new(Vec::new()),
        });

        let body = fetcher.fetch("https://a").await.expect("known url");
        assert_eq!(body, b"body");

        let missing = fetcher.fetch("https://b").await;
        assert!(matches!(
            missing,
            Err(ToolchainError::NetworkError { .. })
        ));
    }
}
