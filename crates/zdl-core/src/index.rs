use log::debug;
use zdl_types::{Fetcher, Index, ToolchainError};

pub const INDEX_URL: &str = "https://ziglang.org/download/index.json";

/// Fetch and decode the release index. Never cached: `master` moves.
///
/// # Errors
/// Returns a network error if the download fails or the document is not a
/// valid index, and a parse error if it names an invalid version.
pub async fn fetch_index(fetcher: &dyn Fetcher, url: &str) -> Result<Index, ToolchainError> {
    debug!("fetching release index from {url}");
    let body = fetcher.fetch(url).await?;
    let index = Index::from_json(&body)?;
    debug!(
        "index lists {} release(s), master = {}",
        index.releases.len(),
        index
            .master
            .as_ref()
            .map_or_else(|| "<none>".to_string(), |m| m.version.to_string())
    );
    Ok(index)
}
