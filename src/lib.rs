//! SSRF-safe link previews for the news-feed post composer.
//!
//! ```ignore
//! use safe_link_preview::LinkPreviewFetcher;
//!
//! let fetcher = LinkPreviewFetcher::new()?;
//! match fetcher.fetch_preview("https://example.com").await {
//!     Ok(preview) => println!("{:?}", preview.title),
//!     Err(failure) => println!("{failure}"), // "Failed to fetch link preview"
//! }
//! ```

use async_trait::async_trait;

mod cache;
mod error;
mod extractor;
mod fetcher;
#[cfg(feature = "logging")]
mod logging;
mod preview_fetcher;
mod resolver;
mod security;
mod utils;

pub use cache::{CacheStrategy, PreviewCache, DEFAULT_CACHE_TTL};
pub use error::{FailureKind, PreviewError, PreviewFailure, PUBLIC_ERROR_MESSAGE};
pub use extractor::{MetadataExtractor, PageMetadata};
pub use fetcher::{
    guarded_redirect_policy, Fetcher, FetcherConfig, HttpClient, HttpResponse,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_USER_AGENT, MAX_REDIRECTS,
};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig, LogLevelGuard};
pub use preview_fetcher::{
    LinkPreviewConfig, LinkPreviewFetcher, DEFAULT_RESOLVE_TIMEOUT, MAX_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS,
};
pub use resolver::{Resolver, SystemResolver};
pub use security::{
    ensure_public, is_private_ip, HostTarget, UrlValidationConfig, UrlValidator, ValidatedUrl,
};
pub use utils::truncate_chars;

/// Title, description and image scanned from a linked page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PreviewResult {
    /// Attachment payload as stored by the post composer.
    pub fn to_attachment_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

#[async_trait]
pub trait PreviewGenerator: Send + Sync {
    async fn generate_preview(&self, url: &str) -> Result<PreviewResult, PreviewFailure>;
}
