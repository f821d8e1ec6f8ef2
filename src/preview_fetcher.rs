use crate::cache::{CacheStrategy, PreviewCache};
use crate::extractor::{MetadataExtractor, PageMetadata};
use crate::fetcher::{
    Fetcher, FetcherConfig, HttpClient, DEFAULT_FETCH_TIMEOUT, DEFAULT_USER_AGENT,
};
use crate::resolver::{Resolver, SystemResolver};
use crate::security::{ensure_public, HostTarget, UrlValidationConfig, UrlValidator};
use crate::utils::truncate_chars;
use crate::{FailureKind, PreviewError, PreviewFailure, PreviewGenerator, PreviewResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`LinkPreviewFetcher`].
#[derive(Debug, Clone)]
pub struct LinkPreviewConfig {
    pub fetch_timeout: Duration,
    pub resolve_timeout: Duration,
    pub user_agent: String,
    pub max_title_chars: usize,
    pub max_description_chars: usize,
    /// Only applied to the built-in reqwest client
    pub max_body_bytes: Option<usize>,
    pub url_validation: UrlValidationConfig,
    pub cache: Option<PreviewCache>,
    pub cache_strategy: CacheStrategy,
}

impl Default for LinkPreviewConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_title_chars: MAX_TITLE_CHARS,
            max_description_chars: MAX_DESCRIPTION_CHARS,
            max_body_bytes: None,
            url_validation: UrlValidationConfig::default(),
            cache: None,
            cache_strategy: CacheStrategy::UseCache,
        }
    }
}

impl LinkPreviewConfig {
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    pub fn with_url_validation(mut self, url_validation: UrlValidationConfig) -> Self {
        self.url_validation = url_validation;
        self
    }

    pub fn with_cache(mut self, cache: PreviewCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_strategy(mut self, cache_strategy: CacheStrategy) -> Self {
        self.cache_strategy = cache_strategy;
        self
    }
}

/// Validates, resolves, fetches and scans a single URL for a post preview.
#[derive(Clone)]
pub struct LinkPreviewFetcher {
    validator: UrlValidator,
    resolver: Arc<dyn Resolver>,
    http: Arc<dyn HttpClient>,
    extractor: MetadataExtractor,
    headers: HeaderMap,
    config: LinkPreviewConfig,
}

impl LinkPreviewFetcher {
    /// Default settings, system resolver and a reqwest client.
    pub fn new() -> Result<Self, PreviewError> {
        Self::with_config(LinkPreviewConfig::default())
    }

    pub fn with_config(config: LinkPreviewConfig) -> Result<Self, PreviewError> {
        let fetcher = Fetcher::new_with_config(FetcherConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout,
            max_body_bytes: config.max_body_bytes,
            ..Default::default()
        })?;

        Self::from_parts(config, Arc::new(SystemResolver), Arc::new(fetcher))
    }

    /// Builds a fetcher around caller-supplied collaborators.
    pub fn from_parts(
        config: LinkPreviewConfig,
        resolver: Arc<dyn Resolver>,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, PreviewError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| PreviewError::InvalidConfig(format!("user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        Ok(Self {
            validator: UrlValidator::new(config.url_validation.clone()),
            resolver,
            http,
            extractor: MetadataExtractor::new(),
            headers,
            config,
        })
    }

    pub fn config(&self) -> &LinkPreviewConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&PreviewCache> {
        self.config.cache.as_ref()
    }

    /// Fetches a preview for `raw_url`.
    ///
    /// Every failure collapses into one opaque [`PreviewFailure`]; the
    /// detailed cause is logged here and goes no further.
    pub async fn fetch_preview(&self, raw_url: &str) -> Result<PreviewResult, PreviewFailure> {
        self.try_fetch_preview(raw_url).await.map_err(|e| {
            e.log();
            PreviewFailure::from(e)
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn try_fetch_preview(&self, raw_url: &str) -> Result<PreviewResult, PreviewError> {
        let validated = self.validator.validate(raw_url)?;
        let key = validated.url.as_str().to_owned();

        if let Some(cached) = self.cached(&key) {
            debug!(url = %key, "Serving preview from cache");
            return Ok(cached);
        }

        if let HostTarget::Domain(host) = &validated.target {
            self.check_resolved(host).await?;
        }

        // TODO: pin the connection to the checked address (ClientBuilder::resolve)
        // so the client cannot re-resolve the host to something else.
        let html = self.fetch_html(&validated.url).await?;
        let preview = self.build_preview(self.extractor.extract(&html));

        self.store(key, &preview);
        Ok(preview)
    }

    async fn check_resolved(&self, host: &str) -> Result<(), PreviewError> {
        let timeout = self.config.resolve_timeout;
        let addrs = tokio::time::timeout(timeout, self.resolver.resolve(host))
            .await
            .map_err(|_| PreviewError::DnsTimeout(timeout))?
            .map_err(|e| match e.kind() {
                FailureKind::ResolutionFailed => e,
                _ => PreviewError::DnsError {
                    host: host.to_string(),
                    message: e.to_string(),
                },
            })?;

        if addrs.is_empty() {
            return Err(PreviewError::NoAddresses(host.to_string()));
        }

        for ip in addrs {
            ensure_public(ip)?;
        }
        debug!(host = %host, "All resolved addresses are public");
        Ok(())
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, PreviewError> {
        let timeout = self.config.fetch_timeout;

        // Dropping the request future on expiry cancels the in-flight request.
        let response = tokio::time::timeout(timeout, self.http.get(url, &self.headers, timeout))
            .await
            .map_err(|_| PreviewError::TimeoutError(timeout))??;

        if !response.is_success() {
            return Err(PreviewError::HttpStatus(response.status));
        }
        Ok(response.body)
    }

    fn build_preview(&self, metadata: PageMetadata) -> PreviewResult {
        PreviewResult {
            title: metadata
                .title
                .map(|title| truncate_chars(title, self.config.max_title_chars)),
            description: metadata
                .description
                .map(|desc| truncate_chars(desc, self.config.max_description_chars)),
            image_url: metadata.image_url,
        }
    }

    fn cached(&self, key: &str) -> Option<PreviewResult> {
        match (&self.config.cache, self.config.cache_strategy) {
            (Some(cache), CacheStrategy::UseCache) => cache.get(key),
            _ => None,
        }
    }

    fn store(&self, key: String, preview: &PreviewResult) {
        match (&self.config.cache, self.config.cache_strategy) {
            (Some(cache), CacheStrategy::UseCache | CacheStrategy::ForceUpdate) => {
                cache.insert(key, preview.clone());
            }
            _ => {}
        }
    }
}

#[async_trait]
impl PreviewGenerator for LinkPreviewFetcher {
    async fn generate_preview(&self, url: &str) -> Result<PreviewResult, PreviewFailure> {
        self.fetch_preview(url).await
    }
}
