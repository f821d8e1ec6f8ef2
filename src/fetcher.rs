use crate::security::is_private_ip;
use crate::PreviewError;
use async_trait::async_trait;
use reqwest::{header::HeaderMap, redirect, Client, Response};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::{Host, Url};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; PortalLinkPreview/1.0)";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_REDIRECTS: usize = 10;

/// Status and text body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP collaborator used for the single outbound GET.
///
/// Non-success statuses are returned as `Ok`; only transport problems are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, PreviewError>;
}

/// reqwest-backed [`HttpClient`].
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: Option<usize>,
}

/// Options for building a [`Fetcher`].
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-portal/1.0".to_string(),
///     max_body_bytes: Some(2 * 1024 * 1024),
///     ..Default::default()
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    /// Falls back to [`guarded_redirect_policy`] when `None`
    pub redirect_policy: Option<redirect::Policy>,
    /// Abort once the body grows past this many bytes; `None` reads it all
    pub max_body_bytes: Option<usize>,
    /// Ignore `HTTP_PROXY`-style environment settings
    pub no_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
            headers: None,
            redirect_policy: None,
            max_body_bytes: None,
            no_proxy: false,
        }
    }
}

impl Fetcher {
    pub fn new() -> Result<Self, PreviewError> {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .redirect(
                config
                    .redirect_policy
                    .unwrap_or_else(|| guarded_redirect_policy(MAX_REDIRECTS)),
            );

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if config.no_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            PreviewError::FetchError(e.to_string())
        })?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn read_body(&self, response: Response, url: &Url) -> Result<String, PreviewError> {
        let Some(limit) = self.max_body_bytes else {
            return response.text().await.map_err(|e| {
                error!(error = %e, url = %url, "Failed to read response body");
                PreviewError::FetchError(e.to_string())
            });
        };

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(PreviewError::BodyTooLarge { limit });
        }

        let mut response = response;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            PreviewError::FetchError(e.to_string())
        })? {
            if body.len() + chunk.len() > limit {
                return Err(PreviewError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl HttpClient for Fetcher {
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, PreviewError> {
        debug!("Starting fetch request");

        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PreviewError::TimeoutError(timeout)
                } else {
                    PreviewError::FetchError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            // The body is never used for a failed status.
            return Ok(HttpResponse {
                status,
                body: String::new(),
            });
        }

        let body = self.read_body(response, url).await?;
        debug!(status, content_length = body.len(), "Successfully fetched webpage");

        Ok(HttpResponse { status, body })
    }
}

/// Follows at most `max` redirects and refuses hops to non-http(s) schemes or
/// to literal private/reserved addresses.
///
/// Redirects to domain names are not resolved here.
pub fn guarded_redirect_policy(max: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= max {
            return attempt.error("too many redirects");
        }

        let next = attempt.url();
        if !matches!(next.scheme(), "http" | "https") {
            warn!(scheme = next.scheme(), "Refusing redirect to disallowed scheme");
            return attempt.error("redirect to disallowed scheme");
        }

        let literal = match next.host() {
            Some(Host::Ipv4(ip)) => Some(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => Some(IpAddr::V6(ip)),
            _ => None,
        };
        if literal.is_some_and(|ip| is_private_ip(&ip)) {
            warn!("Refusing redirect to private address");
            return attempt.error("redirect to private address");
        }

        attempt.follow()
    })
}
