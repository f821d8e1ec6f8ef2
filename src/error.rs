use std::fmt;
use std::net::IpAddr;
use thiserror::Error;
use tracing::{error, warn};

/// The only message a caller ever sees, whichever step failed.
pub const PUBLIC_ERROR_MESSAGE: &str = "Failed to fetch link preview";

/// Coarse classification of a failed preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidInput,
    Forbidden,
    ResolutionFailed,
    FetchFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Forbidden => "forbidden",
            FailureKind::ResolutionFailed => "resolution_failed",
            FailureKind::FetchFailed => "fetch_failed",
        };
        f.write_str(name)
    }
}

/// Detailed internal error. Never leaves the crate as-is; see [`PreviewFailure`].
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("URL scheme not allowed: {0}")]
    InvalidUrlScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Domain is blocked: {0}")]
    DomainBlocked(String),

    #[error("Address is private or reserved: {0}")]
    PrivateIpBlocked(IpAddr),

    #[error("Failed to resolve {host}: {message}")]
    DnsError { host: String, message: String },

    #[error("Resolution of {0} returned no addresses")]
    NoAddresses(String),

    #[error("Resolution timed out after {0:?}")]
    DnsTimeout(std::time::Duration),

    #[error("Server returned status {0}")]
    HttpStatus(u16),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Request timeout: {0:?}")]
    TimeoutError(std::time::Duration),

    #[error("Response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PreviewError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PreviewError::UrlParseError(_)
            | PreviewError::InvalidUrlScheme(_)
            | PreviewError::MissingHost => FailureKind::InvalidInput,
            PreviewError::DomainBlocked(_) | PreviewError::PrivateIpBlocked(_) => {
                FailureKind::Forbidden
            }
            PreviewError::DnsError { .. }
            | PreviewError::NoAddresses(_)
            | PreviewError::DnsTimeout(_) => FailureKind::ResolutionFailed,
            PreviewError::HttpStatus(_)
            | PreviewError::FetchError(_)
            | PreviewError::TimeoutError(_)
            | PreviewError::BodyTooLarge { .. }
            | PreviewError::InvalidConfig(_) => FailureKind::FetchFailed,
        }
    }

    pub fn log(&self) {
        match self {
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::InvalidUrlScheme(scheme) => {
                warn!(scheme = %scheme, "Rejected URL scheme");
            }
            PreviewError::MissingHost => {
                warn!("Rejected URL without host");
            }
            PreviewError::DomainBlocked(domain) => {
                warn!(domain = %domain, "Blocked domain");
            }
            PreviewError::PrivateIpBlocked(ip) => {
                warn!(ip = %ip, "Blocked private or reserved address");
            }
            PreviewError::DnsError { host, message } => {
                warn!(host = %host, error = %message, "Name resolution failed");
            }
            PreviewError::NoAddresses(host) => {
                warn!(host = %host, "Name resolution returned no addresses");
            }
            PreviewError::DnsTimeout(after) => {
                warn!(timeout = ?after, "Name resolution timed out");
            }
            PreviewError::HttpStatus(status) => {
                warn!(status = status, "Preview target returned non-success status");
            }
            PreviewError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::TimeoutError(after) => {
                warn!(timeout = ?after, "Request timed out");
            }
            PreviewError::BodyTooLarge { limit } => {
                warn!(limit = limit, "Response body over size limit");
            }
            PreviewError::InvalidConfig(e) => {
                error!(error = %e, "Invalid preview configuration");
            }
        }
    }
}

/// Opaque failure handed back to callers.
///
/// Displays as [`PUBLIC_ERROR_MESSAGE`] regardless of cause so nothing about
/// the internal network (resolved addresses, DNS errors, status codes) leaks
/// to whoever triggered the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewFailure {
    kind: FailureKind,
}

impl PreviewFailure {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        PUBLIC_ERROR_MESSAGE
    }
}

impl fmt::Display for PreviewFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PUBLIC_ERROR_MESSAGE)
    }
}

impl std::error::Error for PreviewFailure {}

impl From<PreviewError> for PreviewFailure {
    fn from(err: PreviewError) -> Self {
        Self::new(err.kind())
    }
}
