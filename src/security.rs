use crate::error::PreviewError;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Configuration for URL validation
#[derive(Debug, Clone)]
pub struct UrlValidationConfig {
    /// Allowed URL schemes (default: ["http", "https"])
    pub allowed_schemes: HashSet<String>,
    /// Domain blacklist, matched against the host and its parent domains
    pub blocked_domains: HashSet<String>,
}

impl Default for UrlValidationConfig {
    fn default() -> Self {
        let mut allowed_schemes = HashSet::new();
        allowed_schemes.insert("http".to_string());
        allowed_schemes.insert("https".to_string());

        Self {
            allowed_schemes,
            blocked_domains: HashSet::new(),
        }
    }
}

/// Where a validated URL points before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTarget {
    /// Literal address, already checked against the private ranges.
    Ip(IpAddr),
    /// Domain name that still has to be resolved and checked.
    Domain(String),
}

#[derive(Debug, Clone)]
pub struct ValidatedUrl {
    pub url: Url,
    pub target: HostTarget,
}

/// Validates a URL according to security policies
#[derive(Debug, Clone)]
pub struct UrlValidator {
    config: UrlValidationConfig,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl UrlValidator {
    pub fn new(config: UrlValidationConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(UrlValidationConfig::default())
    }

    /// Parses `url_str` and applies every check that needs no network access.
    pub fn validate(&self, url_str: &str) -> Result<ValidatedUrl, PreviewError> {
        let url = Url::parse(url_str)?;

        if !self.config.allowed_schemes.contains(url.scheme()) {
            return Err(PreviewError::InvalidUrlScheme(url.scheme().to_string()));
        }

        let target = match url.host() {
            Some(Host::Ipv4(ip)) => check_address(IpAddr::V4(ip))?,
            Some(Host::Ipv6(ip)) => check_address(IpAddr::V6(ip))?,
            Some(Host::Domain(domain)) => {
                if self.is_domain_blocked(domain) {
                    return Err(PreviewError::DomainBlocked(domain.to_string()));
                }
                HostTarget::Domain(domain.to_string())
            }
            None => return Err(PreviewError::MissingHost),
        };

        Ok(ValidatedUrl { url, target })
    }

    fn is_domain_blocked(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.config
            .blocked_domains
            .iter()
            .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")))
    }
}

fn check_address(ip: IpAddr) -> Result<HostTarget, PreviewError> {
    ensure_public(ip)?;
    Ok(HostTarget::Ip(ip))
}

/// Fails with [`PreviewError::PrivateIpBlocked`] when `ip` must not be fetched.
pub fn ensure_public(ip: IpAddr) -> Result<(), PreviewError> {
    if is_private_ip(&ip) {
        return Err(PreviewError::PrivateIpBlocked(ip));
    }
    Ok(())
}

/// Returns `true` for loopback, private, link-local (including the cloud
/// metadata endpoint) and "this network" addresses.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => match ipv6.to_ipv4_mapped() {
            Some(mapped) => is_private_ipv4(&mapped),
            None => is_private_ipv6(ipv6),
        },
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();

    // 0.0.0.0/8
    octets[0] == 0
        // 10.0.0.0/8
        || octets[0] == 10
        // 127.0.0.0/8
        || octets[0] == 127
        // 169.254.0.0/16 (link-local, metadata endpoint)
        || (octets[0] == 169 && octets[1] == 254)
        // 172.16.0.0/12
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        // 192.168.0.0/16
        || (octets[0] == 192 && octets[1] == 168)
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];

    ip.is_loopback()
        // :: reaches the local host when connected to
        || ip.is_unspecified()
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
}
