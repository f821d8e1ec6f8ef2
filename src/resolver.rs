use crate::PreviewError;
use async_trait::async_trait;
use std::net::IpAddr;
use tracing::{debug, instrument};

/// Name-resolution collaborator.
///
/// Implementations return every address the name maps to; callers treat an
/// error or an empty answer as unsafe.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, PreviewError>;
}

/// Resolves through the operating system via [`tokio::net::lookup_host`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, PreviewError> {
        // Port is irrelevant, lookup_host just needs a socket address shape.
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| PreviewError::DnsError {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        let mut ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
        ips.dedup();

        debug!(host = %host, count = ips.len(), "Resolved host");
        Ok(ips)
    }
}
