//! Stage 1 name resolution.
//!
//! One attempt per domain with a short timeout. NXDOMAIN is reported as
//! `NameNotFound`; everything else (timeouts, SERVFAIL, empty answers) is an
//! ordinary error so the caller can fall back conservatively.

use crate::error::DomainSieveError;
use crate::protocols::NameResolver;
use async_trait::async_trait;
use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;

/// Async DNS resolver for the prescreen.
#[derive(Clone)]
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsResolver {
    /// Create a resolver against the default upstream servers.
    pub fn new(timeout: Duration) -> Self {
        Self::with_config(ResolverConfig::default(), timeout)
    }

    /// Create a resolver against specific upstream servers.
    pub fn with_config(config: ResolverConfig, timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4thenIpv6;
        opts.use_hosts_file = false;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }

    /// Configured per-lookup timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    async fn resolve(&self, hostname: &str) -> Result<IpAddr, DomainSieveError> {
        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(hostname))
            .await
            .map_err(|_| DomainSieveError::timeout("DNS lookup", self.timeout))?;

        match lookup {
            Ok(ips) => ips.iter().next().ok_or_else(|| {
                DomainSieveError::network(format!("DNS answer for {} had no addresses", hostname))
            }),
            Err(e) => Err(classify_resolve_error(hostname, &e, self.timeout)),
        }
    }
}

/// Map a hickory error onto the pipeline taxonomy.
fn classify_resolve_error(
    hostname: &str,
    err: &ResolveError,
    timeout: Duration,
) -> DomainSieveError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                DomainSieveError::name_not_found(hostname)
            } else {
                // NODATA: the name exists without address records
                DomainSieveError::network_with_source(
                    format!("No address records for {}", hostname),
                    response_code.to_string(),
                )
            }
        }
        ResolveErrorKind::Timeout => DomainSieveError::timeout("DNS lookup", timeout),
        _ => DomainSieveError::network_with_source("DNS lookup failed", err.to_string()),
    }
}
