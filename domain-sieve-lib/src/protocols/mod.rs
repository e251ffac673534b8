//! External collaborators used by the two stages.
//!
//! Stage 1 talks to a [`NameResolver`]; Stage 2 talks to a [`RegistryLookup`].
//! Both are traits so the pipeline can run against in-memory doubles.

use crate::error::DomainSieveError;
use crate::types::RegistryResponse;
use async_trait::async_trait;
use std::net::IpAddr;

/// DNS resolution through hickory-resolver
pub mod dns;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS protocol implementation
pub mod whois;

/// Registry endpoint mappings and bootstrap discovery
pub mod registry;

pub use dns::DnsResolver;
pub use rdap::{parse_rdap_response, RdapClient};
pub use registry::{extract_tld, get_rdap_registry_map, RdapEndpoints};
pub use whois::{parse_whois_response, WhoisClient};

/// Name Resolution Service.
///
/// Implementations must bound every call by their own timeout.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `hostname` to one address.
    ///
    /// # Errors
    ///
    /// `DomainSieveError::NameNotFound` for an explicit "no such name"
    /// answer; any other variant for timeouts and network failures.
    async fn resolve(&self, hostname: &str) -> Result<IpAddr, DomainSieveError>;
}

/// Registry Lookup Service.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Query the registry for `domain`.
    ///
    /// # Errors
    ///
    /// `DomainSieveError::NoMatch` when the registry holds no record; other
    /// variants for transport or registry failures.
    async fn lookup(&self, domain: &str) -> Result<RegistryResponse, DomainSieveError>;

    /// Short protocol name for logs.
    fn protocol(&self) -> &'static str;
}
