//! RDAP endpoint mappings and IANA bootstrap discovery.
//!
//! Endpoints come from a built-in table first. Suffixes outside the table are
//! looked up in the IANA bootstrap file, fetched once per [`RdapEndpoints`]
//! and kept for its lifetime.

use crate::error::DomainSieveError;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Get the built-in RDAP registry mappings.
///
/// Maps TLD strings (like "com", "org") to RDAP endpoint base URLs.
pub fn get_rdap_registry_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        (
            "org",
            "https://rdap.publicinterestregistry.org/rdap/domain/",
        ),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        // Google TLDs
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        // CentralNic managed gTLDs
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        // Identity Digital managed TLDs
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        // Country code TLDs
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
    ])
}

/// Extract the TLD from a domain name.
///
/// `"example.co.uk"` yields `"uk"`; the last label is what the bootstrap
/// file is keyed on.
pub fn extract_tld(domain: &str) -> Result<String, DomainSieveError> {
    let trimmed = domain.trim().trim_end_matches('.');
    match trimmed.rsplit_once('.') {
        Some((base, tld)) if !base.is_empty() && !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(DomainSieveError::parse(format!(
            "Domain '{}' has no TLD to look up",
            domain
        ))),
    }
}

#[derive(Default)]
struct BootstrapState {
    endpoints: HashMap<String, String>,
    missing: HashSet<String>,
    loaded: bool,
}

/// RDAP endpoint resolver owned by one RDAP client.
pub struct RdapEndpoints {
    use_bootstrap: bool,
    http_client: reqwest::Client,
    bootstrap: Mutex<BootstrapState>,
}

impl RdapEndpoints {
    /// Create an endpoint resolver.
    pub fn new(http_client: reqwest::Client, use_bootstrap: bool) -> Self {
        Self {
            use_bootstrap,
            http_client,
            bootstrap: Mutex::new(BootstrapState::default()),
        }
    }

    /// Find the RDAP endpoint for a TLD.
    ///
    /// Lookup order:
    /// 1. Built-in table
    /// 2. Bootstrap entries fetched earlier
    /// 3. Negative cache (TLDs known to have no RDAP service)
    /// 4. Full IANA bootstrap fetch, once, if enabled
    pub async fn endpoint_for(&self, tld: &str) -> Result<String, DomainSieveError> {
        let tld_lower = tld.to_lowercase();

        if let Some(endpoint) = get_rdap_registry_map().get(tld_lower.as_str()) {
            return Ok(endpoint.to_string());
        }

        if !self.use_bootstrap {
            return Err(DomainSieveError::bootstrap(
                &tld_lower,
                "No known RDAP endpoint and bootstrap disabled",
            ));
        }

        // Lock held across the fetch: one bootstrap download per client
        let mut state = self.bootstrap.lock().await;

        if let Some(endpoint) = state.endpoints.get(&tld_lower) {
            return Ok(endpoint.clone());
        }
        if state.missing.contains(&tld_lower) {
            return Err(DomainSieveError::bootstrap(
                &tld_lower,
                "TLD has no known RDAP endpoint",
            ));
        }

        if !state.loaded {
            let endpoints = self.fetch_bootstrap().await?;
            tracing::info!(tlds = endpoints.len(), "loaded IANA RDAP bootstrap registry");
            state.endpoints = endpoints;
            state.loaded = true;
        }

        if let Some(endpoint) = state.endpoints.get(&tld_lower) {
            return Ok(endpoint.clone());
        }

        state.missing.insert(tld_lower.clone());
        Err(DomainSieveError::bootstrap(
            &tld_lower,
            "TLD not found in IANA bootstrap registry",
        ))
    }

    async fn fetch_bootstrap(&self) -> Result<HashMap<String, String>, DomainSieveError> {
        let response = self
            .http_client
            .get(BOOTSTRAP_URL)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                DomainSieveError::bootstrap(
                    "*",
                    format!("Failed to fetch bootstrap registry: {}", e),
                )
            })?;

        if !response.status().is_success() {
            return Err(DomainSieveError::bootstrap(
                "*",
                format!("Bootstrap registry returned HTTP {}", response.status()),
            ));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            DomainSieveError::bootstrap("*", format!("Failed to parse bootstrap JSON: {}", e))
        })?;

        parse_bootstrap(&json)
    }
}

/// Parse the IANA RDAP bootstrap document into a TLD → endpoint map.
pub fn parse_bootstrap(
    json: &serde_json::Value,
) -> Result<HashMap<String, String>, DomainSieveError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| {
            DomainSieveError::bootstrap(
                "*",
                "Invalid bootstrap JSON: missing or invalid 'services' array",
            )
        })?;

    let mut endpoints = HashMap::new();

    for service in services.iter().filter_map(|s| s.as_array()) {
        if service.len() < 2 {
            continue;
        }

        let url = service[1]
            .as_array()
            .and_then(|urls| urls.first())
            .and_then(|u| u.as_str());

        if let (Some(url), Some(tlds)) = (url, service[0].as_array()) {
            let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
            for tld in tlds.iter().filter_map(|t| t.as_str()) {
                endpoints.insert(tld.to_lowercase(), endpoint.clone());
            }
        }
    }

    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tld() {
        assert_eq!(extract_tld("example.com").unwrap(), "com");
        assert_eq!(extract_tld("example.co.uk").unwrap(), "uk");
        assert_eq!(extract_tld("Example.COM.").unwrap(), "com");
        assert!(extract_tld("example").is_err());
        assert!(extract_tld(".com").is_err());
    }

    #[test]
    fn test_registry_map_has_common_tlds() {
        let map = get_rdap_registry_map();
        assert!(map.contains_key("com"));
        assert!(map.contains_key("net"));
        assert!(map.values().all(|url| url.ends_with("/domain/")));
    }

    #[test]
    fn test_parse_bootstrap() {
        let json = serde_json::json!({
            "services": [
                [["shop", "Store"], ["https://rdap.example-shop.test/rdap/"]],
                [["zz"], []],
                ["malformed"]
            ]
        });

        let endpoints = parse_bootstrap(&json).unwrap();
        assert_eq!(
            endpoints.get("shop").map(String::as_str),
            Some("https://rdap.example-shop.test/rdap/domain/")
        );
        assert!(endpoints.contains_key("store"));
        assert!(!endpoints.contains_key("zz"));
    }

    #[test]
    fn test_parse_bootstrap_rejects_bad_document() {
        let json = serde_json::json!({ "version": "1.0" });
        assert!(parse_bootstrap(&json).is_err());
    }

    #[tokio::test]
    async fn test_builtin_endpoint_needs_no_network() {
        let endpoints = RdapEndpoints::new(reqwest::Client::new(), false);
        let url = endpoints.endpoint_for("COM").await.unwrap();
        assert_eq!(url, "https://rdap.verisign.com/com/v1/domain/");
    }

    #[tokio::test]
    async fn test_unknown_tld_without_bootstrap_fails() {
        let endpoints = RdapEndpoints::new(reqwest::Client::new(), false);
        let err = endpoints.endpoint_for("notarealtld").await.unwrap_err();
        assert!(matches!(err, DomainSieveError::BootstrapError { .. }));
        assert!(!err.is_retryable());
    }
}
