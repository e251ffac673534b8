//! RDAP (Registration Data Access Protocol) registry lookups.
//!
//! A 200 response carries registration data, a 404 means the registry has no
//! record, 429 and 5xx are transient.

use crate::error::DomainSieveError;
use crate::protocols::registry::{extract_tld, RdapEndpoints};
use crate::protocols::RegistryLookup;
use crate::types::RegistryResponse;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// RDAP client for Stage 2 verification.
pub struct RdapClient {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// Endpoint table plus bootstrap discovery
    endpoints: RdapEndpoints,
    /// Timeout for one RDAP request
    timeout: Duration,
}

impl RdapClient {
    /// Create a new RDAP client.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, DomainSieveError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("domain-sieve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainSieveError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            endpoints: RdapEndpoints::new(http_client.clone(), use_bootstrap),
            http_client,
            timeout,
        })
    }

    async fn query(&self, domain: &str) -> Result<RegistryResponse, DomainSieveError> {
        let tld = extract_tld(domain)?;
        let endpoint = self.endpoints.endpoint_for(&tld).await?;
        let rdap_url = format!("{}{}", endpoint, domain);

        tracing::trace!(url = %rdap_url, "RDAP request");

        let response = self.http_client.get(&rdap_url).send().await.map_err(|e| {
            if e.is_timeout() {
                DomainSieveError::timeout("RDAP request", self.timeout)
            } else {
                DomainSieveError::registry(domain, format!("Request failed: {}", e))
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let json = response.json::<serde_json::Value>().await.map_err(|e| {
                    DomainSieveError::parse(format!(
                        "Failed to parse RDAP JSON for {}: {}",
                        domain, e
                    ))
                })?;
                Ok(parse_rdap_response(&json))
            }
            StatusCode::NOT_FOUND => Err(DomainSieveError::no_match(domain)),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(DomainSieveError::RateLimited {
                    service: "RDAP".to_string(),
                    message: format!("HTTP 429 for {}", domain),
                    retry_after,
                })
            }
            code => Err(DomainSieveError::registry_with_status(
                domain,
                format!("RDAP server returned error: {}", code),
                code.as_u16(),
            )),
        }
    }
}

#[async_trait]
impl RegistryLookup for RdapClient {
    async fn lookup(&self, domain: &str) -> Result<RegistryResponse, DomainSieveError> {
        self.query(domain).await
    }

    fn protocol(&self) -> &'static str {
        "rdap"
    }
}

/// Extract registration data from an RDAP domain object.
///
/// Missing or malformed members are simply left empty; classification then
/// happens on whatever fields were present.
pub fn parse_rdap_response(json: &serde_json::Value) -> RegistryResponse {
    let mut response = RegistryResponse::default();

    for key in ["ldhName", "unicodeName"] {
        if let Some(name) = json.get(key).and_then(|n| n.as_str()) {
            if !name.is_empty() && !response.names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                response.names.push(name.to_string());
            }
        }
    }

    if let Some(entities) = json.get("entities").and_then(|e| e.as_array()) {
        response.registrar = entities
            .iter()
            .filter(|entity| {
                entity
                    .get("roles")
                    .and_then(|r| r.as_array())
                    .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrar")))
            })
            .find_map(|entity| {
                extract_vcard_name(entity).or_else(|| extract_entity_handle(entity))
            });
    }

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            if let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) {
                match action {
                    "registration" => response.creation_date = Some(date.to_string()),
                    "expiration" => response.expiration_date = Some(date.to_string()),
                    _ => {}
                }
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        response.status = statuses
            .iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect();
    }

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        response.nameservers = nameservers
            .iter()
            .filter_map(|ns| ns.get("ldhName").and_then(|n| n.as_str()))
            .map(String::from)
            .collect();
    }

    response
}

/// Extract the formatted name (`fn`) from an entity's vCard.
fn extract_vcard_name(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())
        .and_then(|items| {
            items.iter().filter_map(|item| item.as_array()).find_map(|item| {
                if item.len() >= 4 && item.first().and_then(|f| f.as_str()) == Some("fn") {
                    item.get(3).and_then(|n| n.as_str()).map(String::from)
                } else {
                    None
                }
            })
        })
}

/// Fall back to publicIds, then handle.
fn extract_entity_handle(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
        .or_else(|| entity.get("handle").and_then(|h| h.as_str()))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdap_client_creation() {
        assert!(RdapClient::with_config(Duration::from_secs(5), false).is_ok());
    }

    #[test]
    fn test_parse_full_response() {
        let json = serde_json::json!({
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "events": [
                { "eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z" },
                { "eventAction": "expiration", "eventDate": "2030-08-13T04:00:00Z" }
            ],
            "status": ["client delete prohibited", "client transfer prohibited"],
            "entities": [{
                "roles": ["registrar"],
                "vcardArray": ["vcard", [["fn", {}, "text", "Example Registrar Inc."]]]
            }],
            "nameservers": [{ "ldhName": "A.IANA-SERVERS.NET" }]
        });

        let response = parse_rdap_response(&json);
        assert_eq!(response.names, vec!["EXAMPLE.COM".to_string()]);
        assert_eq!(
            response.expiration_date.as_deref(),
            Some("2030-08-13T04:00:00Z")
        );
        assert_eq!(response.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(response.status.len(), 2);
        assert_eq!(response.registrar.as_deref(), Some("Example Registrar Inc."));
        assert_eq!(response.nameservers, vec!["A.IANA-SERVERS.NET".to_string()]);
        assert!(response.indicates_registered());
    }

    #[test]
    fn test_parse_empty_object_is_not_registered() {
        let json = serde_json::json!({ "rdapConformance": ["rdap_level_0"] });
        let response = parse_rdap_response(&json);
        assert!(!response.indicates_registered());
    }

    #[test]
    fn test_registrar_falls_back_to_handle() {
        let json = serde_json::json!({
            "entities": [
                { "roles": ["registrant"], "handle": "OWNER-1" },
                {
                    "roles": ["registrar"],
                    "publicIds": [{ "type": "IANA Registrar ID", "identifier": "292" }]
                }
            ]
        });
        assert_eq!(parse_rdap_response(&json).registrar.as_deref(), Some("292"));
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let json = serde_json::json!({ "ldhName": "example.com", "unicodeName": "EXAMPLE.COM" });
        assert_eq!(parse_rdap_response(&json).names.len(), 1);
    }
}
