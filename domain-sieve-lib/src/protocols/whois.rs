//! WHOIS registry lookups through the system `whois` command.
//!
//! WHOIS output is free text that varies by registry. Registration fields are
//! extracted by key; a response with none of them is handed back empty and
//! classified by the verifier like any other field-less response.

use crate::error::DomainSieveError;
use crate::protocols::RegistryLookup;
use crate::types::RegistryResponse;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

const NO_MATCH_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "status: available",
    "status: free",
    "not registered",
    "no matching record",
    "the queried object does not exist",
    "object does not exist",
    "domain name not found",
    "this domain name has not been registered",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
];

const NAME_KEYS: &[&str] = &["domain name", "domain"];
const EXPIRY_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires",
    "paid-till",
];
const STATUS_KEYS: &[&str] = &["domain status", "status", "state"];
const REGISTRAR_KEYS: &[&str] = &["registrar"];
const CREATED_KEYS: &[&str] = &["creation date", "created", "registered"];
const NAMESERVER_KEYS: &[&str] = &["name server", "nserver", "nameservers"];

/// WHOIS client for Stage 2 verification.
#[derive(Clone)]
pub struct WhoisClient {
    /// Timeout for one WHOIS query
    timeout: Duration,
}

impl WhoisClient {
    /// Create a new WHOIS client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query(&self, domain: &str) -> Result<RegistryResponse, DomainSieveError> {
        let lookup = Command::new("whois").arg(domain).output();
        let output = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| DomainSieveError::timeout("WHOIS query", self.timeout))?
            .map_err(|e| {
                DomainSieveError::registry(
                    domain,
                    format!(
                        "Failed to execute whois command: {}. Make sure 'whois' is installed.",
                        e
                    ),
                )
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        parse_whois_response(domain, &text)
    }
}

#[async_trait]
impl RegistryLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> Result<RegistryResponse, DomainSieveError> {
        self.query(domain).await
    }

    fn protocol(&self) -> &'static str {
        "whois"
    }
}

/// Parse raw WHOIS output.
///
/// An explicit `Status: free` / `Status: available` line is a no-match even when
/// the registry echoes the queried name back. Otherwise registration fields win
/// over availability phrases, since registries often include boilerplate that
/// mentions "not found" in their terms of use.
///
/// # Errors
///
/// `RateLimited` for throttling notices, `NoMatch` for explicit no-match
/// answers, `RegistryError` for empty output.
pub fn parse_whois_response(
    domain: &str,
    text: &str,
) -> Result<RegistryResponse, DomainSieveError> {
    if text.trim().is_empty() {
        return Err(DomainSieveError::registry(domain, "Empty WHOIS response"));
    }

    let lower = text.to_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(DomainSieveError::rate_limited(
            "WHOIS",
            format!("throttled on {}", domain),
        ));
    }

    let mut response = RegistryResponse::default();
    let mut status_says_available = false;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if NAME_KEYS.contains(&key.as_str()) {
            if !response.names.iter().any(|n| n.eq_ignore_ascii_case(value)) {
                response.names.push(value.to_string());
            }
        } else if EXPIRY_KEYS.contains(&key.as_str()) {
            response.expiration_date.get_or_insert_with(|| value.to_string());
        } else if STATUS_KEYS.contains(&key.as_str()) {
            // "clientTransferProhibited https://icann.org/epp#..." keeps the token
            if let Some(token) = value.split_whitespace().next() {
                let token = token.to_string();
                if is_availability_status(&token) {
                    status_says_available = true;
                } else if !response.status.contains(&token) {
                    response.status.push(token);
                }
            }
        } else if REGISTRAR_KEYS.contains(&key.as_str()) {
            response.registrar.get_or_insert_with(|| value.to_string());
        } else if CREATED_KEYS.contains(&key.as_str()) {
            response.creation_date.get_or_insert_with(|| value.to_string());
        } else if NAMESERVER_KEYS.contains(&key.as_str()) {
            response.nameservers.push(value.to_lowercase());
        }
    }

    // DENIC and SWITCH echo "Domain: <name>" in their not-found replies
    let registered_marker = !response.status.is_empty() || response.expiration_date.is_some();
    if status_says_available && !registered_marker {
        return Err(DomainSieveError::no_match(domain));
    }

    if response.indicates_registered() {
        return Ok(response);
    }

    if NO_MATCH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(DomainSieveError::no_match(domain));
    }

    Ok(response)
}

fn is_availability_status(token: &str) -> bool {
    matches!(token.to_lowercase().as_str(), "available" | "free")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registered_output() {
        let text = "   Domain Name: EXAMPLE.COM\n\
                    Registry Domain ID: 2336799_DOMAIN_COM-VRSN\n\
                    Registrar: RESERVED-Internet Assigned Numbers Authority\n\
                    Creation Date: 1995-08-14T04:00:00Z\n\
                    Registry Expiry Date: 2030-08-13T04:00:00Z\n\
                    Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\n\
                    Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\n\
                    Name Server: A.IANA-SERVERS.NET\n\
                    >>> Last update of whois database: 2026-10-19T08:00:00Z <<<\n\
                    NOTICE: ... if the record is not found ...\n";

        let response = parse_whois_response("example.com", text).unwrap();
        assert_eq!(response.names, vec!["EXAMPLE.COM".to_string()]);
        assert_eq!(
            response.expiration_date.as_deref(),
            Some("2030-08-13T04:00:00Z")
        );
        assert_eq!(
            response.status,
            vec![
                "clientDeleteProhibited".to_string(),
                "clientTransferProhibited".to_string()
            ]
        );
        assert_eq!(response.nameservers, vec!["a.iana-servers.net".to_string()]);
        assert!(response.indicates_registered());
    }

    #[test]
    fn test_parse_no_match_output() {
        let text =
            "No match for \"ZZZZZZQX.COM\".\n>>> Last update of whois database: 2026-10-19 <<<\n";
        let err = parse_whois_response("zzzzzzqx.com", text).unwrap_err();
        assert!(matches!(err, DomainSieveError::NoMatch { .. }));
    }

    #[test]
    fn test_status_free_with_echoed_name_is_no_match() {
        let denic = "Domain: zzzzzzqx.de\nStatus: free\n";
        assert!(matches!(
            parse_whois_response("zzzzzzqx.de", denic),
            Err(DomainSieveError::NoMatch { .. })
        ));

        let switch = "Domain: free-name.ch\nStatus: available\n";
        assert!(matches!(
            parse_whois_response("free-name.ch", switch),
            Err(DomainSieveError::NoMatch { .. })
        ));

        let bare = "Status: free\n";
        assert!(matches!(
            parse_whois_response("x.de", bare),
            Err(DomainSieveError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_registered_status_beats_availability_boilerplate() {
        let text = "Domain: taken.de\nStatus: connect\nNote: status: free means unregistered\n";
        let response = parse_whois_response("taken.de", text).unwrap();
        assert_eq!(response.status, vec!["connect".to_string()]);
        assert!(response.indicates_registered());
    }

    #[test]
    fn test_rate_limit_detection() {
        let err =
            parse_whois_response("a.com", "Rate limit exceeded. Try again later.").unwrap_err();
        assert!(matches!(err, DomainSieveError::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let err = parse_whois_response("a.com", "  \n").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unrecognized_output_has_no_fields() {
        let text = "% This server has nothing useful to say\n";
        let response = parse_whois_response("a.com", text).unwrap();
        assert!(!response.indicates_registered());
    }
}
