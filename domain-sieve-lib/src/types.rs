//! Core data types for the availability pipeline.
//!
//! This module defines the domain queries flowing through both stages, the
//! classification outcomes, registry responses and the pipeline configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for the Stage 1 worker pool.
pub const MAX_STAGE1_WORKERS: usize = 500;

/// Upper bound for the Stage 2 worker pool.
pub const MAX_STAGE2_WORKERS: usize = 100;

/// One lookup target: a normalized candidate token plus the configured suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainQuery {
    token: String,
    domain: String,
}

impl DomainQuery {
    /// Build a query from an already-normalized token and a suffix.
    ///
    /// The suffix may be given with or without its leading dot.
    pub fn new(token: &str, suffix: &str) -> Self {
        let suffix = suffix.trim_start_matches('.');
        Self {
            token: token.to_string(),
            domain: format!("{}.{}", token, suffix),
        }
    }

    /// The bare candidate token (e.g. "zzzzzz").
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The fully-qualified name (e.g. "zzzzzz.com").
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for DomainQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domain)
    }
}

/// Classification of a domain at some point in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Resolves, or the registry holds registration data for it
    RegisteredConfirmed,

    /// The registry confirmed there is no registration
    AvailableConfirmed,

    /// NXDOMAIN at Stage 1; still needs registry verification
    AvailableProbable,

    /// The check failed in a way that proves nothing
    Indeterminate,
}

impl LookupOutcome {
    /// Resolve `Indeterminate` to the conservative default.
    ///
    /// Ambiguous failures are never reported as available.
    pub fn resolve_conservative(self) -> Self {
        match self {
            Self::Indeterminate => Self::RegisteredConfirmed,
            other => other,
        }
    }

    /// Status label used in the per-domain status log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RegisteredConfirmed => "registered",
            Self::AvailableConfirmed => "available",
            Self::AvailableProbable => "probably available",
            Self::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Registration data returned by a registry lookup.
///
/// Only `names`, `expiration_date` and `status` take part in classification;
/// the remaining fields are informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryResponse {
    /// Identifying domain name(s) reported by the registry
    pub names: Vec<String>,

    /// When the registration expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    /// Registry status tokens (e.g. "client transfer prohibited")
    pub status: Vec<String>,

    /// Sponsoring registrar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    /// When the domain was first registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    /// Delegated nameservers
    pub nameservers: Vec<String>,
}

impl RegistryResponse {
    /// Whether the response carries any identifying field.
    ///
    /// Any of name, expiration or status means the domain is registered,
    /// even when the others are missing.
    pub fn indicates_registered(&self) -> bool {
        !self.names.is_empty() || self.expiration_date.is_some() || !self.status.is_empty()
    }
}

/// Which registry protocol Stage 2 talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryProtocol {
    /// RDAP over HTTPS
    #[default]
    Rdap,

    /// System `whois` command
    Whois,
}

impl std::str::FromStr for RegistryProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rdap" => Ok(Self::Rdap),
            "whois" => Ok(Self::Whois),
            other => Err(format!(
                "Unknown registry protocol '{}', use 'rdap' or 'whois'",
                other
            )),
        }
    }
}

impl fmt::Display for RegistryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryProtocol::Rdap => write!(f, "RDAP"),
            RegistryProtocol::Whois => write!(f, "WHOIS"),
        }
    }
}

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// DNS prescreen
    Prescreen,

    /// Registry verification
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prescreen => write!(f, "stage 1 (dns)"),
            Stage::Verify => write!(f, "stage 2 (registry)"),
        }
    }
}

/// Fixed-delay retry policy for registry lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay between consecutive attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Configuration for a pipeline run.
///
/// Every option affects pool sizing, timeouts, filtering or output only;
/// none of them changes the classification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveConfig {
    /// Candidate word list, one token per line
    pub input_path: PathBuf,

    /// Destination for the confirmed-available domains
    pub output_path: PathBuf,

    /// Optional `<domain>: <status>` log for every domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_log_path: Option<PathBuf>,

    /// Suffix appended to every token (without the leading dot)
    pub suffix: String,

    /// Stage 1 worker count
    pub stage1_workers: usize,

    /// Stage 2 worker count
    pub stage2_workers: usize,

    /// Timeout for a single name-resolution attempt
    #[serde(skip)]
    pub dns_timeout: Duration,

    /// Timeout for a single registry lookup attempt
    #[serde(skip)]
    pub registry_timeout: Duration,

    /// Retry policy for registry lookups
    #[serde(skip)]
    pub retry: RetryPolicy,

    /// Maximum number of cached registry responses
    pub cache_capacity: u64,

    /// Shortest accepted token
    pub min_length: usize,

    /// Longest accepted token
    pub max_length: usize,

    /// Emit a progress line every this many processed units
    pub progress_interval: usize,

    /// Registry protocol used by Stage 2
    pub protocol: RegistryProtocol,

    /// Use the IANA bootstrap file for suffixes without a built-in RDAP endpoint
    pub enable_bootstrap: bool,
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("words.txt"),
            output_path: PathBuf::from("verified_available.txt"),
            status_log_path: None,
            suffix: "com".to_string(),
            stage1_workers: 100,
            stage2_workers: 30,
            dns_timeout: Duration::from_secs(2),
            registry_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            cache_capacity: 50_000,
            min_length: 6,
            max_length: 6,
            progress_interval: 100,
            protocol: RegistryProtocol::Rdap,
            enable_bootstrap: true,
        }
    }
}

impl SieveConfig {
    /// Set the Stage 1 worker count.
    pub fn with_stage1_workers(mut self, workers: usize) -> Self {
        self.stage1_workers = workers;
        self
    }

    /// Set the Stage 2 worker count.
    pub fn with_stage2_workers(mut self, workers: usize) -> Self {
        self.stage2_workers = workers;
        self
    }

    /// Set the accepted token length range (inclusive).
    pub fn with_length_range(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Set the domain suffix.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.trim().trim_start_matches('.').to_lowercase();
        self
    }

    /// Set the registry retry policy.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.retry = RetryPolicy {
            max_attempts,
            backoff,
        };
        self
    }

    /// Set the DNS and registry timeouts.
    pub fn with_timeouts(mut self, dns_timeout: Duration, registry_timeout: Duration) -> Self {
        self.dns_timeout = dns_timeout;
        self.registry_timeout = registry_timeout;
        self
    }

    /// Set the response cache capacity.
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set how often progress lines are emitted.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<(), crate::DomainSieveError> {
        use crate::DomainSieveError;

        if self.stage1_workers == 0 || self.stage1_workers > MAX_STAGE1_WORKERS {
            return Err(DomainSieveError::config(format!(
                "Stage 1 workers must be between 1 and {}",
                MAX_STAGE1_WORKERS
            )));
        }
        if self.stage2_workers == 0 || self.stage2_workers > MAX_STAGE2_WORKERS {
            return Err(DomainSieveError::config(format!(
                "Stage 2 workers must be between 1 and {}",
                MAX_STAGE2_WORKERS
            )));
        }
        if self.dns_timeout.is_zero() {
            return Err(DomainSieveError::config("DNS timeout must be greater than zero"));
        }
        if self.registry_timeout.is_zero() {
            return Err(DomainSieveError::config("Registry timeout must be greater than zero"));
        }
        if self.min_length == 0 {
            return Err(DomainSieveError::config("Minimum length must be at least 1"));
        }
        if self.max_length > 63 {
            return Err(DomainSieveError::config(
                "Maximum length cannot exceed 63 (DNS label limit)",
            ));
        }
        if self.min_length > self.max_length {
            return Err(DomainSieveError::config(format!(
                "Minimum length {} is greater than maximum length {}",
                self.min_length, self.max_length
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(DomainSieveError::config("Retry attempts must be at least 1"));
        }
        if self.cache_capacity == 0 {
            return Err(DomainSieveError::config("Cache capacity must be at least 1"));
        }
        if self.progress_interval == 0 {
            return Err(DomainSieveError::config("Progress interval must be at least 1"));
        }
        if !is_valid_suffix(&self.suffix) {
            return Err(DomainSieveError::config(format!(
                "Invalid domain suffix '{}'",
                self.suffix
            )));
        }
        Ok(())
    }
}

/// Validate a suffix such as "com" or "co.uk".
fn is_valid_suffix(suffix: &str) -> bool {
    !suffix.is_empty()
        && suffix.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Final status of one domain after the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStatus {
    /// The domain name that was checked
    pub domain: String,

    /// Its classification (never `Indeterminate`)
    pub outcome: LookupOutcome,
}

/// Counters for one finished stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Units handed to the stage
    pub total: usize,

    /// Units that completed
    pub processed: usize,

    /// Units classified as (probably or confirmed) available
    pub found: usize,

    /// Units whose check failed and fell back to "registered"
    pub errors: usize,

    /// Wall-clock duration of the stage
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,

    /// Whether the stage stopped early on abort
    pub aborted: bool,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Candidates handed to Stage 1
    pub scanned: usize,

    /// Stage 1 counters
    pub prescreen: StageSummary,

    /// Stage 2 counters
    pub verify: StageSummary,

    /// Registry calls actually made (cache misses)
    pub registry_calls: u64,

    /// Final status for every processed domain
    pub statuses: Vec<DomainStatus>,

    /// Domains confirmed available, sorted
    pub available: Vec<String>,
}

impl PipelineReport {
    /// Whether either stage stopped early.
    pub fn aborted(&self) -> bool {
        self.prescreen.aborted || self.verify.aborted
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_query_joins_suffix() {
        let q = DomainQuery::new("zzzzzz", ".com");
        assert_eq!(q.domain(), "zzzzzz.com");
        assert_eq!(q.token(), "zzzzzz");
        assert_eq!(DomainQuery::new("abc", "co.uk").to_string(), "abc.co.uk");
    }

    #[test]
    fn test_indeterminate_resolves_to_registered() {
        assert_eq!(
            LookupOutcome::Indeterminate.resolve_conservative(),
            LookupOutcome::RegisteredConfirmed
        );
        assert_eq!(
            LookupOutcome::AvailableProbable.resolve_conservative(),
            LookupOutcome::AvailableProbable
        );
    }

    #[test]
    fn test_registry_response_field_presence() {
        assert!(!RegistryResponse::default().indicates_registered());

        let status_only = RegistryResponse {
            status: vec!["active".to_string()],
            ..Default::default()
        };
        assert!(status_only.indicates_registered());

        let expiry_only = RegistryResponse {
            expiration_date: Some("2030-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        assert!(expiry_only.indicates_registered());

        // Registrar alone is informational
        let registrar_only = RegistryResponse {
            registrar: Some("Example Registrar".to_string()),
            ..Default::default()
        };
        assert!(!registrar_only.indicates_registered());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SieveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        assert!(SieveConfig::default()
            .with_stage1_workers(0)
            .validate()
            .is_err());
        assert!(SieveConfig::default()
            .with_stage2_workers(MAX_STAGE2_WORKERS + 1)
            .validate()
            .is_err());
        assert!(SieveConfig::default()
            .with_length_range(7, 4)
            .validate()
            .is_err());
        assert!(SieveConfig::default()
            .with_retry(0, Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(SieveConfig::default()
            .with_suffix("bad suffix")
            .validate()
            .is_err());
        assert!(SieveConfig::default()
            .with_suffix(".co.uk")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_config_validation_rejects_zero_timeouts() {
        let err = SieveConfig::default()
            .with_timeouts(Duration::ZERO, Duration::from_secs(15))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("DNS timeout"));

        let err = SieveConfig::default()
            .with_timeouts(Duration::from_secs(2), Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("Registry timeout"));

        assert!(SieveConfig::default()
            .with_timeouts(Duration::from_millis(1), Duration::from_millis(1))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("rdap".parse::<RegistryProtocol>(), Ok(RegistryProtocol::Rdap));
        assert_eq!(
            " WHOIS ".parse::<RegistryProtocol>(),
            Ok(RegistryProtocol::Whois)
        );
        assert!("ftp".parse::<RegistryProtocol>().is_err());
    }

    #[test]
    fn test_stage_summary_serializes_seconds() {
        let summary = StageSummary {
            total: 3,
            processed: 3,
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], serde_json::json!(1.5));
    }
}
