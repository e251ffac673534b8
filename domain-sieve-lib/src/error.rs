//! Error handling for the availability pipeline.
//!
//! Per-domain errors never abort a run: the pipeline converts them into a
//! conservative classification. Only load-time, configuration and output
//! errors are surfaced to the caller.

use std::fmt;
use std::time::Duration;

/// Main error type for pipeline operations.
#[derive(Debug, Clone)]
pub enum DomainSieveError {
    /// The candidate source could not be opened or read
    SourceUnavailable { path: String, message: String },

    /// Name resolution answered NXDOMAIN ("no such name")
    NameNotFound { domain: String },

    /// The registry explicitly reported no match for the domain
    NoMatch { domain: String },

    /// Network-related errors (connection refused, resolver failure, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP / WHOIS registry errors
    RegistryError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// The registry asked us to slow down
    RateLimited {
        service: String,
        message: String,
        retry_after: Option<Duration>,
    },

    /// Bootstrap registry lookup failures
    BootstrapError { tld: String, message: String },

    /// Unparseable registry payloads
    ParseError { message: String },

    /// An operation exceeded its time budget
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Every retry attempt failed with a transient error
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    /// Invalid settings
    ConfigError { message: String },

    /// Output files could not be written
    FileError { path: String, message: String },
}

impl DomainSieveError {
    /// Create a new source-unavailable error.
    pub fn source_unavailable<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new NXDOMAIN error.
    pub fn name_not_found<D: Into<String>>(domain: D) -> Self {
        Self::NameNotFound {
            domain: domain.into(),
        }
    }

    /// Create a new registry no-match error.
    pub fn no_match<D: Into<String>>(domain: D) -> Self {
        Self::NoMatch {
            domain: domain.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new registry error.
    pub fn registry<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RegistryError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new registry error with HTTP status code.
    pub fn registry_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RegistryError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new rate-limit error.
    pub fn rate_limited<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::RateLimited {
            service: service.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new exhausted-retries error.
    pub fn exhausted<O: Into<String>>(operation: O, attempts: u32, last_error: &Self) -> Self {
        Self::ExhaustedRetries {
            operation: operation.into(),
            attempts,
            last_error: last_error.to_string(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a definitive "not registered" signal.
    ///
    /// NXDOMAIN, registry no-match and RDAP 404 are answers, not failures.
    pub fn indicates_available(&self) -> bool {
        match self {
            Self::NameNotFound { .. } | Self::NoMatch { .. } => true,
            Self::RegistryError {
                status_code: Some(404),
                ..
            } => true,
            _ => false,
        }
    }

    /// Check if this error suggests the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::RegistryError {
                    status_code: Some(500..=599),
                    ..
                }
                | Self::RegistryError {
                    status_code: None,
                    ..
                }
        )
    }

    /// Check if this error must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::ConfigError { .. } | Self::FileError { .. }
        )
    }
}

impl fmt::Display for DomainSieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { path, message } => {
                write!(f, "Candidate source '{}' unavailable: {}", path, message)
            }
            Self::NameNotFound { domain } => write!(f, "No such name: {}", domain),
            Self::NoMatch { domain } => write!(f, "No registry match for '{}'", domain),
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RegistryError {
                domain,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(
                        f,
                        "Registry error for '{}' (HTTP {}): {}",
                        domain, code, message
                    )
                } else {
                    write!(f, "Registry error for '{}': {}", domain, message)
                }
            }
            Self::RateLimited {
                service,
                message,
                retry_after,
            } => {
                if let Some(retry) = retry_after {
                    write!(
                        f,
                        "Rate limited by {} (retry after {:?}): {}",
                        service, retry, message
                    )
                } else {
                    write!(f, "Rate limited by {}: {}", service, message)
                }
            }
            Self::BootstrapError { tld, message } => {
                write!(f, "Bootstrap error for TLD '{}': {}", tld, message)
            }
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ExhaustedRetries {
                operation,
                attempts,
                last_error,
            } => write!(
                f,
                "{} failed after {} attempts (last error: {})",
                operation, attempts, last_error
            ),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for DomainSieveError {}

impl From<reqwest::Error> for DomainSieveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainSieveError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for DomainSieveError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}
