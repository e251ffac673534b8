//! Stage 1: name-resolution prescreen.
//!
//! A domain that resolves is certainly registered. A definitive NXDOMAIN
//! makes it a candidate for Stage 2. Anything else is ambiguous and falls
//! back to "registered".

use crate::protocols::NameResolver;
use crate::types::{DomainQuery, LookupOutcome};
use std::sync::Arc;

/// Cheap first-pass filter in front of the registry.
#[derive(Clone)]
pub struct Prescreener {
    resolver: Arc<dyn NameResolver>,
}

impl Prescreener {
    /// Create a prescreener on top of a resolver.
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }

    /// Classify a query without applying the conservative fallback.
    ///
    /// Returns `Indeterminate` for timeouts and network failures so callers
    /// can count them.
    pub async fn classify(&self, query: &DomainQuery) -> LookupOutcome {
        match self.resolver.resolve(query.domain()).await {
            Ok(addr) => {
                tracing::debug!(domain = %query, %addr, "resolves");
                LookupOutcome::RegisteredConfirmed
            }
            Err(e) if e.indicates_available() => {
                tracing::debug!(domain = %query, "nxdomain");
                LookupOutcome::AvailableProbable
            }
            Err(e) => {
                tracing::debug!(
                    domain = %query,
                    error = %e,
                    "ambiguous resolution, assuming registered"
                );
                LookupOutcome::Indeterminate
            }
        }
    }

    /// Classify a query as `RegisteredConfirmed` or `AvailableProbable`.
    pub async fn prescreen(&self, query: &DomainQuery) -> LookupOutcome {
        self.classify(query).await.resolve_conservative()
    }
}
