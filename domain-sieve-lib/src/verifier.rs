//! Stage 2: authoritative registry verification.
//!
//! Only domains that failed to resolve in Stage 1 get here. Each one is
//! re-resolved (it may have been registered since), then looked up in the
//! registry through the shared [`ResponseCache`] so a domain is queried at
//! most once per run no matter how many workers ask for it.

use crate::cache::{CachedLookup, ResponseCache};
use crate::error::DomainSieveError;
use crate::protocols::{NameResolver, RegistryLookup};
use crate::types::{DomainQuery, LookupOutcome, RetryPolicy};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Longest `Retry-After` a registry can make us wait between attempts.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Run `op` under a retry policy, each attempt bounded by `attempt_timeout`.
///
/// `op` receives the 1-based attempt number. Stops early on success, on a
/// definitive availability answer and on errors that are not retryable.
///
/// # Errors
///
/// The last error as-is when it is definitive or not retryable;
/// `DomainSieveError::ExhaustedRetries` once every attempt has failed.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    operation: &str,
    mut op: F,
) -> Result<T, DomainSieveError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DomainSieveError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(attempt_timeout, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(DomainSieveError::timeout(operation, attempt_timeout)),
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if err.indicates_available() || !err.is_retryable() {
            return Err(err);
        }
        if attempt >= max_attempts {
            return Err(DomainSieveError::exhausted(operation, attempt, &err));
        }

        let delay = match &err {
            DomainSieveError::RateLimited {
                retry_after: Some(after),
                ..
            } => policy.backoff.max((*after).min(MAX_RETRY_AFTER)),
            _ => policy.backoff,
        };
        tracing::debug!(operation, attempt, ?delay, error = %err, "attempt failed, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Registry verifier shared by every Stage 2 worker.
#[derive(Clone)]
pub struct RegistryVerifier {
    resolver: Arc<dyn NameResolver>,
    lookup: Arc<dyn RegistryLookup>,
    cache: Arc<ResponseCache>,
    retry: RetryPolicy,
    lookup_timeout: Duration,
}

impl RegistryVerifier {
    /// Create a verifier.
    ///
    /// `lookup_timeout` bounds each registry attempt, not the whole retry
    /// sequence.
    pub fn new(
        resolver: Arc<dyn NameResolver>,
        lookup: Arc<dyn RegistryLookup>,
        cache: Arc<ResponseCache>,
        retry: RetryPolicy,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            lookup,
            cache,
            retry,
            lookup_timeout,
        }
    }

    /// The response cache this verifier reads and fills.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Classify a probable-available domain without the conservative fallback.
    ///
    /// Returns `Indeterminate` when the registry could not be consulted.
    pub async fn classify(&self, query: &DomainQuery) -> LookupOutcome {
        let domain = query.domain();

        if self.resolver.resolve(domain).await.is_ok() {
            tracing::debug!(domain, "resolves on recheck");
            return LookupOutcome::RegisteredConfirmed;
        }

        let entry = self
            .cache
            .get_or_compute(domain, || self.fetch(domain))
            .await;

        let outcome = match &entry {
            CachedLookup::NoMatch => LookupOutcome::AvailableConfirmed,
            CachedLookup::Response(response) if response.indicates_registered() => {
                LookupOutcome::RegisteredConfirmed
            }
            CachedLookup::Response(_) => LookupOutcome::AvailableConfirmed,
            CachedLookup::Failed { .. } => LookupOutcome::Indeterminate,
        };
        tracing::debug!(domain, %outcome, "verified");
        outcome
    }

    /// Classify a domain as `AvailableConfirmed` or `RegisteredConfirmed`.
    pub async fn verify(&self, query: &DomainQuery) -> LookupOutcome {
        self.classify(query).await.resolve_conservative()
    }

    async fn fetch(&self, domain: &str) -> CachedLookup {
        let mut attempts = 0;
        let operation = self.lookup.protocol();
        let result = run_with_retry(&self.retry, self.lookup_timeout, operation, |attempt| {
            attempts = attempt;
            self.lookup.lookup(domain)
        })
        .await;

        match result {
            Ok(response) => CachedLookup::Response(response),
            Err(e) if e.indicates_available() => CachedLookup::NoMatch,
            Err(DomainSieveError::ExhaustedRetries {
                attempts,
                last_error,
                ..
            }) => {
                tracing::warn!(
                    domain,
                    attempts,
                    error = %last_error,
                    "registry lookup exhausted retries, treating as registered"
                );
                CachedLookup::Failed {
                    attempts,
                    last_error,
                }
            }
            Err(e) => {
                tracing::warn!(
                    domain,
                    error = %e,
                    "registry lookup failed, treating as registered"
                );
                CachedLookup::Failed {
                    attempts,
                    last_error: e.to_string(),
                }
            }
        }
    }
}
