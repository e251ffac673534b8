//! Two-stage pipeline driver.
//!
//! Stage 1 prescreens every candidate with a single DNS lookup. Stage 2
//! verifies the NXDOMAIN subset against the registry. Each stage runs on its
//! own [`WorkerPool`]; both share one abort flag.

use crate::cache::ResponseCache;
use crate::concurrent::WorkerPool;
use crate::error::DomainSieveError;
use crate::prescreen::Prescreener;
use crate::progress::ProgressReporter;
use crate::protocols::{DnsResolver, NameResolver, RdapClient, RegistryLookup, WhoisClient};
use crate::types::{
    DomainQuery, DomainStatus, LookupOutcome, PipelineReport, RegistryProtocol, SieveConfig, Stage,
    StageSummary,
};
use crate::verifier::RegistryVerifier;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-domain results of one stage.
pub type StageResults = Vec<(DomainQuery, LookupOutcome)>;

/// Coordinates both stages of an availability run.
///
/// # Example
///
/// ```rust,no_run
/// use domain_sieve_lib::{load, Pipeline, SieveConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SieveConfig::default().with_length_range(4, 6);
///     let queries = load(
///         &config.input_path,
///         config.min_length,
///         config.max_length,
///         &config.suffix,
///     )?;
///     let report = Pipeline::new(config)?.run(queries).await;
///     println!("{} available", report.available.len());
///     Ok(())
/// }
/// ```
pub struct Pipeline {
    config: SieveConfig,
    prescreener: Prescreener,
    verifier: RegistryVerifier,
    abort: Arc<AtomicBool>,
}

impl Pipeline {
    /// Build a pipeline with the network-backed resolver and registry client.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the configuration is invalid, or a network error if
    /// the RDAP HTTP client cannot be built.
    pub fn new(config: SieveConfig) -> Result<Self, DomainSieveError> {
        config.validate()?;

        let resolver: Arc<dyn NameResolver> = Arc::new(DnsResolver::new(config.dns_timeout));
        let lookup: Arc<dyn RegistryLookup> = match config.protocol {
            RegistryProtocol::Rdap => Arc::new(RdapClient::with_config(
                config.registry_timeout,
                config.enable_bootstrap,
            )?),
            RegistryProtocol::Whois => Arc::new(WhoisClient::with_timeout(config.registry_timeout)),
        };

        Self::with_components(config, resolver, lookup)
    }

    /// Build a pipeline around caller-supplied collaborators.
    pub fn with_components(
        config: SieveConfig,
        resolver: Arc<dyn NameResolver>,
        lookup: Arc<dyn RegistryLookup>,
    ) -> Result<Self, DomainSieveError> {
        config.validate()?;

        let cache = Arc::new(ResponseCache::new(config.cache_capacity));
        let verifier = RegistryVerifier::new(
            resolver.clone(),
            lookup,
            cache,
            config.retry,
            config.registry_timeout,
        );

        Ok(Self {
            prescreener: Prescreener::new(resolver),
            verifier,
            config,
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops both stages from taking new work once set.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// Whether the run has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// The response cache shared by Stage 2 workers.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        self.verifier.cache()
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &SieveConfig {
        &self.config
    }

    /// Stage 1 over every query.
    ///
    /// Outcomes are `RegisteredConfirmed` or `AvailableProbable`; ambiguous
    /// lookups count as errors in the summary.
    pub async fn prescreen_all(&self, queries: Vec<DomainQuery>) -> (StageResults, StageSummary) {
        let prescreener = self.prescreener.clone();
        let task = move |query: DomainQuery| {
            let prescreener = prescreener.clone();
            async move {
                let outcome = prescreener.classify(&query).await;
                (query, outcome)
            }
        };

        self.run_stage(
            Stage::Prescreen,
            self.config.stage1_workers,
            queries,
            task,
            LookupOutcome::AvailableProbable,
        )
        .await
    }

    /// Stage 2 over probable-available queries.
    ///
    /// Outcomes are `AvailableConfirmed` or `RegisteredConfirmed`.
    pub async fn verify_all(&self, queries: Vec<DomainQuery>) -> (StageResults, StageSummary) {
        let verifier = self.verifier.clone();
        let task = move |query: DomainQuery| {
            let verifier = verifier.clone();
            async move {
                let outcome = verifier.classify(&query).await;
                (query, outcome)
            }
        };

        self.run_stage(
            Stage::Verify,
            self.config.stage2_workers,
            queries,
            task,
            LookupOutcome::AvailableConfirmed,
        )
        .await
    }

    async fn run_stage<F, Fut>(
        &self,
        stage: Stage,
        workers: usize,
        queries: Vec<DomainQuery>,
        task: F,
        found: LookupOutcome,
    ) -> (StageResults, StageSummary)
    where
        F: Fn(DomainQuery) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = (DomainQuery, LookupOutcome)> + Send + 'static,
    {
        let total = queries.len();
        tracing::info!(%stage, domains = total, workers, "stage started");

        let reporter = ProgressReporter::new(stage, total, self.config.progress_interval);
        let pool = WorkerPool::with_abort(workers, self.abort.clone());

        let raw = pool
            .run(queries, task, |(_, outcome)| {
                if *outcome == LookupOutcome::Indeterminate {
                    reporter.record_error();
                }
                reporter.record(*outcome == found);
            })
            .await;

        let results: StageResults = raw
            .into_iter()
            .map(|(query, outcome)| (query, outcome.resolve_conservative()))
            .collect();

        let aborted = results.len() < total;
        let summary = reporter.summary(aborted);
        if aborted {
            tracing::warn!(%stage, processed = summary.processed, total, "stage aborted");
        }
        tracing::info!(
            %stage,
            processed = summary.processed,
            found = summary.found,
            errors = summary.errors,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "stage finished"
        );

        (results, summary)
    }

    /// Run both stages.
    ///
    /// Every processed domain ends with exactly one status. Probable domains
    /// that Stage 2 never reached keep `AvailableProbable` and are not in
    /// `available`.
    pub async fn run(&self, queries: Vec<DomainQuery>) -> PipelineReport {
        let scanned = queries.len();
        let (stage1, prescreen) = self.prescreen_all(queries).await;

        let mut statuses = Vec::with_capacity(stage1.len());
        let mut probable = Vec::new();
        for (query, outcome) in stage1 {
            if outcome == LookupOutcome::AvailableProbable {
                probable.push(query);
            } else {
                statuses.push(DomainStatus {
                    domain: query.domain().to_string(),
                    outcome,
                });
            }
        }

        let unverified = probable.clone();
        let (stage2, verify) = self.verify_all(probable).await;

        let verified: HashSet<&str> = stage2.iter().map(|(q, _)| q.domain()).collect();
        for query in unverified.iter().filter(|q| !verified.contains(q.domain())) {
            statuses.push(DomainStatus {
                domain: query.domain().to_string(),
                outcome: LookupOutcome::AvailableProbable,
            });
        }
        for (query, outcome) in &stage2 {
            statuses.push(DomainStatus {
                domain: query.domain().to_string(),
                outcome: *outcome,
            });
        }

        let mut available: Vec<String> = statuses
            .iter()
            .filter(|s| s.outcome == LookupOutcome::AvailableConfirmed)
            .map(|s| s.domain.clone())
            .collect();
        available.sort_unstable();

        let report = PipelineReport {
            scanned,
            prescreen,
            verify,
            registry_calls: self.cache().computations(),
            statuses,
            available,
        };

        tracing::info!(
            scanned,
            candidates = report.verify.total,
            available = report.available.len(),
            registry_calls = report.registry_calls,
            aborted = report.aborted(),
            "run complete"
        );
        report
    }
}
