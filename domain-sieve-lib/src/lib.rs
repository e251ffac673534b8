//! # Domain Sieve Library
//!
//! Two-stage bulk domain availability checking: a cheap DNS prescreen drops
//! everything that resolves, then the registry confirms the rest.
//!
//! Ambiguity always resolves toward "registered". A domain is only reported
//! available when the registry explicitly says so, or answers with no
//! identifying data at all.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_sieve_lib::{load, write_available, Pipeline, SieveConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SieveConfig::default().with_length_range(5, 6);
//!     let queries = load(
//!         &config.input_path,
//!         config.min_length,
//!         config.max_length,
//!         &config.suffix,
//!     )?;
//!
//!     let pipeline = Pipeline::new(config.clone())?;
//!     let report = pipeline.run(queries).await;
//!
//!     write_available(&report.statuses, &config.output_path)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **DNS Prescreen**: one short-timeout lookup per candidate
//! - **RDAP / WHOIS Verification**: with retry and per-attempt timeouts
//! - **Single-Flight Cache**: at most one registry call per domain per run
//! - **Bootstrap Registry**: RDAP endpoint discovery for uncommon suffixes

// Re-export main public API types and functions
pub use cache::{CachedLookup, ResponseCache};
pub use concurrent::WorkerPool;
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, EnvConfig, FileConfig, OutputConfig,
    PipelineConfig,
};
pub use error::DomainSieveError;
pub use loader::{load, load_from_reader, normalize_token};
pub use pipeline::{Pipeline, StageResults};
pub use prescreen::Prescreener;
pub use progress::{report, ProgressReporter, ProgressSnapshot};
pub use protocols::{DnsResolver, NameResolver, RdapClient, RegistryLookup, WhoisClient};
pub use sink::{write_available, write_status_log};
pub use types::{
    DomainQuery, DomainStatus, LookupOutcome, PipelineReport, RegistryProtocol, RegistryResponse,
    RetryPolicy, SieveConfig, Stage, StageSummary, MAX_STAGE1_WORKERS, MAX_STAGE2_WORKERS,
};
pub use verifier::{run_with_retry, RegistryVerifier};

// Protocol parsers are public for callers that bring their own transport
pub mod protocols;

mod cache;
mod concurrent;
mod config;
mod error;
mod loader;
mod pipeline;
mod prescreen;
mod progress;
mod sink;
mod types;
mod verifier;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainSieveError>;

// Library version, shown in the CLI header
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
