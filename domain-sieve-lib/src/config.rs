//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DS_*`
//! environment variables, and merging them with proper precedence rules.
//! Every layer is optional; what is set is applied on top of
//! [`SieveConfig::default`].

use crate::error::DomainSieveError;
use crate::types::{RegistryProtocol, SieveConfig, MAX_STAGE1_WORKERS, MAX_STAGE2_WORKERS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Pool sizing, timeouts, retry, cache and filtering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineConfig>,

    /// Input and output locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// The `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1_workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage2_workers: Option<usize>,

    /// Duration string, e.g. "2s" or "500ms"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_timeout: Option<String>,

    /// Duration string, e.g. "15s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,

    /// Duration string, e.g. "1s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_interval: Option<usize>,

    /// "rdap" or "whois"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,
}

/// The `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Candidate word list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Confirmed-available output file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Per-domain status log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_log: Option<String>,
}

impl FileConfig {
    /// Apply every value set in this file on top of `config`.
    pub fn apply_to(&self, config: &mut SieveConfig) -> Result<(), DomainSieveError> {
        if let Some(pipeline) = &self.pipeline {
            if let Some(suffix) = &pipeline.suffix {
                *config = std::mem::take(config).with_suffix(suffix);
            }
            if let Some(workers) = pipeline.stage1_workers {
                config.stage1_workers = workers;
            }
            if let Some(workers) = pipeline.stage2_workers {
                config.stage2_workers = workers;
            }
            if let Some(timeout) = &pipeline.dns_timeout {
                config.dns_timeout = require_duration("dns_timeout", timeout)?;
            }
            if let Some(timeout) = &pipeline.registry_timeout {
                config.registry_timeout = require_duration("registry_timeout", timeout)?;
            }
            if let Some(attempts) = pipeline.retry_attempts {
                config.retry.max_attempts = attempts;
            }
            if let Some(backoff) = &pipeline.retry_backoff {
                config.retry.backoff = require_duration("retry_backoff", backoff)?;
            }
            if let Some(capacity) = pipeline.cache_capacity {
                config.cache_capacity = capacity;
            }
            if let Some(min) = pipeline.min_length {
                config.min_length = min;
            }
            if let Some(max) = pipeline.max_length {
                config.max_length = max;
            }
            if let Some(interval) = pipeline.progress_interval {
                config.progress_interval = interval;
            }
            if let Some(protocol) = &pipeline.protocol {
                config.protocol =
                    RegistryProtocol::from_str(protocol).map_err(DomainSieveError::config)?;
            }
            if let Some(bootstrap) = pipeline.bootstrap {
                config.enable_bootstrap = bootstrap;
            }
        }

        if let Some(output) = &self.output {
            if let Some(input) = &output.input {
                config.input_path = PathBuf::from(input);
            }
            if let Some(path) = &output.output {
                config.output_path = PathBuf::from(path);
            }
            if let Some(path) = &output.status_log {
                config.status_log_path = Some(PathBuf::from(path));
            }
        }

        Ok(())
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which config files were found
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `FileError` if the file is missing or unreadable, `ConfigError` if it
    /// is not valid TOML or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainSieveError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainSieveError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainSieveError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        if self.verbose {
            tracing::info!(path = %path.display(), "loaded config file");
        }
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then `~/.domain-sieve.toml`, then a file in the current
    /// directory; later files override earlier ones field by field.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainSieveError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "merged config file");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-sieve.toml", "./.domain-sieve.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-sieve.toml", "domain-sieve.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|p| p.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-sieve").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            pipeline: match (lower.pipeline, higher.pipeline) {
                (Some(lower), Some(higher)) => Some(PipelineConfig {
                    suffix: higher.suffix.or(lower.suffix),
                    stage1_workers: higher.stage1_workers.or(lower.stage1_workers),
                    stage2_workers: higher.stage2_workers.or(lower.stage2_workers),
                    dns_timeout: higher.dns_timeout.or(lower.dns_timeout),
                    registry_timeout: higher.registry_timeout.or(lower.registry_timeout),
                    retry_attempts: higher.retry_attempts.or(lower.retry_attempts),
                    retry_backoff: higher.retry_backoff.or(lower.retry_backoff),
                    cache_capacity: higher.cache_capacity.or(lower.cache_capacity),
                    min_length: higher.min_length.or(lower.min_length),
                    max_length: higher.max_length.or(lower.max_length),
                    progress_interval: higher.progress_interval.or(lower.progress_interval),
                    protocol: higher.protocol.or(lower.protocol),
                    bootstrap: higher.bootstrap.or(lower.bootstrap),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputConfig {
                    input: higher.input.or(lower.input),
                    output: higher.output.or(lower.output),
                    status_log: higher.status_log.or(lower.status_log),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainSieveError> {
        let Some(pipeline) = &config.pipeline else {
            return Ok(());
        };

        if let Some(workers) = pipeline.stage1_workers {
            if workers == 0 || workers > MAX_STAGE1_WORKERS {
                return Err(DomainSieveError::config(format!(
                    "stage1_workers must be between 1 and {}",
                    MAX_STAGE1_WORKERS
                )));
            }
        }
        if let Some(workers) = pipeline.stage2_workers {
            if workers == 0 || workers > MAX_STAGE2_WORKERS {
                return Err(DomainSieveError::config(format!(
                    "stage2_workers must be between 1 and {}",
                    MAX_STAGE2_WORKERS
                )));
            }
        }

        for (name, value) in [
            ("dns_timeout", &pipeline.dns_timeout),
            ("registry_timeout", &pipeline.registry_timeout),
            ("retry_backoff", &pipeline.retry_backoff),
        ] {
            if let Some(value) = value {
                require_duration(name, value)?;
            }
        }

        if let (Some(min), Some(max)) = (pipeline.min_length, pipeline.max_length) {
            if min > max {
                return Err(DomainSieveError::config(format!(
                    "min_length {} is greater than max_length {}",
                    min, max
                )));
            }
        }

        if let Some(protocol) = &pipeline.protocol {
            RegistryProtocol::from_str(protocol).map_err(DomainSieveError::config)?;
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `DS_*`
/// environment variables. Invalid values are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub stage1_workers: Option<usize>,
    pub stage2_workers: Option<usize>,
    pub dns_timeout: Option<Duration>,
    pub registry_timeout: Option<Duration>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff: Option<Duration>,
    pub cache_capacity: Option<u64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub suffix: Option<String>,
    pub protocol: Option<RegistryProtocol>,
    pub bootstrap: Option<bool>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub status_log: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from `DS_*` environment variables.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    EnvConfig::from_lookup(|name| env::var(name).ok(), verbose)
}

impl EnvConfig {
    /// Build from any variable lookup.
    pub fn from_lookup<F>(lookup: F, verbose: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = EnvVars { lookup, verbose };

        Self {
            stage1_workers: vars
                .parsed::<usize>("DS_STAGE1_WORKERS")
                .filter(|w| vars.check("DS_STAGE1_WORKERS", (1..=MAX_STAGE1_WORKERS).contains(w))),
            stage2_workers: vars
                .parsed::<usize>("DS_STAGE2_WORKERS")
                .filter(|w| vars.check("DS_STAGE2_WORKERS", (1..=MAX_STAGE2_WORKERS).contains(w))),
            dns_timeout: vars.duration("DS_DNS_TIMEOUT"),
            registry_timeout: vars.duration("DS_REGISTRY_TIMEOUT"),
            retry_attempts: vars
                .parsed::<u32>("DS_RETRY_ATTEMPTS")
                .filter(|a| vars.check("DS_RETRY_ATTEMPTS", *a > 0)),
            retry_backoff: vars.duration("DS_RETRY_BACKOFF"),
            cache_capacity: vars
                .parsed::<u64>("DS_CACHE_CAPACITY")
                .filter(|c| vars.check("DS_CACHE_CAPACITY", *c > 0)),
            min_length: vars.parsed("DS_MIN_LENGTH"),
            max_length: vars.parsed("DS_MAX_LENGTH"),
            suffix: vars.string("DS_TLD"),
            protocol: vars.parsed("DS_PROTOCOL"),
            bootstrap: vars.boolean("DS_BOOTSTRAP"),
            input: vars.string("DS_INPUT"),
            output: vars.string("DS_OUTPUT"),
            status_log: vars.string("DS_STATUS_LOG"),
            config: vars.string("DS_CONFIG"),
        }
    }

    /// Apply every value set in the environment on top of `config`.
    pub fn apply_to(&self, config: &mut SieveConfig) {
        if let Some(suffix) = &self.suffix {
            *config = std::mem::take(config).with_suffix(suffix);
        }
        if let Some(workers) = self.stage1_workers {
            config.stage1_workers = workers;
        }
        if let Some(workers) = self.stage2_workers {
            config.stage2_workers = workers;
        }
        if let Some(timeout) = self.dns_timeout {
            config.dns_timeout = timeout;
        }
        if let Some(timeout) = self.registry_timeout {
            config.registry_timeout = timeout;
        }
        if let Some(attempts) = self.retry_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(backoff) = self.retry_backoff {
            config.retry.backoff = backoff;
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
        if let Some(min) = self.min_length {
            config.min_length = min;
        }
        if let Some(max) = self.max_length {
            config.max_length = max;
        }
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(bootstrap) = self.bootstrap {
            config.enable_bootstrap = bootstrap;
        }
        if let Some(input) = &self.input {
            config.input_path = PathBuf::from(input);
        }
        if let Some(output) = &self.output {
            config.output_path = PathBuf::from(output);
        }
        if let Some(status_log) = &self.status_log {
            config.status_log_path = Some(PathBuf::from(status_log));
        }
    }
}

struct EnvVars<F> {
    lookup: F,
    verbose: bool,
}

impl<F: Fn(&str) -> Option<String>> EnvVars<F> {
    fn string(&self, name: &str) -> Option<String> {
        let value = (self.lookup)(name)?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if self.verbose {
            tracing::info!("Using {}={}", name, value);
        }
        Some(value.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.string(name)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Invalid {}='{}', ignoring", name, raw);
                None
            }
        }
    }

    fn duration(&self, name: &str) -> Option<Duration> {
        let raw = self.string(name)?;
        let parsed = parse_duration_string(&raw);
        if parsed.is_none() {
            tracing::warn!(
                "Invalid {}='{}', use format like '500ms', '5s', '2m'",
                name,
                raw
            );
        }
        parsed
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        let raw = self.string(name)?;
        match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => {
                tracing::warn!("Invalid {}='{}', use true/false", name, raw);
                None
            }
        }
    }

    fn check(&self, name: &str, ok: bool) -> bool {
        if !ok {
            tracing::warn!("{} is out of range, ignoring", name);
        }
        ok
    }
}

/// Parse a duration string like "500ms", "5s", "2m" or a bare number of seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn require_duration(name: &str, value: &str) -> Result<Duration, DomainSieveError> {
    parse_duration_string(value).ok_or_else(|| {
        DomainSieveError::config(format!(
            "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
            name, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string(" 15 "), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration_string("invalid"), None);
        assert_eq!(parse_duration_string("-1s"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[pipeline]
suffix = ".io"
stage1_workers = 200
stage2_workers = 20
dns_timeout = "1500ms"
retry_attempts = 5
protocol = "whois"

[output]
input = "words.txt"
status_log = "domain_status.txt"
"#,
        );

        let manager = ConfigManager::new(false);
        let file = assert_ok!(manager.load_file(temp_file.path()));

        let mut config = SieveConfig::default();
        assert_ok!(file.apply_to(&mut config));

        assert_eq!(config.suffix, "io");
        assert_eq!(config.stage1_workers, 200);
        assert_eq!(config.stage2_workers, 20);
        assert_eq!(config.dns_timeout, Duration::from_millis(1500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.protocol, RegistryProtocol::Whois);
        assert_eq!(
            config.status_log_path,
            Some(PathBuf::from("domain_status.txt"))
        );
        // untouched values keep their defaults
        assert_eq!(config.registry_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_worker_count() {
        let temp_file = write_config("[pipeline]\nstage2_workers = 0\n");
        let manager = ConfigManager::new(false);
        assert_err!(manager.load_file(temp_file.path()));

        let temp_file = write_config("[pipeline]\nstage1_workers = 501\n");
        assert_err!(manager.load_file(temp_file.path()));
    }

    #[test]
    fn test_invalid_length_range_and_timeout() {
        let manager = ConfigManager::new(false);

        let inverted = write_config("[pipeline]\nmin_length = 8\nmax_length = 4\n");
        assert_err!(manager.load_file(inverted.path()));

        let bad_timeout = write_config("[pipeline]\nregistry_timeout = \"soon\"\n");
        let err = manager.load_file(bad_timeout.path()).unwrap_err();
        assert!(matches!(err, DomainSieveError::ConfigError { .. }));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let temp_file = write_config("[pipeline\nstage1_workers = ");
        let err = ConfigManager::new(false)
            .load_file(temp_file.path())
            .unwrap_err();
        assert!(matches!(err, DomainSieveError::ConfigError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::new(false)
            .load_file("/definitely/not/here.toml")
            .unwrap_err();
        assert!(matches!(err, DomainSieveError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            pipeline: Some(PipelineConfig {
                stage1_workers: Some(50),
                suffix: Some("net".to_string()),
                bootstrap: Some(false),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                output: Some("lower.txt".to_string()),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            pipeline: Some(PipelineConfig {
                stage1_workers: Some(250),
                bootstrap: Some(true),
                ..Default::default()
            }),
            output: None,
        };

        let merged = manager.merge_configs(lower, higher);
        let pipeline = merged.pipeline.unwrap();

        assert_eq!(pipeline.stage1_workers, Some(250)); // Higher wins
        assert_eq!(pipeline.suffix, Some("net".to_string())); // Lower preserved
        assert_eq!(pipeline.bootstrap, Some(true));
        assert_eq!(merged.output.unwrap().output, Some("lower.txt".to_string()));
    }

    #[test]
    fn test_env_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DS_STAGE1_WORKERS", "300"),
            ("DS_STAGE2_WORKERS", "1000"),
            ("DS_DNS_TIMEOUT", "750ms"),
            ("DS_RETRY_ATTEMPTS", "0"),
            ("DS_TLD", ".dev"),
            ("DS_PROTOCOL", "whois"),
            ("DS_BOOTSTRAP", "off"),
            ("DS_OUTPUT", "  "),
        ]);

        let env = EnvConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()), false);

        assert_eq!(env.stage1_workers, Some(300));
        assert_eq!(env.stage2_workers, None); // out of range
        assert_eq!(env.dns_timeout, Some(Duration::from_millis(750)));
        assert_eq!(env.retry_attempts, None); // zero rejected
        assert_eq!(env.protocol, Some(RegistryProtocol::Whois));
        assert_eq!(env.bootstrap, Some(false));
        assert_eq!(env.output, None); // blank ignored

        let mut config = SieveConfig::default();
        env.apply_to(&mut config);
        assert_eq!(config.suffix, "dev");
        assert_eq!(config.stage1_workers, 300);
        assert_eq!(config.stage2_workers, 30);
        assert!(!config.enable_bootstrap);
        assert!(config.validate().is_ok());
    }
}
