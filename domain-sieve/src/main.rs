//! Domain Sieve CLI Application
//!
//! Reads a word list, appends a suffix to every token and reports which of
//! the resulting domains are unregistered. This CLI is a thin front end over
//! domain-sieve-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_sieve_lib::{
    load, load_env_config, parse_duration_string, write_available, write_status_log,
    ConfigManager, Pipeline, RegistryProtocol, SieveConfig,
};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-sieve
#[derive(Parser, Debug)]
#[command(name = "domain-sieve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Find unregistered domains in a word list")]
#[command(
    long_about = "Find unregistered domains in a word list.\n\nStage 1 drops every name that resolves in DNS. Stage 2 confirms the rest against the registry over RDAP or WHOIS. Anything ambiguous is treated as registered."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Word list, one token per line (default: words.txt)
    #[arg(value_name = "INPUT", help_heading = "Input")]
    pub input: Option<PathBuf>,

    /// Domain suffix to append to every token
    #[arg(short = 't', long = "tld", value_name = "SUFFIX", help_heading = "Input")]
    pub tld: Option<String>,

    /// Shortest token to check
    #[arg(long = "min-length", value_name = "N", help_heading = "Input")]
    pub min_length: Option<usize>,

    /// Longest token to check
    #[arg(long = "max-length", value_name = "N", help_heading = "Input")]
    pub max_length: Option<usize>,

    /// Print the candidate domains and exit without any lookups
    #[arg(long = "dry-run", help_heading = "Input")]
    pub dry_run: bool,

    /// File for confirmed-available domains (default: verified_available.txt)
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Output")]
    pub output: Option<PathBuf>,

    /// Also write `<domain>: <status>` for every checked domain
    #[arg(long = "status-log", value_name = "FILE", help_heading = "Output")]
    pub status_log: Option<PathBuf>,

    /// Print the run report as JSON on stdout
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// DNS prescreen workers (default: 100, max: 500)
    #[arg(long = "stage1-workers", value_name = "N", help_heading = "Performance")]
    pub stage1_workers: Option<usize>,

    /// Registry verification workers (default: 30, max: 100)
    #[arg(long = "stage2-workers", value_name = "N", help_heading = "Performance")]
    pub stage2_workers: Option<usize>,

    /// DNS lookup timeout, e.g. 2s or 500ms
    #[arg(long = "dns-timeout", value_name = "DURATION", help_heading = "Performance")]
    pub dns_timeout: Option<String>,

    /// Timeout for each registry attempt, e.g. 15s
    #[arg(long = "registry-timeout", value_name = "DURATION", help_heading = "Performance")]
    pub registry_timeout: Option<String>,

    /// Registry attempts per domain, including the first
    #[arg(long = "retries", value_name = "N", help_heading = "Performance")]
    pub retries: Option<u32>,

    /// Delay between registry attempts, e.g. 1s
    #[arg(long = "retry-backoff", value_name = "DURATION", help_heading = "Performance")]
    pub retry_backoff: Option<String>,

    /// Maximum number of cached registry responses
    #[arg(long = "cache-capacity", value_name = "N", help_heading = "Performance")]
    pub cache_capacity: Option<u64>,

    /// Log a progress line every N domains
    #[arg(long = "progress-interval", value_name = "N", help_heading = "Performance")]
    pub progress_interval: Option<usize>,

    /// Registry protocol for verification: rdap or whois
    #[arg(long = "protocol", value_name = "PROTOCOL", help_heading = "Protocol")]
    pub protocol: Option<RegistryProtocol>,

    /// Disable IANA bootstrap (use only built-in RDAP endpoints)
    #[arg(long = "no-bootstrap", help_heading = "Protocol")]
    pub no_bootstrap: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Debug-level logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", help_heading = "Configuration")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.verbose && args.quiet {
        return Err("Cannot specify both --verbose and --quiet".to_string());
    }

    if let (Some(min), Some(max)) = (args.min_length, args.max_length) {
        if min > max {
            return Err(format!(
                "--min-length {} is greater than --max-length {}",
                min, max
            ));
        }
    }

    for (flag, value) in [
        ("--dns-timeout", &args.dns_timeout),
        ("--registry-timeout", &args.registry_timeout),
        ("--retry-backoff", &args.retry_backoff),
    ] {
        if let Some(value) = value {
            if parse_duration_string(value).is_none() {
                return Err(format!(
                    "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise -v/-q pick the level.
fn init_logging(args: &Args) {
    let level = if args.quiet {
        "warn"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("domain_sieve={level},domain_sieve_lib={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main pipeline logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    config.validate()?;

    let queries = load(
        &config.input_path,
        config.min_length,
        config.max_length,
        &config.suffix,
    )?;

    if args.dry_run {
        ui::print_dry_run(&queries);
        return Ok(());
    }

    let pipeline = Pipeline::new(config.clone())?;

    let abort = pipeline.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing in-flight lookups");
            abort.store(true, Ordering::SeqCst);
        }
    });

    let show_ui = !args.json && !args.quiet;
    if show_ui {
        ui::print_header(queries.len(), &config);
    }

    let report = pipeline.run(queries).await;

    write_available(&report.statuses, &config.output_path)?;
    if let Some(path) = &config.status_log_path {
        write_status_log(&report.statuses, path)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if show_ui {
        ui::print_summary(
            &report,
            &config.output_path,
            config.status_log_path.as_deref(),
        );
    }

    Ok(())
}

/// Layer defaults, config files, `DS_*` variables and CLI flags.
fn build_config(args: &Args) -> Result<SieveConfig, Box<dyn std::error::Error>> {
    let mut config = SieveConfig::default();
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    // Step 1: config files (explicit path skips discovery)
    let explicit = args.config.clone().or_else(|| env_config.config.clone());
    let file_config = match explicit {
        Some(path) => {
            tracing::debug!(path = %path, "using explicit config file");
            config_manager
                .load_file(&path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load()?,
    };
    file_config.apply_to(&mut config)?;

    // Step 2: environment variables (DS_*)
    env_config.apply_to(&mut config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args_to_config(&mut config, args)?;

    Ok(config)
}

/// Apply CLI arguments to config.
///
/// Only flags the user actually passed override lower layers.
fn apply_cli_args_to_config(
    config: &mut SieveConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let duration = |flag: &str, value: &str| {
        parse_duration_string(value).ok_or_else(|| format!("Invalid {} '{}'", flag, value))
    };

    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    if let Some(status_log) = &args.status_log {
        config.status_log_path = Some(status_log.clone());
    }
    if let Some(tld) = &args.tld {
        *config = std::mem::take(config).with_suffix(tld);
    }
    if let Some(min) = args.min_length {
        config.min_length = min;
    }
    if let Some(max) = args.max_length {
        config.max_length = max;
    }
    if let Some(workers) = args.stage1_workers {
        config.stage1_workers = workers;
    }
    if let Some(workers) = args.stage2_workers {
        config.stage2_workers = workers;
    }
    if let Some(value) = &args.dns_timeout {
        config.dns_timeout = duration("--dns-timeout", value)?;
    }
    if let Some(value) = &args.registry_timeout {
        config.registry_timeout = duration("--registry-timeout", value)?;
    }
    if let Some(retries) = args.retries {
        config.retry.max_attempts = retries;
    }
    if let Some(value) = &args.retry_backoff {
        config.retry.backoff = duration("--retry-backoff", value)?;
    }
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }
    if let Some(interval) = args.progress_interval {
        config.progress_interval = interval;
    }
    if let Some(protocol) = args.protocol {
        config.protocol = protocol;
    }
    // Only an explicit flag disables bootstrap; absence keeps lower layers
    if args.no_bootstrap {
        config.enable_bootstrap = false;
    }

    Ok(())
}
