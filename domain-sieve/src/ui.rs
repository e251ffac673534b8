//! Terminal display for the domain-sieve CLI.
//!
//! Headers and summaries go to stdout; progress lines are tracing events on
//! stderr. Uses only the `console` crate.

use console::{pad_str, style, Alignment};
use domain_sieve_lib::{DomainQuery, PipelineReport, SieveConfig, StageSummary, VERSION};
use std::path::Path;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(candidates: usize, config: &SieveConfig) {
    println!(
        "{} {} {}",
        style("domain-sieve").bold(),
        style(format!("v{}", VERSION)).dim(),
        style(format!(
            "- {} candidate{} for .{}",
            candidates,
            if candidates == 1 { "" } else { "s" },
            config.suffix
        ))
        .dim(),
    );

    let meta = [
        format!("Stage 1: {} workers", config.stage1_workers),
        format!("Stage 2: {} workers", config.stage2_workers),
        format!("Registry: {}", config.protocol),
        format!("Retries: {}", config.retry.max_attempts),
    ];
    println!("{}", style(meta.join(" | ")).dim());
    println!();
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// List the loaded candidates without checking them.
pub fn print_dry_run(queries: &[DomainQuery]) {
    for query in queries {
        println!("{}", query);
    }
    eprintln!(
        "{}",
        style(format!(
            "{} candidate{} (dry run, nothing checked)",
            queries.len(),
            if queries.len() == 1 { "" } else { "s" }
        ))
        .dim()
    );
}

// ── Summary ──────────────────────────────────────────────────────────────────

fn stage_line(label: &str, summary: &StageSummary, found_label: &str) {
    let label = pad_str(label, 10, Alignment::Left, None);
    println!(
        "  {}  {} processed  {}  {}  {}  {}  {}  {:.1}s",
        style(label).bold(),
        style(format!("{}/{}", summary.processed, summary.total)).bold(),
        style("|").dim(),
        style(format!("{} {}", summary.found, found_label)).green(),
        style("|").dim(),
        if summary.errors > 0 {
            style(format!("{} errors", summary.errors)).yellow()
        } else {
            style(format!("{} errors", summary.errors)).dim()
        },
        style("|").dim(),
        summary.elapsed.as_secs_f64(),
    );
}

/// Print the end-of-run summary.
pub fn print_summary(report: &PipelineReport, output: &Path, status_log: Option<&Path>) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    stage_line("Stage 1", &report.prescreen, "candidates");
    stage_line("Stage 2", &report.verify, "available");
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );

    println!(
        "  {} scanned  {}  {}  {}  {} registry call{}",
        style(report.scanned).bold(),
        style("|").dim(),
        style(format!("{} confirmed available", report.available.len()))
            .green()
            .bold(),
        style("|").dim(),
        report.registry_calls,
        if report.registry_calls == 1 { "" } else { "s" },
    );
    println!(
        "  {} {}",
        style("Saved to").dim(),
        style(output.display()).cyan()
    );
    if let Some(path) = status_log {
        println!(
            "  {} {}",
            style("Status log").dim(),
            style(path.display()).cyan()
        );
    }

    if report.aborted() {
        println!(
            "  {}",
            style("Interrupted: unverified candidates were not written as available").yellow()
        );
    }
}
