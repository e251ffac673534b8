//! Result sinks.
//!
//! Both outputs are plain text, one entry per line, written to a temporary
//! file in the destination directory and renamed over the destination.

use crate::error::DomainSieveError;
use crate::types::{DomainStatus, LookupOutcome};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write the confirmed-available domains, sorted, one per line.
///
/// Only `AvailableConfirmed` statuses are written; the destination is
/// replaced even when the set is empty.
pub fn write_available<P: AsRef<Path>>(
    statuses: &[DomainStatus],
    destination: P,
) -> Result<usize, DomainSieveError> {
    let mut domains: Vec<&str> = statuses
        .iter()
        .filter(|s| s.outcome == LookupOutcome::AvailableConfirmed)
        .map(|s| s.domain.as_str())
        .collect();
    domains.sort_unstable();
    domains.dedup();

    let mut contents = String::new();
    for domain in &domains {
        contents.push_str(domain);
        contents.push('\n');
    }

    write_atomic(destination.as_ref(), contents.as_bytes())?;
    Ok(domains.len())
}

/// Write `<domain>: <status>` for every domain, sorted by domain.
pub fn write_status_log<P: AsRef<Path>>(
    statuses: &[DomainStatus],
    destination: P,
) -> Result<usize, DomainSieveError> {
    let mut sorted: Vec<&DomainStatus> = statuses.iter().collect();
    sorted.sort_by(|a, b| a.domain.cmp(&b.domain));

    let mut contents = String::new();
    for status in &sorted {
        contents.push_str(&format!(
            "{}: {}\n",
            status.domain,
            status.outcome.resolve_conservative().label()
        ));
    }

    write_atomic(destination.as_ref(), contents.as_bytes())?;
    Ok(sorted.len())
}

fn write_atomic(destination: &Path, contents: &[u8]) -> Result<(), DomainSieveError> {
    let file_error = |e: std::io::Error| {
        DomainSieveError::file_error(destination.to_string_lossy(), e.to_string())
    };

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(file_error)?;
    tmp.write_all(contents).map_err(file_error)?;
    tmp.as_file().sync_all().map_err(file_error)?;
    tmp.persist(destination).map_err(|e| file_error(e.error))?;

    tracing::debug!(path = %destination.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn status(domain: &str, outcome: LookupOutcome) -> DomainStatus {
        DomainStatus {
            domain: domain.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_write_available_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("available.txt");
        let statuses = vec![
            status("zzzzzz.com", LookupOutcome::AvailableConfirmed),
            status("abcdef.com", LookupOutcome::RegisteredConfirmed),
            status("qqqqqq.com", LookupOutcome::AvailableConfirmed),
            status("mmmmmm.com", LookupOutcome::AvailableProbable),
        ];

        let written = write_available(&statuses, &path).unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "qqqqqq.com\nzzzzzz.com\n"
        );
    }

    #[test]
    fn test_write_available_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("available.txt");
        std::fs::write(&path, "stale.com\n").unwrap();

        write_available(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_status_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.txt");
        let statuses = vec![
            status("zzzzzz.com", LookupOutcome::AvailableConfirmed),
            status("abcdef.com", LookupOutcome::RegisteredConfirmed),
            status("flaky.com", LookupOutcome::Indeterminate),
        ];

        write_status_log(&statuses, &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "abcdef.com: registered\nflaky.com: registered\nzzzzzz.com: available\n"
        );
    }

    #[test]
    fn test_unwritable_destination_is_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("out.txt");
        let err = write_available(&[], &path).unwrap_err();
        assert!(matches!(err, DomainSieveError::FileError { .. }));
        assert!(err.is_fatal());
    }
}
