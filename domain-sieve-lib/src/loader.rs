//! Candidate loading.
//!
//! Turns a line-delimited word list into the domain queries fed to Stage 1.

use crate::error::DomainSieveError;
use crate::types::DomainQuery;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"^[a-z]+$").expect("valid token pattern");
}

/// Normalize one raw line into a candidate token.
///
/// Returns `None` for blank lines, lines outside `min_len..=max_len`, and
/// lines containing anything other than letters.
pub fn normalize_token(raw: &str, min_len: usize, max_len: usize) -> Option<String> {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }

    let len = token.chars().count();
    if len < min_len || len > max_len {
        return None;
    }

    if !TOKEN_PATTERN.is_match(&token) {
        return None;
    }

    Some(token)
}

/// Load candidate queries from a file.
///
/// # Errors
///
/// Returns `DomainSieveError::SourceUnavailable` if the file cannot be
/// opened or a line cannot be read. Nothing is retried.
pub fn load<P: AsRef<Path>>(
    source: P,
    min_len: usize,
    max_len: usize,
    suffix: &str,
) -> Result<Vec<DomainQuery>, DomainSieveError> {
    let path = source.as_ref();
    let file = File::open(path).map_err(|e| {
        DomainSieveError::source_unavailable(path.to_string_lossy(), e.to_string())
    })?;

    let queries = load_from_reader(BufReader::new(file), min_len, max_len, suffix).map_err(
        |e| match e {
            DomainSieveError::SourceUnavailable { message, .. } => {
                DomainSieveError::source_unavailable(path.to_string_lossy(), message)
            }
            other => other,
        },
    )?;

    tracing::info!(
        path = %path.display(),
        candidates = queries.len(),
        min_len,
        max_len,
        "loaded candidate list"
    );
    Ok(queries)
}

/// Load candidate queries from any buffered reader.
///
/// Duplicate tokens are dropped, keeping the first occurrence, so each
/// domain is classified once per run.
pub fn load_from_reader<R: BufRead>(
    reader: R,
    min_len: usize,
    max_len: usize,
    suffix: &str,
) -> Result<Vec<DomainQuery>, DomainSieveError> {
    let mut seen = HashSet::new();
    let mut queries = Vec::new();
    let mut rejected = 0usize;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            DomainSieveError::source_unavailable(
                "<reader>",
                format!("line {}: {}", line_num + 1, e),
            )
        })?;

        if line.trim().is_empty() {
            continue;
        }

        match normalize_token(&line, min_len, max_len) {
            Some(token) => {
                if seen.insert(token.clone()) {
                    queries.push(DomainQuery::new(&token, suffix));
                }
            }
            None => rejected += 1,
        }
    }

    if rejected > 0 {
        tracing::debug!(rejected, "dropped tokens outside length/charset bounds");
    }

    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn domains(queries: &[DomainQuery]) -> Vec<&str> {
        queries.iter().map(|q| q.domain()).collect()
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("  Hello \t", 4, 6), Some("hello".to_string()));
        assert_eq!(normalize_token("hello!", 4, 6), None);
        assert_eq!(normalize_token("abc", 4, 6), None);
        assert_eq!(normalize_token("abcdefg", 4, 6), None);
        assert_eq!(normalize_token("ab1cd", 4, 6), None);
        assert_eq!(normalize_token("", 1, 6), None);
        assert_eq!(normalize_token("café", 1, 6), None);
    }

    #[test]
    fn test_loader_example_scenario() {
        let input = Cursor::new("abcde\nzzzzzz\nhello!\n");
        let queries = load_from_reader(input, 4, 6, "com").unwrap();
        assert_eq!(domains(&queries), vec!["abcde.com", "zzzzzz.com"]);
    }

    #[test]
    fn test_loader_skips_blank_lines_and_duplicates() {
        let input = Cursor::new("\n  \nWORDS\nwords  \n\nfiles\n");
        let queries = load_from_reader(input, 4, 6, ".net").unwrap();
        assert_eq!(domains(&queries), vec!["words.net", "files.net"]);
    }

    #[test]
    fn test_every_query_respects_length_bounds() {
        let input = Cursor::new("a\nab\nabc\nabcd\nabcde\nabcdef\nabcdefg\n");
        let queries = load_from_reader(input, 3, 5, "com").unwrap();
        assert!(queries
            .iter()
            .all(|q| (3..=5).contains(&q.token().len())));
        assert_eq!(queries.len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sieve\nbucket\n").unwrap();
        file.flush().unwrap();

        let queries = load(file.path(), 5, 6, "io").unwrap();
        assert_eq!(domains(&queries), vec!["sieve.io", "bucket.io"]);
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let err = load("/definitely/not/here/words.txt", 1, 6, "com").unwrap_err();
        assert!(matches!(err, DomainSieveError::SourceUnavailable { .. }));
        assert!(err.is_fatal());
    }
}
