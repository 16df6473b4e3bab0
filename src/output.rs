//! Wordlist output.
//!
//! One candidate per line, newline-terminated, no header. The file is
//! truncated on every run.

use crate::sink::ResultList;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// `passwords_{start}_to_{end}.txt`, with the dots of `DD.MM.YYYY` dates
/// replaced by underscores.
pub fn default_file_name(start_date: &str, end_date: &str) -> String {
    format!(
        "passwords_{}_to_{}.txt",
        start_date.trim().replace('.', "_"),
        end_date.trim().replace('.', "_")
    )
}

/// Write every password on its own line. Returns the number of lines.
pub fn write_lines<W: Write>(mut writer: W, passwords: &ResultList) -> std::io::Result<usize> {
    for password in passwords {
        writer.write_all(password.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(passwords.len())
}

/// Create (or overwrite) `path` and write the wordlist to it.
pub fn write_wordlist(path: &Path, passwords: &ResultList) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {:?}", path))?;
    write_lines(BufWriter::new(file), passwords)
        .with_context(|| format!("Failed to write output file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Candidate, CandidateSink};
    use std::fs;
    use tempfile::TempDir;

    fn results(passwords: &[&str]) -> ResultList {
        let sink = CandidateSink::new();
        sink.merge(
            passwords
                .iter()
                .enumerate()
                .map(|(i, p)| Candidate {
                    ordinal: i as u64,
                    password: p.to_string(),
                })
                .collect(),
        );
        sink.into_results(None)
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(
            default_file_name("01.12.2008", "03.02.2009"),
            "passwords_01_12_2008_to_03_02_2009.txt"
        );
    }

    #[test]
    fn test_write_lines() {
        let mut buf = Vec::new();
        let written = write_lines(&mut buf, &results(&["abc", "123", "x!y"])).unwrap();
        assert_eq!(written, 3);
        assert_eq!(buf, b"abc\n123\nx!y\n");
    }

    #[test]
    fn test_write_empty_list() {
        let mut buf = Vec::new();
        assert_eq!(write_lines(&mut buf, &ResultList::default()).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_wordlist_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");

        write_wordlist(&path, &results(&["first", "second", "third"])).unwrap();
        write_wordlist(&path, &results(&["only"])).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "only\n");
    }

    #[test]
    fn test_write_wordlist_reports_path_on_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = write_wordlist(&path, &results(&["a"])).unwrap_err();
        assert!(format!("{:#}", err).contains("out.txt"));
    }
}
