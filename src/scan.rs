//! Creation-time scanner.
//!
//! Looks for the `\x04time` key in a raw file, skips a short gap and reads
//! the following four bytes as a little-endian Unix timestamp. Only values
//! between early 2009 and 2033 are kept. The gap is matched greedily: up to
//! ten bytes, none of them a newline, leaving room for the value.
//!
//! Several files are read concurrently on the tokio runtime; a file that
//! cannot be read is reported without affecting the others.

use crate::config::DATE_FORMAT;
use crate::task::TimeWindow;
use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub const MARKER: &[u8] = b"\x04time";
pub const MAX_GAP: usize = 10;
/// Exclusive lower bound on accepted timestamps (January 2009).
pub const MIN_TIMESTAMP: u32 = 1_231_000_000;
/// Exclusive upper bound on accepted timestamps (May 2033).
pub const MAX_TIMESTAMP: u32 = 2_000_000_000;

pub fn is_plausible(timestamp: u32) -> bool {
    MIN_TIMESTAMP < timestamp && timestamp < MAX_TIMESTAMP
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack.windows(MARKER.len()).position(|w| w == MARKER)
}

/// Every plausible timestamp in `data`, in file order, duplicates included.
pub fn scan_bytes(data: &[u8]) -> Vec<u32> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(rel) = find_marker(&data[pos..]) {
        let gap_start = pos + rel + MARKER.len();
        // Later markers have even less room, so nothing else can match.
        let Some(room) = data.len().checked_sub(gap_start + 4) else {
            break;
        };
        let run = data[gap_start..]
            .iter()
            .take(MAX_GAP)
            .take_while(|&&b| b != b'\n')
            .count();
        let at = gap_start + run.min(room);
        let value = u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        if is_plausible(value) {
            found.push(value);
        } else {
            debug!("Ignoring out-of-range value {} at offset {}", value, at);
        }
        pos = at + 4;
    }
    found
}

/// Read a file asynchronously and scan it.
pub async fn scan_file(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("Failed to open file {:?}", path))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .await
        .with_context(|| format!("Failed to read file {:?}", path))?;
    let timestamps = scan_bytes(&data);
    info!("{:?}: {} bytes, {} candidate timestamps", path, data.len(), timestamps.len());
    Ok(timestamps)
}

/// Outcome of scanning one file.
#[derive(Debug)]
pub struct FileScan {
    pub path: PathBuf,
    pub timestamps: Result<Vec<u32>>,
}

/// Scan several files concurrently. Results come back in input order.
pub async fn scan_files(paths: Vec<PathBuf>) -> Vec<FileScan> {
    let tasks: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| tokio::spawn(async move { scan_file(&path).await }))
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .zip(paths)
        .map(|(joined, path)| {
            let timestamps = match joined {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("Scan task failed: {}", e)),
            };
            if let Err(e) = &timestamps {
                error!("{:?}: {:#}", path, e);
            }
            FileScan { path, timestamps }
        })
        .collect()
}

/// Distinct timestamps over all successful scans, ascending.
pub fn distinct_timestamps(scans: &[FileScan]) -> Vec<u32> {
    let mut all: Vec<u32> = scans
        .iter()
        .filter_map(|s| s.timestamps.as_ref().ok())
        .flatten()
        .copied()
        .collect();
    all.sort_unstable();
    all.dedup();
    all
}

/// `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_utc(timestamp: u32) -> String {
    Utc.timestamp_opt(i64::from(timestamp), 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Start and end dates (`DD.MM.YYYY`, UTC) of a generation window covering
/// every timestamp: the day of the earliest and the day after the latest.
pub fn suggested_dates(timestamps: &[u32]) -> Option<(String, String)> {
    let window = TimeWindow::covering(timestamps.iter().map(|&t| i64::from(t)))?;
    let first = Utc.timestamp_opt(window.start(), 0).single()?.date_naive();
    let last = Utc.timestamp_opt(window.end() - 1, 0).single()?.date_naive();
    let after = last.checked_add_signed(Duration::days(1))?;
    Some((
        first.format(DATE_FORMAT).to_string(),
        after.format(DATE_FORMAT).to_string(),
    ))
}
