//! This module is responsible for SRT parsing and rendering.
//! It exposes helpers to read and write subtitle records while preserving timing.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::trace;

/// A single subtitle entry. Only `text` changes during translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub index: u32,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Subtitle text, lines joined with `\n`.
    pub text: String,
}

/// Parse SRT text into a list of records.
/// This function should read indices, times and text lines preserving order.
pub fn parse(input: &str) -> Result<Vec<SubtitleRecord>> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut records = Vec::new();
    let mut lines = input.lines();
    loop {
        let index_line = match lines.next() {
            Some(l) if !l.trim().is_empty() => l.trim(),
            Some(_) => continue,
            None => break,
        };
        let index: u32 = index_line
            .parse()
            .with_context(|| format!("invalid subtitle index {index_line:?}"))?;
        let time_line = lines
            .next()
            .ok_or_else(|| anyhow!("missing time line after index {index}"))?;
        let (start_ms, end_ms) = parse_times(time_line)
            .with_context(|| format!("invalid time line {:?} for index {index}", time_line.trim()))?;
        let mut text = Vec::new();
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
            text.push(line);
        }
        records.push(SubtitleRecord {
            index,
            start_ms,
            end_ms,
            text: text.join("\n"),
        });
    }
    Ok(records)
}

/// Format subtitle records back to text.
/// Indices are written as they were loaded, never renumbered.
pub fn format(records: &[SubtitleRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            record.index,
            format_time(record.start_ms),
            format_time(record.end_ms),
            record.text
        ));
    }
    out
}

/// Read and parse an SRT file.
pub fn load_file(path: &Path) -> Result<Vec<SubtitleRecord>> {
    trace!("load_file path={}", path.display());
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Render `records` and write them to `path`.
pub fn save_file(path: &Path, records: &[SubtitleRecord]) -> Result<()> {
    trace!("save_file path={} records={}", path.display(), records.len());
    fs::write(path, format(records)).with_context(|| format!("writing {}", path.display()))
}

/// Parse a time range like `00:00:01,000 --> 00:00:02,000` to milliseconds.
fn parse_times(line: &str) -> Result<(u64, u64)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| anyhow!("no time separator"))?;
    Ok((parse_time(start.trim())?, parse_time(end.trim())?))
}

/// Parse `HH:MM:SS,mmm` into milliseconds.
fn parse_time(t: &str) -> Result<u64> {
    let parts: Vec<&str> = t.split([':', ',', '.']).collect();
    if parts.len() != 4 {
        return Err(anyhow!("bad time {t:?}"));
    }
    let h: u64 = parts[0].parse()?;
    let m: u64 = parts[1].parse()?;
    let s: u64 = parts[2].parse()?;
    let ms: u64 = parts[3].parse()?;
    h.checked_mul(60)
        .and_then(|v| v.checked_add(m))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(s))
        .and_then(|v| v.checked_mul(1000))
        .and_then(|v| v.checked_add(ms))
        .ok_or_else(|| anyhow!("time out of range {t:?}"))
}

/// Format milliseconds back to `HH:MM:SS,mmm`.
fn format_time(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
