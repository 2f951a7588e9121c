//! Per-thread CPU usage sample parsing
//!
//! Usage files are whitespace-separated rows of `PID TID %CPU TIME`, as
//! printed by `ps -L -o pid,tid,pcpu,time` and similar tools:
//!
//! ```text
//! PID   TID    %CPU  TIME
//! 4242  0x1a03 12.5  00:01:02
//! 4242  6687   0.3%  1.25
//! ```
//!
//! Rows that cannot be parsed are skipped one at a time.

use crate::dump_parser::{for_each_line, ParseError};
use crate::thread::ThreadUsage;
use std::io::BufRead;

/// Parse a usage sample file from a buffered reader
pub fn parse_usage<R: BufRead>(reader: R) -> Result<Vec<ThreadUsage>, ParseError> {
    let mut usages = Vec::new();
    for_each_line(reader, |line| {
        if let Some(usage) = parse_usage_line(line) {
            usages.push(usage);
        }
    })?;
    tracing::debug!("parsed {} usage samples", usages.len());
    Ok(usages)
}

/// Parse a usage sample file already held in memory
pub fn parse_usage_str(text: &str) -> Vec<ThreadUsage> {
    text.lines().filter_map(parse_usage_line).collect()
}

fn parse_usage_line(line: &str) -> Option<ThreadUsage> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < 4 || columns[0] == "PID" {
        return None;
    }

    let tid = parse_tid(columns[1])?;
    let cpu_percentage = columns[2]
        .trim_matches(|c| c == ' ' || c == '%')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())?;
    let user_time = parse_duration_secs(columns[3]) * 1000.0;
    if !user_time.is_finite() {
        return None;
    }

    Some(ThreadUsage {
        tid,
        cpu_percentage,
        user_time,
    })
}

/// Thread id as `0x`-prefixed hex or plain decimal
fn parse_tid(raw: &str) -> Option<i64> {
    match raw.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("0x") => i64::from_str_radix(&raw[2..], 16).ok(),
        _ => raw.parse().ok(),
    }
}

/// Duration in seconds from `SS[.frac]` or `[[HH:]MM:]SS[.frac]`
///
/// Colon-separated parts are accumulated right to left as `value * 60^position`;
/// a part that is not a number contributes nothing. An unparsable plain value is 0.
pub fn parse_duration_secs(raw: &str) -> f64 {
    let raw = raw.trim();
    if !raw.contains(':') {
        return raw.parse().unwrap_or(0.0);
    }

    let mut total = 0.0;
    let mut multiplier = 1.0;
    for part in raw.rsplit(':') {
        if let Ok(value) = part.parse::<f64>() {
            total += value * multiplier;
        }
        multiplier *= 60.0;
    }
    total
}
