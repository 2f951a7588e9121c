//! Thread dump parsing
//!
//! Recovers [`Thread`] records from the text of a thread dump. The format is
//! semi-free-form: a header line per thread starting with the quoted thread
//! name, followed by a state line and indented stack frames. Anything that
//! does not look like one of those is ignored.
//!
//! ```text
//! "main" #1 prio=5 os_prio=0 cpu=1.50s elapsed=12.01s tid=0x00007f8c nid=0x1a03 runnable
//!    java.lang.Thread.State: RUNNABLE
//!         at java.io.FileInputStream.readBytes(Native Method)
//!         - locked <0x000000076ab2e0a8> (a java.io.BufferedInputStream)
//! ```
//!
//! # Example
//!
//! ```
//! use tdat::dump_parser::parse_dump_str;
//!
//! let threads = parse_dump_str("\"main\" #1 cpu=2s elapsed=4s tid=0x1 nid=0x1f\n");
//! assert_eq!(threads.len(), 1);
//! assert_eq!(threads[0].cpu_time, 2000.0);
//! assert_eq!(threads[0].native_id, 0x1f);
//! ```

use crate::thread::Thread;
use regex::Regex;
use std::io::{self, BufRead};
use std::sync::LazyLock;
use thiserror::Error;

/// Quoted name followed eventually by the identifier marker
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(.+?)"\s+.*tid=(\S+)"#).expect("valid header regex"));

static NATIVE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"nid=0[xX]([0-9a-fA-F]+)").expect("valid nid regex"));

static CPU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cpu=([\d\.]+)\s*(ms|s|ns)?").expect("valid cpu regex"));

static ELAPSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"elapsed=([\d\.]+)\s*(ms|s)?").expect("valid elapsed regex"));

static STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*java\.lang\.Thread\.State:\s+(.+)").expect("valid state regex")
});

static STACK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(at\s+|-\s+locked|\+?\s*waiting)").expect("valid stack line regex")
});

const STATE_MARKER: &str = "java.lang.Thread.State";

/// Failure to read an input stream
///
/// Malformed content never produces an error; only the underlying reader can fail.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Parse a thread dump from a buffered reader
///
/// Invalid UTF-8 is replaced rather than rejected, so the only failure mode
/// is the reader itself.
pub fn parse_dump<R: BufRead>(reader: R) -> Result<Vec<Thread>, ParseError> {
    let mut scanner = DumpScanner::new();
    for_each_line(reader, |line| scanner.feed(line))?;
    let threads = scanner.finish();
    tracing::debug!("parsed {} threads from dump", threads.len());
    Ok(threads)
}

/// Parse a thread dump already held in memory
pub fn parse_dump_str(text: &str) -> Vec<Thread> {
    let mut scanner = DumpScanner::new();
    for line in text.lines() {
        scanner.feed(line);
    }
    scanner.finish()
}

/// Feed every line of `reader` to `f`, without the trailing `\n` or `\r\n`
pub(crate) fn for_each_line<R: BufRead>(
    mut reader: R,
    mut f: impl FnMut(&str),
) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.strip_suffix('\n').unwrap_or(&*text);
        let line = line.strip_suffix('\r').unwrap_or(line);
        f(line);
    }
}

/// Outer state of the line scanner
#[derive(Debug)]
enum ScanState {
    /// Before the first valid header
    NoRecord,
    /// A header has been seen; body lines attach to this record
    InHeader(Thread),
}

/// What a non-header line means for the open record
#[derive(Debug, PartialEq)]
enum BodyLine<'a> {
    State(&'a str),
    Frame(&'a str),
    Ignored,
}

/// Incremental line-by-line dump scanner
///
/// Output order is header order. A line starting with `"` that does not
/// carry both a quoted name and a `tid=` marker is skipped and the open
/// record stays open.
#[derive(Debug)]
pub struct DumpScanner {
    state: ScanState,
    threads: Vec<Thread>,
}

impl Default for DumpScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::NoRecord,
            threads: Vec::new(),
        }
    }

    /// Process one line of input
    pub fn feed(&mut self, line: &str) {
        if line.starts_with('"') {
            if let Some(thread) = parse_header(line) {
                let previous = std::mem::replace(&mut self.state, ScanState::InHeader(thread));
                if let ScanState::InHeader(done) = previous {
                    self.threads.push(done);
                }
            }
            return;
        }

        let ScanState::InHeader(thread) = &mut self.state else {
            return;
        };

        match classify_body_line(line) {
            BodyLine::State(state) => thread.state = state.to_string(),
            BodyLine::Frame(frame) => thread.stack_trace.push(frame.to_string()),
            BodyLine::Ignored => {}
        }
    }

    /// Close any open record and return all threads in header order
    pub fn finish(mut self) -> Vec<Thread> {
        if let ScanState::InHeader(done) = self.state {
            self.threads.push(done);
        }
        self.threads
    }
}

/// Build a new record from a header line, or `None` if the line is noise
fn parse_header(line: &str) -> Option<Thread> {
    let caps = HEADER_RE.captures(line)?;
    let mut thread = Thread::new(&caps[1], &caps[2]);

    if let Some(nid) = NATIVE_ID_RE.captures(line) {
        if let Ok(value) = i64::from_str_radix(&nid[1], 16) {
            thread.native_id = value;
        }
    }

    if let Some(cpu) = parse_cpu_time_ms(line) {
        thread.cpu_time = cpu;
    }
    if let Some(elapsed) = parse_elapsed_secs(line) {
        thread.elapsed_time = elapsed;
    }

    Some(thread)
}

/// `cpu=` attribute in milliseconds; `s` is scaled, anything else is taken as ms
fn parse_cpu_time_ms(line: &str) -> Option<f64> {
    let caps = CPU_RE.captures(line)?;
    let value: f64 = caps[1].parse().ok()?;
    match caps.get(2).map(|m| m.as_str()) {
        Some("s") => Some(value * 1000.0),
        _ => Some(value),
    }
}

/// `elapsed=` attribute in seconds; `ms` is scaled, anything else is taken as s
fn parse_elapsed_secs(line: &str) -> Option<f64> {
    let caps = ELAPSED_RE.captures(line)?;
    let value: f64 = caps[1].parse().ok()?;
    match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => Some(value / 1000.0),
        _ => Some(value),
    }
}

fn classify_body_line(line: &str) -> BodyLine<'_> {
    if line.contains(STATE_MARKER) {
        // First token only: drops qualifiers like "(on object monitor)"
        return STATE_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|raw| raw.as_str().split_whitespace().next())
            .map_or(BodyLine::Ignored, BodyLine::State);
    }

    if STACK_LINE_RE.is_match(line) {
        return BodyLine::Frame(line.trim());
    }

    BodyLine::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"2024-01-15 10:00:00
Full thread dump OpenJDK 64-Bit Server VM (17.0.2+8 mixed mode):

"main" #1 prio=5 os_prio=0 cpu=1.50s elapsed=12.01s tid=0x00007f8c0000a000 nid=0x1a03 runnable  [0x00007f8c05fe000]
   java.lang.Thread.State: RUNNABLE
        at java.io.FileInputStream.readBytes(Native Method)
        at java.io.FileInputStream.read(FileInputStream.java:255)
        - locked <0x000000076ab2e0a8> (a java.io.BufferedInputStream)

"Worker-1" #12 daemon prio=5 os_prio=0 cpu=150 elapsed=500ms tid=0x00007f8c0012b000 nid=0x1a1f waiting on condition
   java.lang.Thread.State: WAITING (on object monitor)
        at java.lang.Object.wait(Native Method)

"GC Thread#0" os_prio=0 cpu=3.21ms elapsed=12.03s tid=0x00007f8c00038000 nid=0x1a04 runnable

JNI global refs: 15, weak refs: 0
"#;

    #[test]
    fn test_parses_all_headers_in_order() {
        let threads = parse_dump_str(SAMPLE);
        let names: Vec<&str> = threads.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["main", "Worker-1", "GC Thread#0"]);
    }

    #[test]
    fn test_header_fields() {
        let threads = parse_dump_str(SAMPLE);
        let main = &threads[0];
        assert_eq!(main.id, "0x00007f8c0000a000");
        assert_eq!(main.native_id, 0x1a03);
        assert_eq!(main.cpu_time, 1500.0);
        assert_eq!(main.elapsed_time, 12.01);
        assert_eq!(main.state, "RUNNABLE");
        assert_eq!(main.stack_trace.len(), 3);
        assert_eq!(
            main.stack_trace[2],
            "- locked <0x000000076ab2e0a8> (a java.io.BufferedInputStream)"
        );
    }

    #[test]
    fn test_unit_normalization() {
        let threads = parse_dump_str(SAMPLE);
        let worker = &threads[1];
        assert_eq!(worker.cpu_time, 150.0);
        assert_eq!(worker.elapsed_time, 0.5);
        let gc = &threads[2];
        assert_eq!(gc.cpu_time, 3.21);
    }

    #[test]
    fn test_cpu_seconds_and_plain_elapsed() {
        let threads = parse_dump_str("\"t\" cpu=2s elapsed=3 tid=7\n");
        assert_eq!(threads[0].cpu_time, 2000.0);
        assert_eq!(threads[0].elapsed_time, 3.0);
    }

    #[test]
    fn test_state_strips_qualifier() {
        let threads = parse_dump_str(SAMPLE);
        assert_eq!(threads[1].state, "WAITING");
        assert!(threads[2].state.is_empty());
    }

    #[test]
    fn test_missing_attributes_stay_zero() {
        let threads = parse_dump_str("\"bare\" #3 tid=abc\n");
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "abc");
        assert_eq!(threads[0].native_id, 0);
        assert_eq!(threads[0].cpu_time, 0.0);
        assert_eq!(threads[0].elapsed_time, 0.0);
    }

    #[test]
    fn test_leading_noise_is_ignored() {
        let text = "   at not.a.Frame(Before.java:1)\n   java.lang.Thread.State: BLOCKED\n\"a\" tid=1\n";
        let threads = parse_dump_str(text);
        assert_eq!(threads.len(), 1);
        assert!(threads[0].stack_trace.is_empty());
        assert!(threads[0].state.is_empty());
    }

    #[test]
    fn test_quoted_noise_line_keeps_record_open() {
        let text = "\"a\" tid=1\n\"just a quote\"\n   at x.Y.z(Y.java:1)\n";
        let threads = parse_dump_str(text);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].stack_trace, vec!["at x.Y.z(Y.java:1)"]);
    }

    #[test]
    fn test_unindented_frames_are_not_stack_lines() {
        let threads = parse_dump_str("\"a\" tid=1\nat x.Y.z(Y.java:1)\n");
        assert!(threads[0].stack_trace.is_empty());
    }

    #[test]
    fn test_classify_body_line() {
        assert_eq!(
            classify_body_line("   java.lang.Thread.State: TIMED_WAITING (sleeping)"),
            BodyLine::State("TIMED_WAITING")
        );
        assert_eq!(
            classify_body_line("\tat a.B.c(B.java:10)"),
            BodyLine::Frame("at a.B.c(B.java:10)")
        );
        assert_eq!(
            classify_body_line("    waiting on condition"),
            BodyLine::Frame("waiting on condition")
        );
        assert_eq!(classify_body_line("Locked ownable synchronizers:"), BodyLine::Ignored);
        assert_eq!(classify_body_line(""), BodyLine::Ignored);
    }

    #[test]
    fn test_invalid_native_id_left_zero() {
        // Overflows i64
        let threads = parse_dump_str("\"a\" tid=1 nid=0xffffffffffffffffff\n");
        assert_eq!(threads[0].native_id, 0);
    }

    #[test]
    fn test_garbled_number_left_zero() {
        let threads = parse_dump_str("\"a\" cpu=1.2.3s elapsed=..ms tid=1\n");
        assert_eq!(threads[0].cpu_time, 0.0);
        assert_eq!(threads[0].elapsed_time, 0.0);
    }

    #[test]
    fn test_reader_matches_str_and_handles_crlf() {
        let crlf = SAMPLE.replace('\n', "\r\n");
        let from_reader = parse_dump(crlf.as_bytes()).unwrap();
        assert_eq!(from_reader, parse_dump_str(SAMPLE));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"\"a\" tid=1\n   at x.Y(\xff.java)\n".to_vec();
        bytes.extend_from_slice(b"\"b\" tid=2\n");
        let threads = parse_dump(bytes.as_slice()).unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].stack_trace.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_dump_str("").is_empty());
        assert!(parse_dump(&b""[..]).unwrap().is_empty());
    }
}
