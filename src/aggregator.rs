//! Pivot per-file thread lists into per-thread histories
//!
//! Threads are matched across dump files by the composite key
//! `{id, name, native_id, thread_pool}`. Two threads with the same key text
//! are treated as the same logical thread, so callers must only aggregate
//! dumps taken from the same process.
//!
//! # Example
//!
//! ```
//! use tdat::aggregator::{aggregate_threads, ParsedFile};
//! use tdat::thread::Thread;
//!
//! let files = vec![
//!     ParsedFile::new("dump-1.txt", vec![Thread::new("main", "0x1")]),
//!     ParsedFile::new("dump-2.txt", vec![Thread::new("main", "0x1")]),
//! ];
//! let threads = aggregate_threads(&files);
//! assert_eq!(threads.len(), 1);
//! assert_eq!(threads[0].snapshots.len(), 2);
//! ```

use crate::thread::Thread;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The threads parsed from one dump file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub file_name: String,
    pub threads: Vec<Thread>,
}

impl ParsedFile {
    pub fn new(file_name: impl Into<String>, threads: Vec<Thread>) -> Self {
        Self {
            file_name: file_name.into(),
            threads,
        }
    }
}

/// One thread's recorded state in a single dump file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    #[serde(rename = "dump_name")]
    pub file_name: String,
    pub state: String,
    pub stack_trace: Vec<String>,
    #[serde(rename = "elapsed_time_s")]
    pub elapsed_time: f64,
    #[serde(rename = "cpu_time_ms")]
    pub cpu_time: f64,
    #[serde(rename = "cpu_percent")]
    pub cpu_percentage: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recommendation: String,
}

impl ThreadSnapshot {
    fn from_thread(file_name: &str, thread: &Thread) -> Self {
        Self {
            file_name: file_name.to_string(),
            state: thread.state.clone(),
            stack_trace: thread.stack_trace.clone(),
            elapsed_time: thread.elapsed_time,
            cpu_time: thread.cpu_time,
            cpu_percentage: thread.cpu_percentage,
            risk_level: thread.risk_level.clone(),
            issues: thread.issues.clone(),
            recommendation: thread.recommendation.clone(),
        }
    }
}

/// A logical thread and its snapshots, in file-processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedThread {
    pub id: String,
    pub name: String,
    pub native_id: i64,
    pub thread_pool: String,
    pub snapshots: Vec<ThreadSnapshot>,
}

/// Identity used to match threads across files
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThreadKey<'a> {
    id: &'a str,
    name: &'a str,
    native_id: i64,
    thread_pool: &'a str,
}

impl<'a> ThreadKey<'a> {
    fn of(thread: &'a Thread) -> Self {
        Self {
            id: &thread.id,
            name: &thread.name,
            native_id: thread.native_id,
            thread_pool: &thread.thread_pool,
        }
    }
}

/// Group threads from many files into per-thread histories
///
/// Output is ordered by first appearance: files in the order given, threads
/// in parser order within a file. A thread gets one snapshot per occurrence.
pub fn aggregate_threads(files: &[ParsedFile]) -> Vec<AnalyzedThread> {
    let mut index: HashMap<ThreadKey<'_>, usize> = HashMap::new();
    let mut aggregated: Vec<AnalyzedThread> = Vec::new();

    for file in files {
        for thread in &file.threads {
            let slot = *index.entry(ThreadKey::of(thread)).or_insert_with(|| {
                aggregated.push(AnalyzedThread {
                    id: thread.id.clone(),
                    name: thread.name.clone(),
                    native_id: thread.native_id,
                    thread_pool: thread.thread_pool.clone(),
                    snapshots: Vec::new(),
                });
                aggregated.len() - 1
            });

            aggregated[slot]
                .snapshots
                .push(ThreadSnapshot::from_thread(&file.file_name, thread));
        }
    }

    tracing::debug!(
        "aggregated {} files into {} threads",
        files.len(),
        aggregated.len()
    );
    aggregated
}
