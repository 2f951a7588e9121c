//! Analysis report and its output formats

use crate::aggregator::AnalyzedThread;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Random UUID v4
    pub session_id: String,
    /// RFC 3339 UTC time the report was built
    pub timestamp: String,
    pub threads: Vec<AnalyzedThread>,
    /// One message per file that failed somewhere in its pipeline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AnalysisReport {
    /// Stamp aggregated threads with a fresh session id and the current time
    pub fn new(threads: Vec<AnalyzedThread>, errors: Vec<String>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            threads,
            errors,
        }
    }

    /// True when no thread survived parsing
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn snapshot_count(&self) -> usize {
        self.threads.iter().map(|t| t.snapshots.len()).sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering, one block per thread
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session:   {}", self.session_id)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(
            f,
            "Threads:   {} ({} snapshots)",
            self.threads.len(),
            self.snapshot_count()
        )?;

        for thread in &self.threads {
            writeln!(f)?;
            writeln!(
                f,
                "\"{}\" id={} nid=0x{:x} pool={}",
                thread.name, thread.id, thread.native_id, thread.thread_pool
            )?;
            for snap in &thread.snapshots {
                writeln!(
                    f,
                    "  {:<24} {:<14} cpu={:>6.2}% cpu_time={:.2}ms elapsed={:.2}s risk={} issues={}",
                    snap.file_name,
                    or_dash(&snap.state),
                    snap.cpu_percentage,
                    snap.cpu_time,
                    snap.elapsed_time,
                    or_dash(&snap.risk_level),
                    snap.issues.len()
                )?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  {}", error)?;
            }
        }

        Ok(())
    }
}
