//! Thread records recovered from dump captures and usage samples

use serde::{Deserialize, Serialize};

/// A single thread from one dump capture
///
/// Created fresh by the dump parser, then mutated in place by the correlator,
/// the pool categorizer and the rule classifier before it is copied into an
/// aggregated snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Identifier token from the header (`tid=...`)
    pub id: String,
    /// Display name (the quoted part of the header)
    pub name: String,
    /// Pool label, empty until categorized
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thread_pool: String,
    /// Normalized single-token state (e.g. "RUNNABLE", "BLOCKED")
    pub state: String,
    /// OS-level thread id parsed from `nid=0x...`, 0 when absent
    pub native_id: i64,
    /// Trimmed frame and lock-annotation lines, in dump order
    pub stack_trace: Vec<String>,
    /// Seconds since the thread started
    #[serde(rename = "elapsed_time_s")]
    pub elapsed_time: f64,
    /// CPU time in milliseconds
    #[serde(rename = "cpu_time_ms")]
    pub cpu_time: f64,
    /// CPU usage, 0-100
    #[serde(rename = "cpu_percent")]
    pub cpu_percentage: f64,

    /// Risk level written by the classifier
    #[serde(default)]
    pub risk_level: String,
    /// Issues appended by the classifier
    #[serde(default)]
    pub issues: Vec<String>,
    /// Recommendation written by the classifier
    #[serde(default)]
    pub recommendation: String,
}

impl Thread {
    /// Create a thread with the header identity and everything else zeroed
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// Append an issue found by a classifier
    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    /// Whether the thread was captured in the BLOCKED state
    pub fn is_blocked(&self) -> bool {
        self.state == "BLOCKED"
    }
}

/// One row of a CPU usage sample file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreadUsage {
    /// Native thread id
    pub tid: i64,
    /// CPU usage, 0-100
    #[serde(rename = "cpu_percent")]
    pub cpu_percentage: f64,
    /// User time in milliseconds
    #[serde(rename = "user_time_ms")]
    pub user_time: f64,
}
