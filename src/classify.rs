//! Boundary between the pipeline and risk classification
//!
//! A classifier reads one thread plus per-file [`GlobalStats`] and writes back
//! `risk_level`, `recommendation` and appends to `issues`. The pipeline does not
//! interpret any of those fields.

use crate::thread::Thread;
use thiserror::Error;

/// Per-file statistics shared with every classification call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalStats {
    pub total_threads: usize,
    pub blocked_count: usize,
    /// `100 * blocked / total`, 0 for an empty file
    pub blocked_percentage: f64,
    /// Whether a usage file was paired with this dump
    pub usage_data_provided: bool,
}

impl GlobalStats {
    /// Compute stats for one file's threads
    pub fn from_threads(threads: &[Thread], usage_data_provided: bool) -> Self {
        let total_threads = threads.len();
        let blocked_count = threads.iter().filter(|t| t.is_blocked()).count();
        let blocked_percentage = if total_threads > 0 {
            blocked_count as f64 / total_threads as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_threads,
            blocked_count,
            blocked_percentage,
            usage_data_provided,
        }
    }
}

/// A classifier could not evaluate a thread
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("rule '{rule}' failed on thread '{thread}': {reason}")]
    Rule {
        rule: String,
        thread: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Risk classification applied to every thread of a file
///
/// Files are processed in parallel, so implementations are shared across threads.
pub trait ThreadClassifier: Send + Sync {
    fn classify(&self, thread: &mut Thread, stats: &GlobalStats) -> Result<(), ClassifyError>;
}

/// Classifier that leaves every thread untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClassifier;

impl ThreadClassifier for NoopClassifier {
    fn classify(&self, _thread: &mut Thread, _stats: &GlobalStats) -> Result<(), ClassifyError> {
        Ok(())
    }
}

/// Classify every thread, stopping at the first failure
///
/// Threads before the failing one keep whatever the classifier wrote.
pub fn classify_all(
    classifier: &dyn ThreadClassifier,
    threads: &mut [Thread],
    stats: &GlobalStats,
) -> Result<(), ClassifyError> {
    for thread in threads {
        classifier.classify(thread, stats)?;
    }
    Ok(())
}
