//! Joining dump threads with sampled CPU usage

use crate::thread::{Thread, ThreadUsage};
use std::collections::HashMap;

/// Merge usage samples into parsed threads by native id
///
/// The last sample wins when a tid appears more than once. A matching sample
/// always replaces `cpu_percentage`; it replaces `cpu_time` only when its user
/// time is positive. Threads without a native id (0) are never matched.
///
/// Returns the number of threads that received a sample.
pub fn correlate(threads: &mut [Thread], usages: &[ThreadUsage]) -> usize {
    let by_tid: HashMap<i64, &ThreadUsage> = usages.iter().map(|u| (u.tid, u)).collect();

    let mut matched = 0;
    for thread in threads.iter_mut().filter(|t| t.native_id != 0) {
        if let Some(usage) = by_tid.get(&thread.native_id) {
            thread.cpu_percentage = usage.cpu_percentage;
            if usage.user_time > 0.0 {
                thread.cpu_time = usage.user_time;
            }
            matched += 1;
        }
    }

    tracing::debug!(
        "correlated {} of {} threads with {} usage samples",
        matched,
        threads.len(),
        usages.len()
    );
    matched
}

/// Derive `cpu_percentage` from header timings when no usage file was supplied
///
/// `cpu_time / (elapsed_time * 1000) * 100`, or 0 when either operand is not positive.
pub fn infer_cpu_percentage(threads: &mut [Thread]) {
    for thread in threads {
        let elapsed_ms = thread.elapsed_time * 1000.0;
        thread.cpu_percentage = if elapsed_ms > 0.0 && thread.cpu_time > 0.0 {
            thread.cpu_time / elapsed_ms * 100.0
        } else {
            0.0
        };
    }
}
