use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level written to classified threads
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Info,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Info => "INFO",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conditions a thread must satisfy for a rule to fire
///
/// Every field that is present must hold; an empty condition always matches.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleCondition {
    /// Exact normalized state, e.g. "BLOCKED"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Exact pool label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Regex tested against the thread name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_matches: Option<String>,

    /// Substring of any stack frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_contains: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cpu_percent: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cpu_time_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stack_depth: Option<usize>,

    /// Percentage of BLOCKED threads in the same file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_blocked_percentage: Option<f64>,

    /// Whether a usage file was paired with the dump
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_data: Option<bool>,
}

/// A single classification rule
///
/// # Example TOML
/// ```toml
/// [[rule]]
/// name = "blocked-thread"
/// salience = 90
/// risk_level = "HIGH"
/// issue = "Thread is BLOCKED waiting to enter a monitor"
/// recommendation = "Find the thread holding the monitor"
/// when = { state = "BLOCKED" }
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleDefinition {
    /// Unique rule name
    pub name: String,

    /// Higher runs first
    #[serde(default)]
    pub salience: i32,

    pub risk_level: RiskLevel,

    /// Issue appended to matching threads
    pub issue: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,

    #[serde(default)]
    pub when: RuleCondition,
}
