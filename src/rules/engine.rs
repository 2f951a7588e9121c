use crate::classify::{ClassifyError, GlobalStats, ThreadClassifier};
use crate::rules::{RiskLevel, RuleDefinition};
use crate::thread::Thread;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug)]
struct CompiledRule {
    definition: RuleDefinition,
    name_re: Option<Regex>,
}

impl CompiledRule {
    fn matches(&self, thread: &Thread, stats: &GlobalStats) -> Result<bool, ClassifyError> {
        let when = &self.definition.when;

        if let Some(state) = &when.state {
            if &thread.state != state {
                return Ok(false);
            }
        }
        if let Some(pool) = &when.pool {
            if &thread.thread_pool != pool {
                return Ok(false);
            }
        }
        if let Some(re) = &self.name_re {
            if !re.is_match(&thread.name) {
                return Ok(false);
            }
        }
        if let Some(needle) = &when.stack_contains {
            if !thread.stack_trace.iter().any(|frame| frame.contains(needle)) {
                return Ok(false);
            }
        }
        if let Some(depth) = when.min_stack_depth {
            if thread.stack_trace.len() < depth {
                return Ok(false);
            }
        }
        if let Some(usage_data) = when.usage_data {
            if stats.usage_data_provided != usage_data {
                return Ok(false);
            }
        }
        if let Some(min) = when.min_cpu_percent {
            if !self.at_least(thread, "cpu percentage", thread.cpu_percentage, min)? {
                return Ok(false);
            }
        }
        if let Some(min) = when.min_cpu_time_ms {
            if !self.at_least(thread, "cpu time", thread.cpu_time, min)? {
                return Ok(false);
            }
        }
        if let Some(min) = when.min_blocked_percentage {
            if stats.blocked_percentage < min {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// `value >= min`, refusing to compare NaN
    fn at_least(
        &self,
        thread: &Thread,
        field: &str,
        value: f64,
        min: f64,
    ) -> Result<bool, ClassifyError> {
        if value.is_nan() {
            return Err(ClassifyError::Rule {
                rule: self.definition.name.clone(),
                thread: thread.name.clone(),
                reason: format!("{} is not a number", field),
            });
        }
        Ok(value >= min)
    }
}

/// Rule-based [`ThreadClassifier`] loaded from TOML
///
/// Each matching rule appends its issue. The thread's risk level becomes the
/// highest level matched ([`RiskLevel::Info`] when nothing matches) and its
/// recommendation comes from the first matching rule at that level that has one.
#[derive(Debug)]
pub struct RuleEngine {
    /// Sorted by descending salience, ties in definition order
    rules: Vec<CompiledRule>,
}

#[derive(serde::Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleDefinition>,
}

impl RuleEngine {
    /// Load rules from a TOML file
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed, two rules share a
    /// name, or a `name_matches` pattern is not a valid regex.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read rules file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid rules file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(content).context("Failed to parse TOML rules")?;
        Self::new(file.rule)
    }

    /// Load the default rule pack compiled into the binary
    pub fn default_rules() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../../rules-default.toml");
        Self::from_toml_str(DEFAULT_TOML).context("Failed to parse embedded rules-default.toml")
    }

    pub fn new(definitions: Vec<RuleDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(definitions.len());

        for definition in definitions {
            if !seen.insert(definition.name.clone()) {
                bail!("Duplicate rule name '{}'", definition.name);
            }

            let name_re = definition
                .when
                .name_matches
                .as_deref()
                .map(Regex::new)
                .transpose()
                .with_context(|| {
                    format!("Invalid name_matches regex in rule '{}'", definition.name)
                })?;

            rules.push(CompiledRule {
                definition,
                name_re,
            });
        }

        rules.sort_by_key(|rule| Reverse(rule.definition.salience));
        Ok(Self { rules })
    }

    /// Rule definitions in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().map(|rule| &rule.definition)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ThreadClassifier for RuleEngine {
    fn classify(&self, thread: &mut Thread, stats: &GlobalStats) -> Result<(), ClassifyError> {
        let mut level = RiskLevel::Info;
        let mut recommendation: Option<&str> = None;

        for rule in &self.rules {
            if !rule.matches(thread, stats)? {
                continue;
            }

            let def = &rule.definition;
            thread.add_issue(def.issue.as_str());

            if def.risk_level > level {
                level = def.risk_level;
                recommendation = def.recommendation.as_deref();
            } else if def.risk_level == level && recommendation.is_none() {
                recommendation = def.recommendation.as_deref();
            }
        }

        thread.risk_level = level.to_string();
        thread.recommendation = recommendation.unwrap_or_default().to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleCondition;

    fn rule(name: &str, level: RiskLevel, when: RuleCondition) -> RuleDefinition {
        RuleDefinition {
            name: name.to_string(),
            salience: 0,
            risk_level: level,
            issue: format!("{} fired", name),
            recommendation: Some(format!("fix {}", name)),
            when,
        }
    }

    fn blocked_thread() -> Thread {
        Thread {
            state: "BLOCKED".to_string(),
            ..Thread::new("http-nio-8080-exec-1", "0x1")
        }
    }

    #[test]
    fn test_highest_level_wins_and_all_issues_recorded() {
        let engine = RuleEngine::new(vec![
            rule("any", RiskLevel::Medium, RuleCondition::default()),
            rule(
                "blocked",
                RiskLevel::High,
                RuleCondition {
                    state: Some("BLOCKED".to_string()),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();

        let mut thread = blocked_thread();
        engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap();

        assert_eq!(thread.risk_level, "HIGH");
        assert_eq!(thread.recommendation, "fix blocked");
        assert_eq!(thread.issues, vec!["any fired", "blocked fired"]);
    }

    #[test]
    fn test_no_match_is_info() {
        let engine = RuleEngine::new(vec![rule(
            "runnable",
            RiskLevel::High,
            RuleCondition {
                state: Some("RUNNABLE".to_string()),
                ..Default::default()
            },
        )])
        .unwrap();

        let mut thread = blocked_thread();
        engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap();
        assert_eq!(thread.risk_level, "INFO");
        assert!(thread.issues.is_empty());
        assert!(thread.recommendation.is_empty());
    }

    #[test]
    fn test_salience_orders_issues() {
        let mut low = rule("low", RiskLevel::Info, RuleCondition::default());
        low.salience = 1;
        let mut high = rule("high", RiskLevel::Info, RuleCondition::default());
        high.salience = 10;
        let engine = RuleEngine::new(vec![low, high]).unwrap();

        assert_eq!(
            engine.rules().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["high", "low"]
        );

        let mut thread = blocked_thread();
        engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap();
        assert_eq!(thread.issues, vec!["high fired", "low fired"]);
        assert_eq!(thread.recommendation, "fix high");
    }

    #[test]
    fn test_recommendation_falls_through_at_same_level() {
        let mut silent = rule("silent", RiskLevel::High, RuleCondition::default());
        silent.recommendation = None;
        let engine = RuleEngine::new(vec![
            silent,
            rule("loud", RiskLevel::High, RuleCondition::default()),
        ])
        .unwrap();

        let mut thread = blocked_thread();
        engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap();
        assert_eq!(thread.recommendation, "fix loud");
    }

    #[test]
    fn test_global_conditions() {
        let engine = RuleEngine::new(vec![rule(
            "contention",
            RiskLevel::Critical,
            RuleCondition {
                min_blocked_percentage: Some(25.0),
                usage_data: Some(true),
                ..Default::default()
            },
        )])
        .unwrap();

        let mut thread = blocked_thread();
        let calm = GlobalStats {
            blocked_percentage: 10.0,
            usage_data_provided: true,
            ..Default::default()
        };
        engine.classify(&mut thread, &calm).unwrap();
        assert_eq!(thread.risk_level, "INFO");

        let mut thread = blocked_thread();
        let contended = GlobalStats {
            blocked_percentage: 50.0,
            usage_data_provided: true,
            ..Default::default()
        };
        engine.classify(&mut thread, &contended).unwrap();
        assert_eq!(thread.risk_level, "CRITICAL");
    }

    #[test]
    fn test_thread_conditions() {
        let engine = RuleEngine::new(vec![rule(
            "hot-http",
            RiskLevel::High,
            RuleCondition {
                pool: Some("Tomcat HTTP Workers".to_string()),
                name_matches: Some("^http-nio-\\d+".to_string()),
                stack_contains: Some("socketRead".to_string()),
                min_cpu_percent: Some(50.0),
                min_cpu_time_ms: Some(1000.0),
                min_stack_depth: Some(2),
                ..Default::default()
            },
        )])
        .unwrap();

        let mut thread = blocked_thread();
        thread.thread_pool = "Tomcat HTTP Workers".to_string();
        thread.cpu_percentage = 60.0;
        thread.cpu_time = 5000.0;
        thread.stack_trace = vec![
            "at java.net.SocketInputStream.socketRead0(Native Method)".to_string(),
            "at java.net.SocketInputStream.read(SocketInputStream.java:150)".to_string(),
        ];

        let mut cold = thread.clone();
        cold.cpu_time = 10.0;

        engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap();
        assert_eq!(thread.risk_level, "HIGH");

        engine.classify(&mut cold, &GlobalStats::default()).unwrap();
        assert_eq!(cold.risk_level, "INFO");
    }

    #[test]
    fn test_nan_cpu_is_an_error() {
        let engine = RuleEngine::new(vec![rule(
            "hot",
            RiskLevel::High,
            RuleCondition {
                min_cpu_percent: Some(50.0),
                ..Default::default()
            },
        )])
        .unwrap();

        let mut thread = blocked_thread();
        thread.cpu_percentage = f64::NAN;
        let err = engine
            .classify(&mut thread, &GlobalStats::default())
            .unwrap_err();
        assert!(err.to_string().contains("rule 'hot'"));
        assert!(err.to_string().contains("cpu percentage is not a number"));
    }

    #[test]
    fn test_duplicate_rule_name_rejected() {
        let result = RuleEngine::new(vec![
            rule("same", RiskLevel::Info, RuleCondition::default()),
            rule("same", RiskLevel::High, RuleCondition::default()),
        ]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate rule name 'same'"));
    }

    #[test]
    fn test_invalid_name_regex_rejected() {
        let result = RuleEngine::new(vec![rule(
            "broken",
            RiskLevel::Info,
            RuleCondition {
                name_matches: Some("[".to_string()),
                ..Default::default()
            },
        )]);
        assert!(result.unwrap_err().to_string().contains("rule 'broken'"));
    }

    #[test]
    fn test_default_rules_load() {
        let engine = RuleEngine::default_rules().expect("Failed to load default rules");
        assert!(!engine.is_empty());
        assert_eq!(engine.rules().next().unwrap().name, "widespread-contention");

        let mut thread = blocked_thread();
        let stats = GlobalStats {
            total_threads: 2,
            blocked_count: 1,
            blocked_percentage: 50.0,
            usage_data_provided: true,
        };
        engine.classify(&mut thread, &stats).unwrap();
        assert_eq!(thread.risk_level, "CRITICAL");
        assert_eq!(thread.issues.len(), 2);
    }
}
