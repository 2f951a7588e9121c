// Built-in rule classifier
//
// Rules are declared in TOML, compiled once, and evaluated per thread through
// the `ThreadClassifier` boundary. An embedded rules-default.toml is used
// when no rules file is given.

mod definition;
mod engine;

pub use definition::{RiskLevel, RuleCondition, RuleDefinition};
pub use engine::RuleEngine;
