use serde::{Deserialize, Serialize};

/// User-defined thread pool loaded from TOML configuration
///
/// # Example TOML
/// ```toml
/// [[pool]]
/// name = "Tomcat HTTP Workers"
/// description = "Servlet container request threads"
/// patterns = ["^http-nio-.*-exec-\\d+$"]
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolDefinition {
    /// Label assigned to matching threads
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Regular expressions tested against the thread name
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl PoolDefinition {
    pub fn new(name: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_without_optional_fields() {
        let def: PoolDefinition = toml::from_str(r#"name = "IO""#).unwrap();
        assert_eq!(def.name, "IO");
        assert!(def.description.is_none());
        assert!(def.patterns.is_empty());
    }

    #[test]
    fn test_new() {
        let def = PoolDefinition::new("Worker", &[".*"]);
        assert_eq!(def.patterns, vec![".*".to_string()]);
    }
}
