use crate::pools::PoolDefinition;
use crate::thread::Thread;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Label given to threads that match no configured pool
pub const FALLBACK_POOL: &str = "Other / Standalone";

/// A pool with its patterns compiled
#[derive(Debug)]
struct CompiledPool {
    definition: PoolDefinition,
    patterns: Vec<Regex>,
}

/// Registry of thread pools loaded from TOML configuration
///
/// Construction compiles every pattern and fails on the first invalid one,
/// so a registry that exists can always categorize.
///
/// # Example Usage
/// ```no_run
/// use tdat::pools::PoolRegistry;
///
/// let registry = PoolRegistry::from_toml("pools.toml")?;
/// println!("{}", registry.classify_name("http-nio-8080-exec-1"));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct PoolRegistry {
    pools: Vec<CompiledPool>,
}

#[derive(serde::Deserialize)]
struct PoolFile {
    #[serde(default)]
    pool: Vec<PoolDefinition>,
}

impl PoolRegistry {
    /// Load pool definitions from a TOML configuration file
    ///
    /// # Errors
    /// Returns error if the file can't be read, has invalid TOML syntax, has a
    /// pool without a name, or contains a pattern that is not a valid regex.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read pools file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid pools file: {}", path.as_ref().display()))
    }

    /// Load pool definitions from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PoolFile =
            toml::from_str(content).context("Failed to parse TOML pool definitions")?;
        Self::new(file.pool)
    }

    /// Load the default pool pack compiled into the binary
    pub fn default_pools() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../../pools-default.toml");
        Self::from_toml_str(DEFAULT_TOML).context("Failed to parse embedded pools-default.toml")
    }

    /// Compile an ordered list of pool definitions
    pub fn new(definitions: Vec<PoolDefinition>) -> Result<Self> {
        let mut pools = Vec::with_capacity(definitions.len());
        for (index, definition) in definitions.into_iter().enumerate() {
            if definition.name.trim().is_empty() {
                bail!("Pool #{} has an empty name", index + 1);
            }

            let patterns = definition
                .patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).with_context(|| {
                        format!(
                            "Invalid regex '{}' for pool '{}'",
                            pattern, definition.name
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            tracing::debug!(
                "pool '{}' ({}): {} patterns",
                definition.name,
                definition.description.as_deref().unwrap_or("no description"),
                patterns.len()
            );

            pools.push(CompiledPool {
                definition,
                patterns,
            });
        }

        Ok(Self { pools })
    }

    /// Pool label for a thread name, or [`FALLBACK_POOL`]
    pub fn classify_name(&self, name: &str) -> &str {
        self.pools
            .iter()
            .find(|pool| pool.patterns.iter().any(|re| re.is_match(name)))
            .map_or(FALLBACK_POOL, |pool| pool.definition.name.as_str())
    }

    /// Assign a pool label to every thread in place
    pub fn categorize(&self, threads: &mut [Thread]) {
        for thread in threads {
            thread.thread_pool = self.classify_name(&thread.name).to_string();
        }
    }

    /// Get pool definition by name
    pub fn get_pool(&self, name: &str) -> Option<&PoolDefinition> {
        self.pools
            .iter()
            .map(|pool| &pool.definition)
            .find(|def| def.name == name)
    }

    /// Number of configured pools
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
