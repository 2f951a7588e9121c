// Configuration-driven thread pool categorization
//
// Pools are loaded once from TOML and their patterns compiled once. Each
// thread name is tested against the pools in file order, and against each
// pool's patterns in listed order; the first hit assigns the label.

mod definition;
mod registry;

pub use definition::PoolDefinition;
pub use registry::{PoolRegistry, FALLBACK_POOL};
