//! Oracle Net `tnsnames.ora` handling: parsing, alias resolution, rendering,
//! and `sqlnet.ora` default-domain discovery.

pub mod parser;
pub mod resolver;
pub mod sqlnet;
pub mod writer;

use regex_lite::RegexBuilder;

use crate::errors::TnsError;
use crate::models::Registry;

pub use parser::parse_tnsnames;
pub use resolver::{qualified_name, resolve_alias};
pub use writer::{render_tnsnames, write_tnsnames};

/// Entries whose alias matches `pattern` (case-insensitive, unanchored).
pub fn filter_registry(registry: &Registry, pattern: &str) -> Result<Registry, TnsError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| TnsError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
    Ok(registry
        .iter()
        .filter(|entry| re.is_match(&entry.name))
        .cloned()
        .collect())
}
