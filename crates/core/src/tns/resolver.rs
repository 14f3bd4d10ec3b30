//! Alias lookup with default-domain qualification.
//!
//! Rules, in order:
//! 1. No domain: the upper-cased alias must match a key exactly.
//! 2. Alias already qualified (`NAME.something`): looked up as-is.
//! 3. Otherwise: `ALIAS.DOMAIN` is looked up.
//!
//! A short alias is never matched against an unqualified key when a domain
//! is configured; callers that need both must look up twice.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::trace;

use crate::models::{Registry, TnsEntry};

fn qualified_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+\.").expect("qualified alias pattern is valid"))
}

/// True if the alias already carries a domain part.
pub fn is_qualified(alias: &str) -> bool {
    qualified_re().is_match(alias)
}

/// The registry key `alias` is looked up under for `domain`.
pub fn qualified_name(alias: &str, domain: &str) -> String {
    let alias = alias.trim().to_uppercase();
    let domain = domain.trim();
    if domain.is_empty() || is_qualified(&alias) {
        alias
    } else {
        format!("{}.{}", alias, domain.to_uppercase())
    }
}

/// Find the entry `alias` refers to under `domain`.
pub fn resolve_alias<'a>(alias: &str, registry: &'a Registry, domain: &str) -> Option<&'a TnsEntry> {
    let key = qualified_name(alias, domain);
    let found = registry.get(&key);
    trace!(alias, domain, key = %key, found = found.is_some(), "resolved alias");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> Registry {
        names
            .iter()
            .map(|n| TnsEntry::new(n, format!("(DESCRIPTION=({}))", n), "test"))
            .collect()
    }

    #[test]
    fn test_domain_qualifies_short_alias() {
        let reg = registry(&["XE.LOCAL", "XE.SID"]);
        assert_eq!(qualified_name("XE", "local"), "XE.LOCAL");
        assert_eq!(resolve_alias("xe", &reg, "local").unwrap().name, "XE.LOCAL");
    }

    #[test]
    fn test_qualified_alias_is_not_requalified() {
        let reg = registry(&["XE.SID", "XE.SID.LOCAL"]);
        assert_eq!(qualified_name("XE.SID", "local"), "XE.SID");
        assert_eq!(resolve_alias("XE.SID", &reg, "local").unwrap().name, "XE.SID");
    }

    #[test]
    fn test_no_domain_requires_exact_match() {
        let reg = registry(&["XE.LOCAL"]);
        assert!(resolve_alias("XE", &reg, "").is_none());

        let reg = registry(&["XE", "XE.LOCAL"]);
        assert_eq!(resolve_alias("xe", &reg, "").unwrap().name, "XE");
    }

    #[test]
    fn test_short_alias_not_matched_unqualified_when_domain_set() {
        let reg = registry(&["XE"]);
        assert!(resolve_alias("XE", &reg, "local").is_none());
    }

    #[test]
    fn test_is_qualified() {
        assert!(is_qualified("A.B"));
        assert!(is_qualified("orcl.world.com"));
        assert!(!is_qualified("ORCL"));
        assert!(!is_qualified(".LEADING"));
    }
}
