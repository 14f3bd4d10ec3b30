//! Line-oriented parser for `tnsnames.ora` files.
//!
//! Descriptors are not parsed structurally. Everything between one
//! `ALIAS =` line and the next (or an `IFILE=` directive, or EOF) is kept as
//! opaque text, and `SERVICE_NAME` / `HOST` / `PORT` are mined out of it with
//! regexes. The text itself is what gets compared and written to LDAP, so it
//! must survive byte-for-byte.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::errors::TnsError;
use crate::models::{Address, Registry, TnsEntry};

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\w.]+)\s*=(.*)").expect("alias pattern is valid"))
}

fn ifile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*IFILE\s*=\s*(.*)").expect("IFILE pattern is valid"))
}

fn service_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)SERVICE_NAME\s*=\s*([\w.]+)").expect("SERVICE_NAME pattern is valid")
    })
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)HOST\s*=\s*([\w.]+)\s*\)\s*\(\s*PORT\s*=\s*(\d+)")
            .expect("HOST/PORT pattern is valid")
    })
}

/// First `SERVICE_NAME=` value in a descriptor, or an empty string.
pub fn extract_service(description: &str) -> String {
    service_re()
        .captures(description)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// All `(HOST=..)(PORT=..)` pairs in order of appearance.
pub fn extract_addresses(description: &str) -> Vec<Address> {
    address_re()
        .captures_iter(description)
        .filter_map(|caps| match caps[2].parse::<u16>() {
            Ok(port) => Some(Address {
                host: caps[1].to_string(),
                port,
            }),
            Err(_) => {
                debug!(host = &caps[1], port = &caps[2], "dropping address with out-of-range port");
                None
            }
        })
        .collect()
}

/// Parse a tnsnames file into a [`Registry`].
///
/// With `recursive`, `IFILE=` directives are followed relative to the
/// directory of the file containing them. A failing include is logged and
/// skipped; only an unreadable top-level file is an error.
pub fn parse_tnsnames(path: impl AsRef<Path>, recursive: bool) -> Result<Registry, TnsError> {
    let path = path.as_ref();
    info!(path = %path.display(), recursive, "parsing tnsnames file");

    let mut chain = Vec::new();
    let registry = parse_file(path, recursive, &mut chain)?;

    debug!(count = registry.len(), "parsed tnsnames entries");
    Ok(registry)
}

/// Parse descriptor text that did not come from a file.
///
/// `IFILE` lines are resolved against `base_dir`.
pub fn parse_str(
    contents: &str,
    source: &str,
    base_dir: &Path,
    recursive: bool,
) -> Registry {
    let mut chain = Vec::new();
    parse_contents(contents, source, base_dir, recursive, &mut chain)
}

/// `chain` holds the canonical paths of the files currently being parsed,
/// outermost first.
fn parse_file(
    path: &Path,
    recursive: bool,
    chain: &mut Vec<PathBuf>,
) -> Result<Registry, TnsError> {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if chain.contains(&canonical) {
        return Err(TnsError::IncludeCycle {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| TnsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = String::from_utf8_lossy(&bytes);

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let source = path.display().to_string();

    chain.push(canonical);
    let registry = parse_contents(&contents, &source, base_dir, recursive, chain);
    chain.pop();

    Ok(registry)
}

struct OpenAlias {
    name: String,
    body: String,
}

fn parse_contents(
    contents: &str,
    source: &str,
    base_dir: &Path,
    recursive: bool,
    chain: &mut Vec<PathBuf>,
) -> Registry {
    let mut registry = Registry::new();
    let mut open: Option<OpenAlias> = None;

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // IFILE must be checked first: it also looks like an assignment.
        if let Some(caps) = ifile_re().captures(line) {
            finalize(&mut registry, open.take(), source);
            let target = include_path(base_dir, &caps[1]);
            if !recursive {
                debug!(include = %target.display(), "IFILE not followed (recursion disabled)");
                continue;
            }
            match parse_file(&target, recursive, chain) {
                Ok(included) => {
                    debug!(
                        include = %target.display(),
                        count = included.len(),
                        "merged IFILE entries"
                    );
                    registry.merge(included);
                }
                Err(e) => {
                    warn!(include = %target.display(), error = %e, "ignoring failed IFILE include");
                }
            }
            continue;
        }

        if let Some(caps) = alias_re().captures(line) {
            finalize(&mut registry, open.take(), source);
            let mut body = String::new();
            let rest = caps[2].trim();
            if !rest.is_empty() {
                body.push_str(rest);
                body.push('\n');
            }
            open = Some(OpenAlias {
                name: caps[1].to_string(),
                body,
            });
            continue;
        }

        match open.as_mut() {
            Some(current) => {
                current.body.push_str(line);
                current.body.push('\n');
            }
            None => debug!(line, "ignoring text outside of any alias"),
        }
    }

    finalize(&mut registry, open.take(), source);
    registry
}

fn finalize(registry: &mut Registry, open: Option<OpenAlias>, source: &str) {
    let Some(alias) = open else {
        return;
    };
    let description = alias.body.trim();
    if description.is_empty() {
        debug!(alias = %alias.name, "dropping alias with empty descriptor");
        return;
    }
    let entry = TnsEntry::new(&alias.name, description, source);
    if let Some(previous) = registry.insert(entry) {
        debug!(
            alias = %previous.name,
            previous_source = %previous.source,
            "alias redefined, keeping the later definition"
        );
    }
}

fn include_path(base_dir: &Path, raw: &str) -> PathBuf {
    let value = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let target = Path::new(value);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        base_dir.join(target)
    }
}
