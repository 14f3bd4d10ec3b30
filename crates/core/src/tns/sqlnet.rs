//! Default domain discovery from `sqlnet.ora`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

use crate::errors::TnsError;

fn default_domain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*NAMES\.DEFAULT_DOMAIN\s*=\s*([\w.]+)")
            .expect("NAMES.DEFAULT_DOMAIN pattern is valid")
    })
}

/// `sqlnet.ora` living next to the given tnsnames file.
pub fn sqlnet_path_for(tnsnames: &Path) -> PathBuf {
    tnsnames
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("sqlnet.ora")
}

/// Read `NAMES.DEFAULT_DOMAIN`. A missing file is not an error.
pub fn read_default_domain(sqlnet: &Path) -> Result<Option<String>, TnsError> {
    let contents = match fs::read(sqlnet) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %sqlnet.display(), "no sqlnet.ora");
            return Ok(None);
        }
        Err(source) => {
            return Err(TnsError::Read {
                path: sqlnet.to_path_buf(),
                source,
            })
        }
    };

    let domain = contents
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .find_map(|l| default_domain_re().captures(l).map(|c| c[1].to_string()));
    debug!(path = %sqlnet.display(), domain = ?domain, "read sqlnet.ora");
    Ok(domain)
}
