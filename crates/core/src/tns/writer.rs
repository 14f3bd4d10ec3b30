//! Render a [`Registry`] back into `tnsnames.ora` text.
//!
//! Output re-parses to the same names and descriptions as long as no
//! descriptor contains blank lines, `#` lines, or lines starting with an
//! `alias =` token in column zero. Entries with an empty descriptor are left
//! out, since the parser drops them.

use std::io::Write;

use chrono::Utc;
use tracing::debug;

use crate::errors::TnsError;
use crate::models::Registry;

/// Render every entry as `NAME =\n  <descriptor>\n` in registry order.
pub fn render_tnsnames(registry: &Registry) -> String {
    let (entries, empty): (Vec<_>, Vec<_>) = registry
        .iter()
        .partition(|e| !e.description.trim().is_empty());
    for entry in &empty {
        debug!(alias = %entry.name, "skipping entry with empty descriptor");
    }

    let mut out = String::new();
    out.push_str("# tnsnames.ora generated by tnsync\n");
    out.push_str(&format!("# {} entries, {}\n", entries.len(), Utc::now().to_rfc3339()));

    for entry in entries {
        out.push('\n');
        out.push_str(&entry.name);
        out.push_str(" =\n  ");
        out.push_str(&entry.description);
        out.push('\n');
    }
    out
}

pub fn write_tnsnames<W: Write>(registry: &Registry, mut out: W) -> Result<(), TnsError> {
    out.write_all(render_tnsnames(registry).as_bytes())?;
    out.flush()?;
    Ok(())
}
