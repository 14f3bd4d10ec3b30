//! Shared styling utilities for CLI output.

use comfy_table::{Cell, Color};
use console::Style;

use tnsync_core::SyncStatus;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Table cell for a reconciliation state.
pub fn status_cell(status: SyncStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        SyncStatus::Unchanged => cell,
        SyncStatus::New => cell.fg(Color::Green),
        SyncStatus::Modified => cell.fg(Color::Yellow),
        SyncStatus::AbsentLocally => cell.fg(Color::Red),
        SyncStatus::Skip => cell.fg(Color::DarkGrey),
    }
}

/// Colored `+` / `-` lines of a unified diff.
pub fn patch(text: &str) -> String {
    let added = Style::new().green();
    let removed = Style::new().red();
    let hunk = Style::new().cyan();
    text.lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                dim(line)
            } else if line.starts_with('+') {
                added.apply_to(line).to_string()
            } else if line.starts_with('-') {
                removed.apply_to(line).to_string()
            } else if line.starts_with("@@") {
                hunk.apply_to(line).to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
