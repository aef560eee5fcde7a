//! CSV export helpers and download filename conventions.
//!
//! Export uses RFC-4180-style quoting: a field is wrapped in double
//! quotes when it contains a quote, comma, or newline, with embedded
//! quotes doubled. The same cell formatter serves the full-table export,
//! the per-unit export, and the header-only template.

use serde_json::Value;

use crate::types::DbId;

/// Format one cell for CSV output. Nulls become empty fields.
pub fn format_csv_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.contains(['"', ',', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

/// Join already-formatted cells into one CSV line.
pub fn csv_line<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Replace every character outside `[a-zA-Z0-9]` with an underscore.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `data_for_<sanitized-title>[_branch_<id>].csv`
pub fn export_filename(title: &str, unit_id: Option<DbId>) -> String {
    match unit_id {
        Some(id) => format!("data_for_{}_branch_{id}.csv", sanitize_title(title)),
        None => format!("data_for_{}.csv", sanitize_title(title)),
    }
}

/// `template_for_<sanitized-title>.csv`
pub fn template_filename(title: &str) -> String {
    format!("template_for_{}.csv", sanitize_title(title))
}
