//! CSV export of a loaded session list.

use std::path::{Path, PathBuf};

use activator_core::model::SessionRecord;
use chrono::NaiveDate;

use crate::error::ExportError;

pub const CSV_HEADER: &str = "Date,School,Association,Activator,Session Type,Male Students,\
Female Students,Total Participants,Year Groups,Session Length,Teacher Engagement";

/// Quote a field if it contains a delimiter, quote or line break.
fn csv_quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row(record: &SessionRecord) -> String {
    let session = record.session();
    let year_groups = session
        .year_groups()
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    [
        session.date().format("%Y-%m-%d").to_string(),
        csv_quote(session.school()),
        session.association().to_string(),
        csv_quote(session.activator_name()),
        session.session_type().to_string(),
        session.male_students().to_string(),
        session.female_students().to_string(),
        session.participants().to_string(),
        year_groups,
        session.session_length().to_string(),
        session.teacher_engagement().to_string(),
    ]
    .join(",")
}

/// Header plus one row per record, in the given order, joined by `\n`.
#[must_use]
pub fn to_csv(records: &[SessionRecord]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(records.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `cricket-sessions-<date>.csv`
#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("cricket-sessions-{}.csv", date.format("%Y-%m-%d"))
}

/// Write the export for `records` into `dir` and return the file path.
///
/// # Errors
///
/// Returns `ExportError::Io` if the file cannot be written.
pub fn write_export(
    dir: &Path,
    records: &[SessionRecord],
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, to_csv(records)).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote session export");
    Ok(path)
}
