//! CSV exporter.

use std::io::Write;
use std::path::Path;

use super::{ensure_parent_dir, ExportSummary};
use crate::error::GrantsError;
use crate::models::{ResultSet, ID_COLUMN};

/// Write `results` to a CSV file at `path`, replacing any existing file.
///
/// The header is `id` followed by every attribute name seen in any record,
/// sorted. Absent and null values are written as empty cells.
pub fn write_csv(results: &ResultSet, path: &Path) -> Result<ExportSummary, GrantsError> {
    ensure_parent_dir(path)?;
    let file = std::fs::File::create(path).map_err(|e| GrantsError::filesystem(path, e))?;

    let columns = write_csv_to(results, file).map_err(|e| match e {
        GrantsError::Filesystem(msg) => GrantsError::filesystem(path, msg),
        other => other,
    })?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: results.len(),
        columns,
    })
}

/// Write `results` as CSV to any writer; returns the number of columns
pub fn write_csv_to<W: Write>(results: &ResultSet, writer: W) -> Result<usize, GrantsError> {
    let mut writer = csv::Writer::from_writer(writer);
    let fields = results.field_names();

    let header = std::iter::once(ID_COLUMN).chain(fields.iter().copied());
    writer.write_record(header).map_err(csv_error)?;

    for record in results {
        let cells = std::iter::once(record.id.clone()).chain(
            fields
                .iter()
                .map(|name| record.get(name).map(ToString::to_string).unwrap_or_default()),
        );
        writer.write_record(cells).map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(fields.len() + 1)
}

fn csv_error(err: csv::Error) -> GrantsError {
    GrantsError::Filesystem(err.to_string())
}
