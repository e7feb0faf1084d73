//! Exporters for the accumulated result set.
//!
//! Both exporters consume a finished [`ResultSet`]; they never fetch or
//! filter. Parent directories are created on demand.

mod csv;
mod sqlite;

pub use self::csv::{write_csv, write_csv_to};
pub use self::sqlite::{column_name, write_sqlite, ColumnType, TABLE_NAME};

use chrono::{DateTime, Local};
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::error::GrantsError;
use crate::models::ResultSet;

/// Stem of the timestamped default file names
pub const DEFAULT_FILE_PREFIX: &str = "arc_grants";

/// Where one run writes its outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub sqlite: PathBuf,
}

impl OutputPaths {
    /// Resolve output paths from the optional flags.
    ///
    /// With neither flag both files go to `dir/arc_grants_<timestamp>.{csv,db}`;
    /// with one flag the other path is derived by swapping the extension.
    pub fn resolve(
        csv: Option<PathBuf>,
        sqlite: Option<PathBuf>,
        dir: &Path,
        now: DateTime<Local>,
    ) -> Self {
        match (csv, sqlite) {
            (Some(csv), Some(sqlite)) => Self { csv, sqlite },
            (Some(csv), None) => Self {
                sqlite: csv.with_extension("db"),
                csv,
            },
            (None, Some(sqlite)) => Self {
                csv: sqlite.with_extension("csv"),
                sqlite,
            },
            (None, None) => {
                let stem = format!("{}_{}", DEFAULT_FILE_PREFIX, now.format("%Y%m%d_%H%M%S"));
                Self {
                    csv: dir.join(format!("{}.csv", stem)),
                    sqlite: dir.join(format!("{}.db", stem)),
                }
            }
        }
    }

    /// Reject a CSV and SQLite target that name the same file.
    ///
    /// `--csv grants.db` derives `grants.db` for SQLite too, and so does
    /// `--sqlite grants.csv` the other way round.
    pub fn validate(&self) -> Result<(), GrantsError> {
        if same_path(&self.csv, &self.sqlite) {
            return Err(GrantsError::InvalidArgument(format!(
                "CSV and SQLite outputs both point at {}; pass distinct --csv and --sqlite paths",
                self.csv.display()
            )));
        }
        Ok(())
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    let significant = |p: &Path| -> Vec<PathBuf> {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| PathBuf::from(c.as_os_str()))
            .collect()
    };
    significant(a) == significant(b)
}

/// What an exporter wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Write the result set to CSV, then to SQLite
pub fn export_all(
    results: &ResultSet,
    paths: &OutputPaths,
) -> Result<(ExportSummary, ExportSummary), GrantsError> {
    paths.validate()?;

    let csv = write_csv(results, &paths.csv)?;
    info!(path = %csv.path.display(), rows = csv.rows, "Exported CSV");

    let sqlite = write_sqlite(results, &paths.sqlite)?;
    info!(path = %sqlite.path.display(), rows = sqlite.rows, "Exported SQLite database");

    Ok((csv, sqlite))
}

fn ensure_parent_dir(path: &Path) -> Result<(), GrantsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| GrantsError::filesystem(parent, e))
        }
        _ => Ok(()),
    }
}
