//! SQLite exporter.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::{ensure_parent_dir, ExportSummary};
use crate::error::GrantsError;
use crate::models::{FieldValue, GrantRecord, ResultSet, ID_COLUMN};

/// Table every run writes into
pub const TABLE_NAME: &str = "grants";

/// SQL column type inferred from the observed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Narrowest type holding every non-null value; all-null columns are TEXT
    fn infer<'a>(values: impl Iterator<Item = &'a FieldValue>) -> Self {
        let mut inferred = None;
        for value in values {
            let this = match value {
                FieldValue::Null => continue,
                FieldValue::Bool(_) | FieldValue::Integer(_) => ColumnType::Integer,
                FieldValue::Real(_) => ColumnType::Real,
                FieldValue::Text(_) => return ColumnType::Text,
            };
            inferred = Some(match (inferred, this) {
                (Some(ColumnType::Real), _) | (_, ColumnType::Real) => ColumnType::Real,
                _ => ColumnType::Integer,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }
}

/// SQLite column name for an API attribute (`scheme-name` becomes `scheme_name`)
pub fn column_name(field: &str) -> String {
    field.replace('-', "_")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One table column and the attributes that feed it
#[derive(Debug)]
struct Column<'a> {
    name: String,
    sql_type: ColumnType,
    fields: Vec<&'a str>,
}

impl Column<'_> {
    /// First non-null value among this column's attributes
    fn value(&self, record: &GrantRecord) -> Value {
        self.fields
            .iter()
            .filter_map(|f| record.get(f))
            .find(|v| !v.is_null())
            .map(to_sql_value)
            .unwrap_or(Value::Null)
    }
}

/// Group attributes by their (case-insensitive) SQLite column name
fn plan_columns(results: &ResultSet) -> Vec<Column<'_>> {
    let mut grouped: BTreeMap<String, Column<'_>> = BTreeMap::new();

    for field in results.field_names() {
        let name = column_name(field);
        grouped
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Column {
                name,
                sql_type: ColumnType::Text,
                fields: Vec::new(),
            })
            .fields
            .push(field);
    }

    grouped
        .into_values()
        .map(|mut column| {
            column.sql_type = ColumnType::infer(
                results
                    .iter()
                    .flat_map(|r| column.fields.iter().filter_map(|f| r.get(f))),
            );
            column
        })
        .collect()
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Text(s) => Value::Text(s.clone()),
    }
}

/// Write `results` into the `grants` table of the database at `path`.
///
/// The table is created if missing and widened with any new columns. Rows
/// from an earlier run are replaced, so the table always holds exactly this
/// result set. Everything happens within one transaction.
pub fn write_sqlite(results: &ResultSet, path: &Path) -> Result<ExportSummary, GrantsError> {
    ensure_parent_dir(path)?;
    let sql_err = |e: rusqlite::Error| GrantsError::filesystem(path, e);

    let mut conn = Connection::open(path).map_err(sql_err)?;
    let columns = plan_columns(results);

    let tx = conn.transaction().map_err(sql_err)?;
    prepare_table(&tx, &columns).map_err(sql_err)?;
    insert_rows(&tx, &columns, results).map_err(sql_err)?;
    tx.commit().map_err(sql_err)?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: results.len(),
        columns: columns.len() + 1,
    })
}

fn prepare_table(tx: &Transaction<'_>, columns: &[Column<'_>]) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({} TEXT)",
        quote_ident(TABLE_NAME),
        quote_ident(ID_COLUMN)
    ))?;

    let mut stmt = tx.prepare(&format!("PRAGMA table_info({})", quote_ident(TABLE_NAME)))?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .map(|name| name.map(|n| n.to_ascii_lowercase()))
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    drop(stmt);

    for column in columns {
        if !existing.contains(&column.name.to_ascii_lowercase()) {
            tx.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(TABLE_NAME),
                quote_ident(&column.name),
                column.sql_type.as_sql()
            ))?;
        }
    }

    tx.execute(&format!("DELETE FROM {}", quote_ident(TABLE_NAME)), [])?;
    Ok(())
}

fn insert_rows(
    tx: &Transaction<'_>,
    columns: &[Column<'_>],
    results: &ResultSet,
) -> rusqlite::Result<()> {
    let names: Vec<String> = std::iter::once(ID_COLUMN)
        .chain(columns.iter().map(|c| c.name.as_str()))
        .map(quote_ident)
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();

    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(TABLE_NAME),
        names.join(", "),
        placeholders.join(", ")
    ))?;

    for record in results {
        let values = std::iter::once(Value::Text(record.id.clone()))
            .chain(columns.iter().map(|c| c.value(record)));
        stmt.execute(params_from_iter(values))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn count_rows(path: &Path) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row("SELECT COUNT(*) FROM grants", [], |row| row.get(0))
            .unwrap()
    }

    fn column_types(path: &Path) -> Vec<(String, String)> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn.prepare("PRAGMA table_info(grants)").unwrap();
        let columns: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        columns
    }

    fn sample() -> ResultSet {
        ResultSet::from(vec![
            GrantRecord::new("DP1")
                .field("scheme-name", "Discovery Projects")
                .field("funding-commencement-year", 2020i64)
                .field("current-funding-amount", 412000.5)
                .field("has-fellowship", false),
            GrantRecord::new("LP2")
                .field("scheme-name", "Linkage Projects")
                .field("funding-commencement-year", 2021i64)
                .field("current-funding-amount", 300000i64)
                .field("end-date", FieldValue::Null),
        ])
    }

    #[test]
    fn test_column_type_inference() {
        let ints = [FieldValue::Integer(1), FieldValue::Null, FieldValue::Bool(true)];
        assert_eq!(ColumnType::infer(ints.iter()), ColumnType::Integer);

        let mixed = [FieldValue::Integer(1), FieldValue::Real(2.5)];
        assert_eq!(ColumnType::infer(mixed.iter()), ColumnType::Real);

        let text = [FieldValue::Integer(1), FieldValue::from("n/a")];
        assert_eq!(ColumnType::infer(text.iter()), ColumnType::Text);

        assert_eq!(ColumnType::infer([FieldValue::Null].iter()), ColumnType::Text);
    }

    #[test]
    fn test_column_name_replaces_hyphens() {
        assert_eq!(column_name("admin-org-short-name"), "admin_org_short_name");
        assert_eq!(column_name("status"), "status");
    }

    #[test]
    fn test_writes_schema_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grants.db");

        let summary = write_sqlite(&sample(), &path).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 6);
        assert_eq!(count_rows(&path), 2);

        let types = column_types(&path);
        assert_eq!(types[0], ("id".to_string(), "TEXT".to_string()));
        assert!(types.contains(&("current_funding_amount".to_string(), "REAL".to_string())));
        assert!(types.contains(&("funding_commencement_year".to_string(), "INTEGER".to_string())));
        assert!(types.contains(&("has_fellowship".to_string(), "INTEGER".to_string())));
        assert!(types.contains(&("scheme_name".to_string(), "TEXT".to_string())));
        assert!(types.contains(&("end_date".to_string(), "TEXT".to_string())));

        let conn = Connection::open(&path).unwrap();
        let (scheme, year): (String, i64) = conn
            .query_row(
                "SELECT scheme_name, funding_commencement_year FROM grants WHERE id = 'LP2'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(scheme, "Linkage Projects");
        assert_eq!(year, 2021);
    }

    #[test]
    fn test_empty_result_set_creates_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("empty.db");

        let summary = write_sqlite(&ResultSet::new(), &path).unwrap();
        assert_eq!(summary.rows, 0);
        assert_eq!(count_rows(&path), 0);
        assert_eq!(column_types(&path).len(), 1);
    }

    #[test]
    fn test_existing_table_is_widened() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grants.db");

        let first = ResultSet::from(vec![GrantRecord::new("A").field("status", "Active")]);
        write_sqlite(&first, &path).unwrap();

        let second = ResultSet::from(vec![GrantRecord::new("B")
            .field("status", "Closed")
            .field("lead-investigator", "Prof Jane Citizen")]);
        write_sqlite(&second, &path).unwrap();

        let names: Vec<_> = column_types(&path).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "status", "lead_investigator"]);
    }

    #[test]
    fn test_rerun_replaces_previous_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grants.db");

        write_sqlite(&sample(), &path).unwrap();
        write_sqlite(&sample(), &path).unwrap();
        assert_eq!(count_rows(&path), 2);

        let second = ResultSet::from(vec![GrantRecord::new("B").field("status", "Closed")]);
        write_sqlite(&second, &path).unwrap();
        assert_eq!(count_rows(&path), 1);

        let conn = Connection::open(&path).unwrap();
        let id: String = conn
            .query_row("SELECT id FROM grants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(id, "B");
    }

    #[test]
    fn test_colliding_names_share_a_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grants.db");

        let results = ResultSet::from(vec![
            GrantRecord::new("A").field("grant-status", "Active"),
            GrantRecord::new("B").field("grant_status", "Closed"),
        ]);
        write_sqlite(&results, &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let mut stmt = conn
            .prepare("SELECT grant_status FROM grants ORDER BY id")
            .unwrap();
        let statuses: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(statuses, vec!["Active", "Closed"]);
    }
}
