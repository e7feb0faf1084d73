//! Grant record and result set models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the identifier column in every export
pub const ID_COLUMN: &str = "id";

/// Whether an attribute would shadow the identifier column (`id`, `ID`, `Id`, ...)
pub fn is_id_field(name: &str) -> bool {
    name.eq_ignore_ascii_case(ID_COLUMN)
}

/// A single attribute value as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    /// Plain strings, and nested arrays/objects kept as compact JSON text
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Null renders as an empty string so it reads as an absent cell in CSV.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One grant returned by the search API.
///
/// Attributes are passed through as received; the API schema is not fixed,
/// so they are kept as a name to value mapping rather than a struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGrant")]
pub struct GrantRecord {
    /// Grant identifier (e.g. "DP200100001")
    pub id: String,

    /// Attribute name to value
    pub fields: BTreeMap<String, FieldValue>,
}

impl GrantRecord {
    /// Create a record with no attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add an attribute
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute by its API name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Wire shape of a grant: `{"id": ..., "type": ..., "attributes": {...}}`
#[derive(Deserialize)]
struct RawGrant {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
}

impl From<RawGrant> for GrantRecord {
    fn from(raw: RawGrant) -> Self {
        let id = match raw.id {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        };

        let fields = raw
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, FieldValue::from(value)))
            .collect();

        Self { id, fields }
    }
}

/// All records fetched during one run, in API order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<GrantRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of records, preserving order
    pub fn extend(&mut self, records: impl IntoIterator<Item = GrantRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GrantRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[GrantRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GrantRecord> {
        self.records
    }

    /// Sorted union of attribute names across all records.
    ///
    /// Attributes named `id` in any letter case are left out; the record
    /// identifier owns that column in every export.
    pub fn field_names(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .flat_map(|r| r.fields.keys())
            .map(String::as_str)
            .filter(|name| !is_id_field(name))
            .collect()
    }
}

impl From<Vec<GrantRecord>> for ResultSet {
    fn from(records: Vec<GrantRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a GrantRecord;
    type IntoIter = std::slice::Iter<'a, GrantRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
