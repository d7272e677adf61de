//! Flat record tables
//!
//! A [`Record`] is an ordered list of `(field, value)` pairs; nested source objects are
//! flattened into dotted field names (`Location.lat`). A [`Table`] keeps rows in arrival
//! order and the union of their field names in first-seen order, so records with
//! optional sub-objects line up by name when rendered.

use serde_json::Map;

/// Scalar cell value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Explicit null in the source (renders as an empty cell)
    Null,
    /// Text value
    Text(String),
    /// Numeric value, kept in its source representation
    Number(serde_json::Number),
    /// Boolean value
    Bool(bool),
}

impl Value {
    /// Render the value as a CSV cell
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }

    /// Returns the text if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

/// One flattened record
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing the value in place if the name already exists
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, value)` pairs in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten a JSON object into a record using dotted names for nested objects
    pub fn from_json_object(object: &Map<String, serde_json::Value>) -> Self {
        let mut record = Record::new();
        flatten_into(&mut record, "", object);
        record
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

fn flatten_into(record: &mut Record, prefix: &str, object: &Map<String, serde_json::Value>) {
    for (key, value) in object {
        let name = format!("{prefix}{key}");
        match value {
            serde_json::Value::Object(inner) => flatten_into(record, &format!("{name}."), inner),
            serde_json::Value::Null => record.insert(name, Value::Null),
            serde_json::Value::String(s) => record.insert(name, Value::Text(s.clone())),
            serde_json::Value::Number(n) => record.insert(name, Value::Number(n.clone())),
            serde_json::Value::Bool(b) => record.insert(name, Value::Bool(*b)),
            // Lists stay in one cell as compact JSON
            serde_json::Value::Array(_) => record.insert(name, Value::Text(value.to_string())),
        }
    }
}

/// Ordered, append-only table of records
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of field names across all rows, in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in arrival order
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one record
    pub fn push(&mut self, record: Record) {
        for name in record.field_names() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.to_string());
            }
        }
        self.rows.push(record);
    }

    /// Append every row of `other`, preserving its order
    pub fn append(&mut self, other: Table) {
        for record in other.rows {
            self.push(record);
        }
    }

    /// Set `name = value` on every row (used to tag rows with their period)
    pub fn stamp(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        for record in &mut self.rows {
            record.insert(name, value.clone());
        }
        if !self.rows.is_empty() && !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    /// Cell at `(row, column)`; `None` when the row lacks the field
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Render each row against the column union; absent fields become empty strings
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|record| {
            self.columns
                .iter()
                .map(|c| record.get(c).map(Value::render).unwrap_or_default())
                .collect()
        })
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut table = Table::new();
        for record in iter {
            table.push(record);
        }
        table
    }
}
