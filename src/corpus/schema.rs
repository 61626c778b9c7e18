//! Table Schema
//!
//! A format's relational shape: the tables it creates (in creation order)
//! and a [`RowPlan`] tree saying which record level feeds which table. The
//! plan mirrors the block tree, so the mapper can walk both together.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use std::fmt;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Stored as text, kept in its original (ISO-8601-like) form.
    Timestamp,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Timestamp => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A value handed to the sink. Only these four shapes ever reach the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r:?}"),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(text) => ToSqlOutput::from(text.as_str()),
            Value::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
        })
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(n) => Value::Integer(n),
            SqlValue::Real(r) => Value::Real(r),
            SqlValue::Text(text) => Value::Text(text),
            SqlValue::Blob(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// Where a column's value comes from, relative to the record being mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// A field of the record itself.
    Own(String),
    /// A field of the nearest ancestor record that has it (parent key).
    Ancestor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub source: ColumnSource,
    /// Empty text loads as NULL and real values may carry thousands separators.
    pub loose: bool,
}

impl ColumnSpec {
    pub fn own(name: &str, ty: ColumnType, field: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            source: ColumnSource::Own(field.to_string()),
            loose: false,
        }
    }

    pub fn inherited(name: &str, ty: ColumnType, field: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            source: ColumnSource::Ancestor(field.to_string()),
            loose: false,
        }
    }

    pub fn loose(mut self) -> Self {
        self.loose = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.ty.sql_name()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_identifier(&self.name)
        )
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Which table a record level feeds, and how its child groups continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    /// Index into [`Schema::tables`].
    pub table: usize,
    /// Child groups, in emission order.
    pub nested: Vec<(String, RowPlan)>,
}

impl RowPlan {
    pub fn new(table: usize) -> Self {
        Self {
            table,
            nested: Vec::new(),
        }
    }

    pub fn nest(mut self, group: &str, plan: RowPlan) -> Self {
        self.nested.push((group.to_string(), plan));
        self
    }
}

/// Tables of one format plus the plan mapping blocks onto them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub tables: Vec<TableSpec>,
    pub plan: RowPlan,
}

impl Schema {
    pub fn table(&self, index: usize) -> &TableSpec {
        &self.tables[index]
    }

    /// The table one row per block lands in.
    pub fn primary_table(&self) -> &TableSpec {
        self.table(self.plan.table)
    }

    pub fn table_named(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// One output tuple for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Index into [`Schema::tables`].
    pub table: usize,
    pub values: Vec<Value>,
}
