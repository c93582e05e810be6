use crate::error::{EtlError, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Declared type of a column. Everything in the mart is text except the
/// payment amount, which needs exact signed arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
}

/// A single cell value. `Null` is a first-class value: left joins produce
/// it for unmatched right-hand attributes, and it is a legal group key
/// (null groups with null).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(String),
    Number(Decimal),
    Null,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    fn matches_type(&self, ty: ColumnType) -> bool {
        match (self, ty) {
            (Value::Null, _) => true,
            (Value::Text(_), ColumnType::Text) => true,
            (Value::Number(_), ColumnType::Number) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(d) => write!(f, "{}", d),
            Value::Null => write!(f, "<null>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn text(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            ty: ColumnType::Text,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            ty: ColumnType::Number,
        }
    }
}

/// Ordered set of named, typed columns shared by every row of a RecordSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(EtlError::Schema(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of a column that must exist, for join/aggregate key
    /// resolution. Missing columns are a contract violation between
    /// stages and fail before any row is touched.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::Schema(format!("column '{}' not found", name)))
    }
}

pub type Row = Vec<Value>;

/// An immutable, ordered collection of typed rows sharing one schema.
/// The unit of data passed between pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl RecordSet {
    /// Builds a RecordSet, checking every row's arity and cell types
    /// against the schema up front.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let schema = Arc::new(schema);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(EtlError::Schema(format!(
                    "row {} has {} values, schema has {} columns",
                    row_idx,
                    row.len(),
                    schema.len()
                )));
            }
            for (col, value) in schema.columns().iter().zip(row.iter()) {
                if !value.matches_type(col.ty) {
                    return Err(EtlError::Schema(format!(
                        "row {} column '{}' holds {:?}, expected {:?}",
                        row_idx, col.name, value, col.ty
                    )));
                }
            }
        }
        Ok(RecordSet { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        RecordSet {
            schema: Arc::new(schema),
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Projects away the named columns, keeping the rest in order.
    /// Naming an absent column is a SchemaError.
    pub fn without_columns(&self, names: &[&str]) -> Result<RecordSet> {
        for name in names {
            self.schema.require(name)?;
        }
        let keep: Vec<usize> = (0..self.schema.len())
            .filter(|&i| !names.contains(&self.schema.columns()[i].name.as_str()))
            .collect();

        let columns = keep
            .iter()
            .map(|&i| self.schema.columns()[i].clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();
        RecordSet::new(Schema::new(columns)?, rows)
    }
}
