//! Typed in-memory tables.
//!
//! A [`Table`] is an ordered list of rows sharing a [`Schema`]. Tables are
//! never mutated once built: every transform in [`crate::transform`] takes
//! a table by reference and returns a new one.
//!
//! Raw CSV records become a typed table through [`Table::ingest`], which
//! parses each field according to its declared [`ColumnType`]. Fields that
//! fail to parse become [`Value::Null`] and are reported as
//! [`ParseIssue`]s instead of aborting the read.

pub mod schema;
pub mod value;

pub use schema::{Column, Schema};
pub use value::{ColumnType, Value};

use serde::Serialize;

use crate::error::{ColumnError, ParseIssue, TableResult};
use crate::parser::ParseResult;

/// An immutable typed table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    #[serde(rename = "columns")]
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

/// Result of typed ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: Table,
    /// Fields that were replaced by null.
    pub issues: Vec<ParseIssue>,
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Value of `name`, or `None` if the column does not exist.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let values = self.values;
        self.schema.index_of(name).map(|idx| &values[idx])
    }

    /// Value of `name`, or [`ColumnError::Missing`].
    pub fn value(&self, name: &str) -> TableResult<&'a Value> {
        let values = self.values;
        self.schema.require(name).map(|idx| &values[idx])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn at(&self, idx: usize) -> &'a Value {
        let values = self.values;
        &values[idx]
    }
}

impl Table {
    /// Build a table, checking row width and value types.
    ///
    /// Integers given for a float column are widened.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> TableResult<Self> {
        let mut checked = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != schema.len() {
                return Err(ColumnError::RowWidth {
                    row: row_idx,
                    expected: schema.len(),
                    found: row.len(),
                });
            }
            let mut out = Vec::with_capacity(row.len());
            for (value, column) in row.into_iter().zip(schema.columns()) {
                let kind = value.kind();
                let value = value.conform(column.ty).ok_or_else(|| ColumnError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.ty,
                    found: kind.to_string(),
                })?;
                out.push(value);
            }
            checked.push(out);
        }
        Ok(Self {
            schema,
            rows: checked,
        })
    }

    /// A table with no rows.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Rows already known to match `schema`.
    pub(crate) fn from_parts(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    /// Same schema, different rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self::from_parts(self.schema.clone(), rows)
    }

    pub(crate) fn into_parts(self) -> (Schema, Vec<Vec<Value>>) {
        (self.schema, self.rows)
    }

    /// Parse raw CSV records against a declared schema.
    ///
    /// Every declared column must be present in the headers, otherwise the
    /// read fails with [`ColumnError::Missing`]. Undeclared columns are kept
    /// as text. Column order follows the file.
    pub fn ingest(parsed: &ParseResult, declared: &Schema) -> TableResult<Ingested> {
        if let Some(missing) = declared
            .names()
            .find(|name| !parsed.headers.iter().any(|h| h == name))
        {
            return Err(ColumnError::Missing(missing.to_string()));
        }

        let schema = Schema::new(
            parsed
                .headers
                .iter()
                .map(|h| {
                    let ty = declared.column(h).map(|c| c.ty).unwrap_or(ColumnType::Text);
                    Column::new(h.clone(), ty)
                })
                .collect(),
        )?;

        let mut rows = Vec::with_capacity(parsed.records.len());
        let mut issues = Vec::new();

        for (row_idx, record) in parsed.records.iter().enumerate() {
            let mut row = Vec::with_capacity(schema.len());
            for (i, column) in schema.columns().iter().enumerate() {
                let raw = record.get(i).map(String::as_str).unwrap_or("");
                match Value::parse(raw, column.ty) {
                    Some(value) => row.push(value),
                    None => {
                        issues.push(ParseIssue {
                            row: row_idx,
                            column: column.name.clone(),
                            value: raw.to_string(),
                            expected: column.ty,
                        });
                        row.push(Value::Null);
                    }
                }
            }
            rows.push(row);
        }

        Ok(Ingested {
            table: Self { schema, rows },
            issues,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        self.rows.get(idx).map(|values| RowRef {
            schema: &self.schema,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |values| RowRef {
            schema: &self.schema,
            values,
        })
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> TableResult<Vec<&Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(headers: &[&str], records: &[&[&str]]) -> ParseResult {
        ParseResult {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: records
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
            encoding: "utf-8".into(),
            delimiter: ',',
        }
    }

    #[test]
    fn test_ingest_typed_with_nulls() {
        let raw = parsed(
            &["start_date", "distance", "time_overall", "winner_name"],
            &[
                &["1903-07-01", "2428", "94.55", "Maurice Garin"],
                &["1905-07-09", "2994", "", "Louis Trousselier"],
                &["not a date", "3021", "96.1", "René Pottier"],
            ],
        );
        let declared = Schema::of(&[
            ("start_date", ColumnType::Date),
            ("distance", ColumnType::Float),
            ("time_overall", ColumnType::Float),
        ])
        .unwrap();

        let ingested = Table::ingest(&raw, &declared).unwrap();
        let table = ingested.table;

        assert_eq!(table.len(), 3);
        assert_eq!(table.schema().type_of("winner_name"), Ok(ColumnType::Text));
        // genuinely absent overall time stays null, without an issue
        assert_eq!(table.column("time_overall").unwrap()[1], &Value::Null);
        assert_eq!(ingested.issues.len(), 1);
        assert_eq!(ingested.issues[0].row, 2);
        assert_eq!(ingested.issues[0].column, "start_date");
        assert_eq!(table.column("start_date").unwrap()[2], &Value::Null);
    }

    #[test]
    fn test_ingest_missing_declared_column() {
        let raw = parsed(&["year", "category"], &[&["1760", "Arts & Entertainment"]]);
        let declared = Schema::of(&[("decade", ColumnType::Integer)]).unwrap();
        let err = Table::ingest(&raw, &declared).unwrap_err();
        assert_eq!(err, ColumnError::Missing("decade".into()));
    }

    #[test]
    fn test_short_record_padded_with_null() {
        let raw = parsed(&["a", "b"], &[&["1"]]);
        let declared = Schema::of(&[("a", ColumnType::Integer), ("b", ColumnType::Integer)])
            .unwrap();
        let ingested = Table::ingest(&raw, &declared).unwrap();
        let row = ingested.table.row(0).unwrap();
        assert_eq!(row.value("a"), Ok(&Value::Int(1)));
        assert_eq!(row.value("b"), Ok(&Value::Null));
        assert!(ingested.issues.is_empty());
    }

    #[test]
    fn test_new_checks_width_and_types() {
        let schema = Schema::of(&[("x", ColumnType::Float)]).unwrap();
        let table = Table::new(schema.clone(), vec![vec![Value::Int(2)]]).unwrap();
        assert_eq!(table.column("x").unwrap(), vec![&Value::Float(2.0)]);

        let err = Table::new(schema.clone(), vec![vec![]]).unwrap_err();
        assert!(matches!(err, ColumnError::RowWidth { row: 0, .. }));

        let err = Table::new(schema, vec![vec![Value::text("fast")]]).unwrap_err();
        assert!(matches!(err, ColumnError::TypeMismatch { .. }));
    }
}
