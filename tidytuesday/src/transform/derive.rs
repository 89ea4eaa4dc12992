//! Row-wise transforms: derived columns, filtering, ordering, projection.

use std::cmp::Ordering;

use crate::error::{ColumnError, TableResult};
use crate::table::{Column, ColumnType, RowRef, Schema, Table, Value};

/// `year - year % 10`, with floor modulo so negative years bucket downward.
pub fn decade_of(year: i64) -> i64 {
    year - year.rem_euclid(10)
}

/// `numerator / denominator`, or null when either side is null or the
/// denominator is zero.
pub fn ratio(numerator: &Value, denominator: &Value) -> Value {
    match (numerator.as_f64(), denominator.as_f64()) {
        (Some(n), Some(d)) if d != 0.0 => Value::float(n / d),
        _ => Value::Null,
    }
}

/// Year of a date cell; integers pass through as already-extracted years.
pub fn year_of(value: &Value) -> Value {
    use chrono::Datelike;

    match value {
        Value::Date(d) => Value::Int(i64::from(d.year())),
        Value::Int(n) => Value::Int(*n),
        _ => Value::Null,
    }
}

/// Leading decimal digits of a label: `"11A"` gives 11, `"P"` gives null.
pub fn leading_number(value: &Value) -> Value {
    match value {
        Value::Int(n) => Value::Int(*n),
        Value::Str(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<i64>().map(Value::Int).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

impl Table {
    /// Add (or replace) column `name` computed from `sources`.
    ///
    /// `f` receives the source values of each row in the order given.
    /// Missing sources fail before any row is evaluated, so an empty table
    /// still reports them. A column that already exists is replaced in place.
    pub fn derive_column<F>(
        &self,
        name: &str,
        ty: ColumnType,
        sources: &[&str],
        f: F,
    ) -> TableResult<Table>
    where
        F: Fn(&[&Value]) -> Value,
    {
        let source_idx = sources
            .iter()
            .map(|s| self.schema().require(s))
            .collect::<TableResult<Vec<_>>>()?;

        let mut derived = Vec::with_capacity(self.len());
        let mut args: Vec<&Value> = Vec::with_capacity(source_idx.len());
        for row in self.raw_rows() {
            args.clear();
            args.extend(source_idx.iter().map(|&i| &row[i]));
            let value = f(&args);
            let kind = value.kind();
            let value = value.conform(ty).ok_or_else(|| ColumnError::TypeMismatch {
                column: name.to_string(),
                expected: ty,
                found: kind.to_string(),
            })?;
            derived.push(value);
        }

        let mut schema = self.schema().clone();
        let target = match schema.index_of(name) {
            Some(idx) => {
                schema.column_at_mut(idx).ty = ty;
                Some(idx)
            }
            None => {
                schema.push(Column::new(name, ty))?;
                None
            }
        };

        let rows = self
            .raw_rows()
            .iter()
            .zip(derived)
            .map(|(row, value)| {
                let mut row = row.clone();
                match target {
                    Some(idx) => row[idx] = value,
                    None => row.push(value),
                }
                row
            })
            .collect();

        Ok(Table::from_parts(schema, rows))
    }

    /// Keep rows satisfying `predicate`, preserving order.
    pub fn filter_rows<F>(&self, predicate: F) -> Table
    where
        F: Fn(&RowRef<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| row.values().to_vec())
            .collect();
        self.with_rows(rows)
    }

    /// Keep rows whose `column` value satisfies `predicate`.
    pub fn filter_by<F>(&self, column: &str, predicate: F) -> TableResult<Table>
    where
        F: Fn(&Value) -> bool,
    {
        let idx = self.schema().require(column)?;
        Ok(self.filter_rows(|row| predicate(row.at(idx))))
    }

    /// Stable sort on `keys`, lexicographically. Nulls sort first
    /// (last when `descending`).
    pub fn sort_by(&self, keys: &[&str], descending: bool) -> TableResult<Table> {
        let key_idx = keys
            .iter()
            .map(|k| self.schema().require(k))
            .collect::<TableResult<Vec<_>>>()?;

        let mut rows = self.raw_rows().to_vec();
        rows.sort_by(|a, b| {
            let ord = compare_on(&key_idx, a, b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(self.with_rows(rows))
    }

    /// Project onto `columns`, in the order given.
    pub fn select(&self, columns: &[&str]) -> TableResult<Table> {
        let idx = columns
            .iter()
            .map(|c| self.schema().require(c))
            .collect::<TableResult<Vec<_>>>()?;

        let schema = Schema::new(
            idx.iter()
                .map(|&i| self.schema().columns()[i].clone())
                .collect(),
        )?;
        let rows = self
            .raw_rows()
            .iter()
            .map(|row| idx.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table::from_parts(schema, rows))
    }

    /// Rename one column. Renaming onto an existing name fails.
    pub fn rename(&self, from: &str, to: &str) -> TableResult<Table> {
        let idx = self.schema().require(from)?;
        if from == to {
            return Ok(self.clone());
        }
        if self.schema().index_of(to).is_some() {
            return Err(ColumnError::Duplicate(to.to_string()));
        }
        let (mut schema, rows) = self.clone().into_parts();
        schema.column_at_mut(idx).name = to.to_string();
        Ok(Table::from_parts(schema, rows))
    }
}

pub(crate) fn compare_on(key_idx: &[usize], a: &[Value], b: &[Value]) -> Ordering {
    key_idx
        .iter()
        .map(|&i| a[i].cmp(&b[i]))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
