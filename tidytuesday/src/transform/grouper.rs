//! Group rows by a key and reduce each group to one summary row.
//!
//! # Ordering
//!
//! ```text
//! Input rows (decade)         →  Summary rows
//! ┌──────────────────────┐      ┌──────────────────────────┐
//! │ 1910, age 28         │      │ 1910, winner_age 29.0    │
//! │ 1900, age 32         │  →   ├──────────────────────────┤
//! │ 1910, age 30         │      │ 1900, winner_age 32.0    │
//! └──────────────────────┘      └──────────────────────────┘
//! ```
//!
//! Groups come out in the order their key first appears in the input.
//! Sort the input (or the output) when a different order is wanted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{ColumnError, TableResult};
use crate::table::{Column, ColumnType, RowRef, Schema, Table, Value};

/// How a group's values collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Arithmetic mean of non-null values; null if there are none
    Mean,
    /// Value of the first row in the group, null or not
    First,
    /// Sum of non-null values; zero if there are none
    Sum,
    /// Number of non-null values
    Count,
}

impl Reducer {
    /// Type of the summary column for a source column of type `source`.
    pub fn output_type(self, source: ColumnType) -> ColumnType {
        match self {
            Reducer::Mean => ColumnType::Float,
            Reducer::First => source,
            Reducer::Sum if source == ColumnType::Integer => ColumnType::Integer,
            Reducer::Sum => ColumnType::Float,
            Reducer::Count => ColumnType::Integer,
        }
    }

    fn needs_numeric(self) -> bool {
        matches!(self, Reducer::Mean | Reducer::Sum)
    }

    /// Reduce one group's values of a source column of type `source`.
    pub fn reduce<'a, I>(self, values: I, source: ColumnType) -> Value
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut values = values.into_iter();
        match self {
            Reducer::First => values.next().cloned().unwrap_or(Value::Null),
            Reducer::Count => Value::Int(values.filter(|v| !v.is_null()).count() as i64),
            Reducer::Mean => {
                let (sum, n) = values
                    .filter_map(Value::as_f64)
                    .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
                if n == 0 {
                    Value::Null
                } else {
                    Value::float(sum / n as f64)
                }
            }
            // null on overflow
            Reducer::Sum if source == ColumnType::Integer => values
                .filter_map(Value::as_i64)
                .try_fold(0i64, i64::checked_add)
                .into(),
            Reducer::Sum => Value::float(values.filter_map(Value::as_f64).sum()),
        }
    }
}

/// One named reduction: `output = reducer(source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub output: String,
    pub source: String,
    pub reducer: Reducer,
}

impl Aggregation {
    pub fn new(output: impl Into<String>, source: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            output: output.into(),
            source: source.into(),
            reducer,
        }
    }

    pub fn mean(output: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(output, source, Reducer::Mean)
    }

    pub fn first(output: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(output, source, Reducer::First)
    }

    pub fn sum(output: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(output, source, Reducer::Sum)
    }

    pub fn count(output: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(output, source, Reducer::Count)
    }
}

/// Resolved aggregation: source index and types.
struct Plan {
    source: usize,
    source_ty: ColumnType,
    reducer: Reducer,
}

fn plan(schema: &Schema, aggregations: &[Aggregation]) -> TableResult<(Vec<Plan>, Vec<Column>)> {
    let mut plans = Vec::with_capacity(aggregations.len());
    let mut columns = Vec::with_capacity(aggregations.len());
    for agg in aggregations {
        let idx = if agg.reducer.needs_numeric() {
            schema.require_numeric(&agg.source)?
        } else {
            schema.require(&agg.source)?
        };
        let source_ty = schema.columns()[idx].ty;
        columns.push(Column::new(agg.output.clone(), agg.reducer.output_type(source_ty)));
        plans.push(Plan {
            source: idx,
            source_ty,
            reducer: agg.reducer,
        });
    }
    Ok((plans, columns))
}

/// Row indices per distinct key, in first-occurrence order.
fn partition<K, F>(table: &Table, key_fn: F) -> Vec<(K, Vec<usize>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&RowRef<'_>) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();

    for (row_idx, row) in table.rows().enumerate() {
        let key = key_fn(&row);
        match index.get(&key) {
            Some(&g) => groups[g].1.push(row_idx),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row_idx]));
            }
        }
    }

    groups
}

fn summarize(table: &Table, members: &[usize], plans: &[Plan]) -> Vec<Value> {
    let rows = table.raw_rows();
    plans
        .iter()
        .map(|p| {
            p.reducer
                .reduce(members.iter().map(|&r| &rows[r][p.source]), p.source_ty)
        })
        .collect()
}

impl Table {
    /// Partition rows by `key_fn` and reduce each partition with
    /// `aggregations`, one output column per aggregation.
    ///
    /// The key itself is not emitted; promote it with a
    /// [`Reducer::First`] aggregation over the key column.
    pub fn group_and_aggregate<K, F>(&self, key_fn: F, aggregations: &[Aggregation]) -> TableResult<Table>
    where
        K: Eq + Hash + Clone,
        F: Fn(&RowRef<'_>) -> K,
    {
        let (plans, columns) = plan(self.schema(), aggregations)?;
        let schema = Schema::new(columns)?;

        let rows = partition(self, key_fn)
            .into_iter()
            .map(|(_, members)| summarize(self, &members, &plans))
            .collect();

        Ok(Table::from_parts(schema, rows))
    }

    /// Group on the values of `keys` and emit the key columns followed by
    /// one column per aggregation.
    pub fn group_by_columns(&self, keys: &[&str], aggregations: &[Aggregation]) -> TableResult<Table> {
        if keys.is_empty() {
            return Err(ColumnError::Missing("<group key>".to_string()));
        }
        let key_idx = keys
            .iter()
            .map(|k| self.schema().require(k))
            .collect::<TableResult<Vec<_>>>()?;

        let (plans, agg_columns) = plan(self.schema(), aggregations)?;
        let mut columns: Vec<Column> = key_idx
            .iter()
            .map(|&i| self.schema().columns()[i].clone())
            .collect();
        columns.extend(agg_columns);
        let schema = Schema::new(columns)?;

        let rows = partition(self, |row| {
            key_idx.iter().map(|&i| row.at(i).clone()).collect::<Vec<_>>()
        })
        .into_iter()
        .map(|(key, members)| {
            let mut out = key;
            out.extend(summarize(self, &members, &plans));
            out
        })
        .collect();

        Ok(Table::from_parts(schema, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winners() -> Table {
        let schema = Schema::of(&[
            ("decade", ColumnType::Integer),
            ("age", ColumnType::Integer),
            ("time_margin", ColumnType::Float),
            ("birth_country", ColumnType::Text),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![Value::Int(1910), Value::Int(28), Value::Null, Value::text("France")],
                vec![Value::Int(1900), Value::Int(32), Value::Float(3.0), Value::text("Italy")],
                vec![Value::Int(1910), Value::Int(30), Value::Null, Value::text("France")],
                vec![Value::Int(1900), Value::Null, Value::Float(1.0), Value::text("France")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mean_skips_nulls() {
        let schema = Schema::of(&[("distance", ColumnType::Float)]).unwrap();
        let table = Table::new(
            schema,
            vec![vec![Value::Float(10.0)], vec![Value::Null], vec![Value::Float(30.0)]],
        )
        .unwrap();

        let out = table
            .group_and_aggregate(|_| (), &[Aggregation::mean("mean_distance", "distance")])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.column("mean_distance").unwrap(), vec![&Value::Float(20.0)]);
    }

    #[test]
    fn test_integer_sum_overflow_is_null() {
        let schema = Schema::of(&[("g", ColumnType::Text), ("n", ColumnType::Integer)]).unwrap();
        let table = Table::new(
            schema,
            vec![
                vec![Value::text("a"), Value::Int(i64::MAX)],
                vec![Value::text("a"), Value::Int(1)],
                vec![Value::text("b"), Value::Int(i64::MAX)],
                vec![Value::text("b"), Value::Int(-1)],
            ],
        )
        .unwrap();

        let out = table
            .group_by_columns(&["g"], &[Aggregation::sum("s", "n")])
            .unwrap();
        assert_eq!(out.column("s").unwrap(), vec![&Value::Null, &Value::Int(i64::MAX - 1)]);
    }

    #[test]
    fn test_mean_all_null_is_null() {
        let out = winners()
            .group_and_aggregate(
                |row| row.get("decade").cloned(),
                &[
                    Aggregation::first("decade", "decade"),
                    Aggregation::mean("winner_margin", "time_margin"),
                    Aggregation::sum("total_margin", "time_margin"),
                ],
            )
            .unwrap();

        // 1910 comes first: it appears first in the input
        assert_eq!(out.column("decade").unwrap(), vec![&Value::Int(1910), &Value::Int(1900)]);
        assert_eq!(out.column("winner_margin").unwrap()[0], &Value::Null);
        assert_eq!(out.column("winner_margin").unwrap()[1], &Value::Float(2.0));
        assert_eq!(out.column("total_margin").unwrap()[0], &Value::Float(0.0));
    }

    #[test]
    fn test_reducer_types() {
        let out = winners()
            .group_and_aggregate(
                |row| row.get("decade").cloned(),
                &[
                    Aggregation::mean("winner_age", "age"),
                    Aggregation::sum("age_sum", "age"),
                    Aggregation::count("n", "age"),
                ],
            )
            .unwrap();

        let types: Vec<_> = out.schema().columns().iter().map(|c| c.ty).collect();
        assert_eq!(types, vec![ColumnType::Float, ColumnType::Integer, ColumnType::Integer]);
        assert_eq!(out.column("winner_age").unwrap()[0], &Value::Float(29.0));
        assert_eq!(out.column("age_sum").unwrap()[1], &Value::Int(32));
        assert_eq!(out.column("n").unwrap()[1], &Value::Int(1));
    }

    #[test]
    fn test_first_keeps_null() {
        let out = winners()
            .group_and_aggregate(
                |row| row.get("decade").cloned(),
                &[Aggregation::first("first_margin", "time_margin")],
            )
            .unwrap();
        assert_eq!(out.column("first_margin").unwrap()[0], &Value::Null);
    }

    #[test]
    fn test_missing_and_non_numeric_sources() {
        let err = winners()
            .group_and_aggregate(|_| (), &[Aggregation::mean("h", "height")])
            .unwrap_err();
        assert_eq!(err, ColumnError::Missing("height".into()));

        let err = winners()
            .group_and_aggregate(|_| (), &[Aggregation::mean("c", "birth_country")])
            .unwrap_err();
        assert!(matches!(err, ColumnError::NotNumeric { .. }));
    }

    #[test]
    fn test_group_by_columns_counts() {
        let out = winners()
            .group_by_columns(&["birth_country"], &[Aggregation::count("wins", "birth_country")])
            .unwrap();

        assert_eq!(out.schema().names().collect::<Vec<_>>(), vec!["birth_country", "wins"]);
        assert_eq!(out.column("birth_country").unwrap()[0], &Value::text("France"));
        assert_eq!(out.column("wins").unwrap(), vec![&Value::Int(3), &Value::Int(1)]);
    }

    #[test]
    fn test_group_by_two_keys() {
        let out = winners()
            .group_by_columns(
                &["decade", "birth_country"],
                &[Aggregation::count("n", "birth_country")],
            )
            .unwrap();
        assert_eq!(out.len(), 3);
        let first = out.row(0).unwrap();
        assert_eq!(first.value("decade"), Ok(&Value::Int(1910)));
        assert_eq!(first.value("n"), Ok(&Value::Int(2)));
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let table = Table::empty(winners().schema().clone());
        let out = table
            .group_by_columns(&["decade"], &[Aggregation::mean("winner_age", "age")])
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.schema().len(), 2);
    }
}
