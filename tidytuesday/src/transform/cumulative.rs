//! Running totals with start offsets, per group.
//!
//! This is what turns a list of stages into stacked rectangles: each stage
//! starts where the previous one of the same year ended.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::derive::compare_on;
use crate::error::TableResult;
use crate::table::{Column, ColumnType, Table, Value};

/// Which columns drive the running total and where the results go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeSpec {
    /// Rows sharing this key accumulate together
    pub group_by: String,
    /// Order inside each group (stable, nulls first)
    pub order_by: String,
    /// Numeric column to accumulate
    pub value: String,
    /// Output: running total including the current row
    #[serde(default = "default_cumulative")]
    pub cumulative: String,
    /// Output: running total before the current row
    #[serde(default = "default_offset")]
    pub offset: String,
}

fn default_cumulative() -> String {
    "cum_dist".to_string()
}

fn default_offset() -> String {
    "start_dist".to_string()
}

impl CumulativeSpec {
    pub fn new(group_by: &str, order_by: &str, value: &str) -> Self {
        Self {
            group_by: group_by.to_string(),
            order_by: order_by.to_string(),
            value: value.to_string(),
            cumulative: default_cumulative(),
            offset: default_offset(),
        }
    }

    pub fn named(mut self, cumulative: &str, offset: &str) -> Self {
        self.cumulative = cumulative.to_string();
        self.offset = offset.to_string();
        self
    }
}

impl Table {
    /// Append running-total and start-offset columns.
    ///
    /// Groups are emitted contiguously in first-occurrence order, each
    /// sorted by `order_by`. Within a group `offset[0] == 0` and
    /// `offset[i] == cumulative[i - 1]`. A null value adds nothing, so the
    /// running total carries over it.
    pub fn cumulative_with_offset(&self, spec: &CumulativeSpec) -> TableResult<Table> {
        let schema = self.schema();
        let group_idx = schema.require(&spec.group_by)?;
        let order_idx = schema.require(&spec.order_by)?;
        let value_idx = schema.require_numeric(&spec.value)?;
        let out_ty = match schema.columns()[value_idx].ty {
            ColumnType::Integer => ColumnType::Integer,
            _ => ColumnType::Float,
        };

        let mut out_schema = schema.clone();
        out_schema.push(Column::new(spec.cumulative.clone(), out_ty))?;
        out_schema.push(Column::new(spec.offset.clone(), out_ty))?;

        // first-occurrence grouping, keeping input order inside each group
        let mut index: HashMap<&Value, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Vec<Value>>> = Vec::new();
        for row in self.raw_rows() {
            let g = *index.entry(&row[group_idx]).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(row);
        }

        let mut rows = Vec::with_capacity(self.len());
        for mut members in groups {
            members.sort_by(|a, b| compare_on(&[order_idx], a, b));

            let mut total = Total::zero(out_ty);
            for row in members {
                let start = total.value();
                total.add(&row[value_idx]);
                let mut out = row.clone();
                out.push(total.value());
                out.push(start);
                rows.push(out);
            }
        }

        Ok(Table::from_parts(out_schema, rows))
    }
}

/// Running total that stays integral for integer columns. An integer
/// total that overflows stays null for the rest of the group.
#[derive(Clone, Copy)]
enum Total {
    Int(Option<i64>),
    Float(f64),
}

impl Total {
    fn zero(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Integer => Total::Int(Some(0)),
            _ => Total::Float(0.0),
        }
    }

    fn add(&mut self, value: &Value) {
        match self {
            Total::Int(t) => *t = t.and_then(|t| t.checked_add(value.as_i64().unwrap_or(0))),
            Total::Float(t) => *t += value.as_f64().unwrap_or(0.0),
        }
    }

    fn value(self) -> Value {
        match self {
            Total::Int(t) => t.into(),
            Total::Float(t) => Value::float(t),
        }
    }
}
