//! Pipeline steps
//!
//! Each step is one `Table -> Table` transform, declared in JSON:
//!
//! ```json
//! { "type": "decade", "source": "year", "output": "decade" }
//! { "type": "filter", "column": "decade", "op": "ge", "value": 1910 }
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{ColumnError, ConfigError, PipelineResult};
use crate::table::{ColumnType, Table, Value};
use crate::transform::canonical::{CategoryRule, CategoryRules};
use crate::transform::cumulative::CumulativeSpec;
use crate::transform::derive::{decade_of, leading_number, ratio, year_of};
use crate::transform::grouper::Aggregation;

/// All available pipeline steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Rename one column
    Rename { from: String, to: String },

    /// Keep only these columns, in this order
    Select { columns: Vec<String> },

    /// Calendar year of a date column
    Year {
        source: String,
        #[serde(default = "default_year")]
        output: String,
    },

    /// Decade bucket of a year column. Float years are floored first.
    Decade {
        #[serde(default = "default_year")]
        source: String,
        #[serde(default = "default_decade")]
        output: String,
    },

    /// Leading digits of a label ("11A" -> 11)
    LeadingNumber { source: String, output: String },

    /// `numerator / denominator`, null when either is null or the denominator is zero
    Ratio {
        numerator: String,
        denominator: String,
        output: String,
    },

    /// Multiply a numeric column by a constant
    Scale {
        source: String,
        factor: f64,
        output: String,
    },

    /// Map free text to a label with ordered first-match rules
    Canonicalize {
        source: String,
        output: String,
        rules: Vec<CategoryRule>,
    },

    /// Overwrite `target` with `value` on rows where `column == equals`
    SetWhere {
        target: String,
        column: String,
        equals: Literal,
        value: Literal,
    },

    /// Keep rows where `column op value` holds. Null cells never match.
    Filter {
        column: String,
        op: Comparison,
        value: Literal,
    },

    /// Drop rows with a null in any of these columns
    DropNulls { columns: Vec<String> },

    /// Stable sort, nulls first
    Sort {
        by: Vec<String>,
        #[serde(default)]
        descending: bool,
    },

    /// One row per distinct key: key columns then aggregations
    GroupBy {
        keys: Vec<String>,
        aggregations: Vec<Aggregation>,
    },

    /// Running total and start offset per group
    Cumulative(CumulativeSpec),
}

fn default_year() -> String {
    "year".to_string()
}

fn default_decade() -> String {
    "decade".to_string()
}

/// Comparison operator for [`Step::Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Comparison::Eq => ord.is_eq(),
            Comparison::Ne => ord.is_ne(),
            Comparison::Gt => ord.is_gt(),
            Comparison::Ge => ord.is_ge(),
            Comparison::Lt => ord.is_lt(),
            Comparison::Le => ord.is_le(),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// A constant written in a step: JSON number or string.
///
/// Strings are parsed to the column's type when compared against a
/// non-text column, so `"2000-01-01"` works against a date column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    /// The literal as a value of column type `ty`, if it converts.
    pub fn to_value(&self, ty: ColumnType) -> Option<Value> {
        let value = match self {
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(x) => Value::float(*x),
            Literal::Text(s) if ty == ColumnType::Text => Value::text(s.as_str()),
            Literal::Text(s) => Value::parse(s, ty)?,
        };
        match value {
            Value::Null => None,
            // a whole float literal still matches an integer column
            Value::Float(x) if ty == ColumnType::Integer && x.fract() == 0.0 => {
                Some(Value::Int(x as i64))
            }
            other => other.conform(ty),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Order two cells, comparing numbers by magnitude regardless of storage.
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

fn invalid(step: &Step, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidStep {
        step: step.name().to_string(),
        message: message.into(),
    }
}

impl Step {
    /// The step's tag, as written in JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Rename { .. } => "rename",
            Step::Select { .. } => "select",
            Step::Year { .. } => "year",
            Step::Decade { .. } => "decade",
            Step::LeadingNumber { .. } => "leading_number",
            Step::Ratio { .. } => "ratio",
            Step::Scale { .. } => "scale",
            Step::Canonicalize { .. } => "canonicalize",
            Step::SetWhere { .. } => "set_where",
            Step::Filter { .. } => "filter",
            Step::DropNulls { .. } => "drop_nulls",
            Step::Sort { .. } => "sort",
            Step::GroupBy { .. } => "group_by",
            Step::Cumulative(_) => "cumulative",
        }
    }

    /// Check what can be checked without a table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Step::Select { columns } if columns.is_empty() => {
                Err(invalid(self, "no columns selected"))
            }
            Step::DropNulls { columns } if columns.is_empty() => {
                Err(invalid(self, "no columns to check"))
            }
            Step::Sort { by, .. } if by.is_empty() => Err(invalid(self, "no sort keys")),
            Step::GroupBy { keys, .. } if keys.is_empty() => Err(invalid(self, "no group keys")),
            Step::Scale { factor, .. } if !factor.is_finite() => {
                Err(invalid(self, "factor must be finite"))
            }
            Step::Canonicalize { rules, .. } => CategoryRules::new(rules).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Apply this step to a table
    pub fn apply(&self, table: &Table) -> PipelineResult<Table> {
        let out = match self {
            Step::Rename { from, to } => table.rename(from, to)?,
            Step::Select { columns } => table.select(&as_strs(columns))?,
            Step::Year { source, output } => {
                let ty = table.schema().type_of(source)?;
                if !matches!(ty, ColumnType::Date | ColumnType::Integer) {
                    return Err(ColumnError::TypeMismatch {
                        column: source.clone(),
                        expected: ColumnType::Date,
                        found: ty.to_string(),
                    }
                    .into());
                }
                table.derive_column(output, ColumnType::Integer, &[source.as_str()], |v| year_of(v[0]))?
            }
            Step::Decade { source, output } => {
                table.schema().require_numeric(source)?;
                table.derive_column(output, ColumnType::Integer, &[source.as_str()], |v| {
                    whole_year(v[0]).map(decade_of).into()
                })?
            }
            Step::LeadingNumber { source, output } => table
                .derive_column(output, ColumnType::Integer, &[source.as_str()], |v| leading_number(v[0]))?,
            Step::Ratio {
                numerator,
                denominator,
                output,
            } => {
                table.schema().require_numeric(numerator)?;
                table.schema().require_numeric(denominator)?;
                table.derive_column(output, ColumnType::Float, &[numerator.as_str(), denominator.as_str()], |v| {
                    ratio(v[0], v[1])
                })?
            }
            Step::Scale {
                source,
                factor,
                output,
            } => {
                table.schema().require_numeric(source)?;
                table.derive_column(output, ColumnType::Float, &[source.as_str()], |v| {
                    v[0].as_f64().map(|x| Value::float(x * factor)).unwrap_or(Value::Null)
                })?
            }
            Step::Canonicalize {
                source,
                output,
                rules,
            } => table.canonicalize_column(source, output, &CategoryRules::new(rules)?)?,
            Step::SetWhere {
                target,
                column,
                equals,
                value,
            } => {
                let column_ty = table.schema().type_of(column)?;
                let target_ty = table.schema().type_of(target)?;
                let equals = equals
                    .to_value(column_ty)
                    .ok_or_else(|| invalid(self, format!("{} does not fit column '{}'", equals, column)))?;
                let value = value
                    .to_value(target_ty)
                    .ok_or_else(|| invalid(self, format!("{} does not fit column '{}'", value, target)))?;
                table.derive_column(target, target_ty, &[column.as_str(), target.as_str()], |v| {
                    if !v[0].is_null() && compare_cells(v[0], &equals).is_eq() {
                        value.clone()
                    } else {
                        v[1].clone()
                    }
                })?
            }
            Step::Filter { column, op, value } => {
                let ty = table.schema().type_of(column)?;
                let literal = value
                    .to_value(ty)
                    .ok_or_else(|| invalid(self, format!("{} does not fit column '{}'", value, column)))?;
                table.filter_by(column, |cell| {
                    !cell.is_null() && op.holds(compare_cells(cell, &literal))
                })?
            }
            Step::DropNulls { columns } => {
                let idx = columns
                    .iter()
                    .map(|c| table.schema().require(c))
                    .collect::<Result<Vec<_>, _>>()?;
                table.filter_rows(|row| idx.iter().all(|&i| !row.at(i).is_null()))
            }
            Step::Sort { by, descending } => table.sort_by(&as_strs(by), *descending)?,
            Step::GroupBy { keys, aggregations } => {
                table.group_by_columns(&as_strs(keys), aggregations)?
            }
            Step::Cumulative(spec) => table.cumulative_with_offset(spec)?,
        };
        Ok(out)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Rename { from, to } => write!(f, "rename {} -> {}", from, to),
            Step::Select { columns } => write!(f, "select {}", columns.join(", ")),
            Step::Year { source, output } => write!(f, "{} = year({})", output, source),
            Step::Decade { source, output } => write!(f, "{} = decade({})", output, source),
            Step::LeadingNumber { source, output } => {
                write!(f, "{} = leading_number({})", output, source)
            }
            Step::Ratio {
                numerator,
                denominator,
                output,
            } => write!(f, "{} = {} / {}", output, numerator, denominator),
            Step::Scale {
                source,
                factor,
                output,
            } => write!(f, "{} = {} * {}", output, source, factor),
            Step::Canonicalize {
                source,
                output,
                rules,
            } => write!(f, "{} = canonicalize({}, {} rules)", output, source, rules.len()),
            Step::SetWhere {
                target,
                column,
                equals,
                value,
            } => write!(f, "{} = {} where {} == {}", target, value, column, equals),
            Step::Filter { column, op, value } => {
                write!(f, "filter {} {} {}", column, op.symbol(), value)
            }
            Step::DropNulls { columns } => write!(f, "drop nulls in {}", columns.join(", ")),
            Step::Sort { by, descending } => {
                write!(f, "sort by {}{}", by.join(", "), if *descending { " desc" } else { "" })
            }
            Step::GroupBy { keys, aggregations } => write!(
                f,
                "group by {} ({} aggregations)",
                keys.join(", "),
                aggregations.len()
            ),
            Step::Cumulative(spec) => write!(
                f,
                "{} / {} = cumulative {} per {}",
                spec.cumulative, spec.offset, spec.value, spec.group_by
            ),
        }
    }
}

/// Integer year of a numeric cell, flooring floats. Null when out of range.
fn whole_year(value: &Value) -> Option<i64> {
    match value {
        Value::Int(y) => Some(*y),
        Value::Float(y) => {
            let y = y.floor();
            (y >= i64::MIN as f64 && y < i64::MAX as f64).then_some(y as i64)
        }
        _ => None,
    }
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}
