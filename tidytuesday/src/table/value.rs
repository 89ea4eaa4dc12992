//! Tagged cell values and their declared column types.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Tokens read as a missing value, whatever the declared column type.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "#N/A", "NaN", "nan", "-NaN", "null", "NULL", "None", "<NA>",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Date,
}

impl ColumnType {
    /// Integer or float.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single cell.
///
/// `Float` never holds NaN or an infinity: every constructor that could
/// produce one yields `Null` instead.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
}

impl Value {
    /// Build a float cell, mapping non-finite results to `Null`.
    pub fn float(x: f64) -> Self {
        if x.is_finite() {
            Value::Float(x)
        } else {
            Value::Null
        }
    }

    /// Build a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "text",
            Value::Date(_) => "date",
        }
    }

    /// Whether this value may be stored in a column of type `ty`.
    pub fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Int(_), ColumnType::Integer | ColumnType::Float)
                | (Value::Float(_), ColumnType::Float)
                | (Value::Str(_), ColumnType::Text)
                | (Value::Date(_), ColumnType::Date)
        )
    }

    /// Convert into the storage form of `ty`: integers stored in a float
    /// column become floats. Returns `None` when the value does not fit.
    pub fn conform(self, ty: ColumnType) -> Option<Value> {
        match (self, ty) {
            (Value::Int(n), ColumnType::Float) => Some(Value::Float(n as f64)),
            (v, ty) if v.fits(ty) => Some(v),
            _ => None,
        }
    }

    /// Parse a raw field as `ty`.
    ///
    /// Missing-value tokens yield `Some(Value::Null)`; anything else that
    /// does not parse yields `None` and the caller records the issue.
    pub fn parse(raw: &str, ty: ColumnType) -> Option<Value> {
        let raw = raw.trim();
        if NULL_TOKENS.contains(&raw) {
            return Some(Value::Null);
        }
        match ty {
            ColumnType::Text => Some(Value::Str(raw.to_string())),
            ColumnType::Integer => parse_integer(raw).map(Value::Int),
            ColumnType::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Float),
            ColumnType::Date => parse_date(raw).map(Value::Date),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Str(_) => 2,
            Value::Date(_) => 3,
        }
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    // "1903.0" style exports of integer columns
    let x = raw.parse::<f64>().ok()?;
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 {
        Some(x as i64)
    } else {
        None
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

// -0.0 and 0.0 are the same key
fn canonical(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x
    }
}

fn float_bits(x: f64) -> u64 {
    canonical(x).to_bits()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(n) => n.hash(state),
            Value::Float(x) => float_bits(*x).hash(state),
            Value::Str(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
        }
    }
}

impl Ord for Value {
    /// Null first, then numbers by magnitude (an integer sorts before an
    /// equal float), then text, then dates.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).total_cmp(&canonical(*b)).then(Ordering::Less)
            }
            (Value::Float(a), Value::Int(b)) => {
                canonical(*a).total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_missing_tokens() {
        assert_eq!(Value::parse("", ColumnType::Float), Some(Value::Null));
        assert_eq!(Value::parse("NA", ColumnType::Integer), Some(Value::Null));
        assert_eq!(Value::parse(" NaN ", ColumnType::Text), Some(Value::Null));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(Value::parse("1903", ColumnType::Integer), Some(Value::Int(1903)));
        assert_eq!(Value::parse("1903.0", ColumnType::Integer), Some(Value::Int(1903)));
        assert_eq!(Value::parse("83.5", ColumnType::Float), Some(Value::Float(83.5)));
        assert!(Value::parse("83.5", ColumnType::Integer).is_none());
        assert!(Value::parse("fast", ColumnType::Float).is_none());
        assert!(Value::parse("inf", ColumnType::Float).is_none());
    }

    #[test]
    fn test_parse_dates() {
        let expected = NaiveDate::from_ymd_opt(1903, 7, 1).unwrap();
        assert_eq!(Value::parse("1903-07-01", ColumnType::Date), Some(Value::Date(expected)));
        assert_eq!(Value::parse("01/07/1903", ColumnType::Date), Some(Value::Date(expected)));
        assert_eq!(
            Value::parse("1903-07-01 00:00:00", ColumnType::Date),
            Some(Value::Date(expected))
        );
        assert!(Value::parse("July 1903", ColumnType::Date).is_none());
    }

    #[test]
    fn test_float_constructor_rejects_nan() {
        assert_eq!(Value::float(f64::NAN), Value::Null);
        assert_eq!(Value::float(1.0 / 0.0), Value::Null);
        assert_eq!(Value::float(2.5), Value::Float(2.5));
    }

    #[test]
    fn test_conform_widens_integers() {
        assert_eq!(Value::Int(3).conform(ColumnType::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::Null.conform(ColumnType::Date), Some(Value::Null));
        assert_eq!(Value::text("x").conform(ColumnType::Integer), None);
    }

    #[test]
    fn test_ordering_nulls_first() {
        let mut values = vec![
            Value::Int(11),
            Value::Null,
            Value::Float(2.5),
            Value::Int(2),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![Value::Null, Value::Int(2), Value::Float(2.5), Value::Int(11)]
        );
    }

    #[test]
    fn test_serialize() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2000, 7, 2).unwrap());
        let json = serde_json::to_value(vec![Value::Null, Value::Int(1), date]).unwrap();
        assert_eq!(json, serde_json::json!([null, 1, "2000-07-02"]));
    }
}
