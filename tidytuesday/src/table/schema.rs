//! Ordered, uniquely named, typed columns.

use serde::{Deserialize, Serialize};

use super::value::ColumnType;
use crate::error::{ColumnError, TableResult};

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The set of columns shared by every row of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new(columns: Vec<Column>) -> TableResult<Self> {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column)?;
        }
        Ok(schema)
    }

    /// Shorthand for declaring a schema from `(name, type)` pairs.
    pub fn of(columns: &[(&str, ColumnType)]) -> TableResult<Self> {
        Self::new(
            columns
                .iter()
                .map(|(name, ty)| Column::new(*name, *ty))
                .collect(),
        )
    }

    /// Append a column.
    pub fn push(&mut self, column: Column) -> TableResult<()> {
        if self.index_of(&column.name).is_some() {
            return Err(ColumnError::Duplicate(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of `name`, or [`ColumnError::Missing`].
    pub fn require(&self, name: &str) -> TableResult<usize> {
        self.index_of(name)
            .ok_or_else(|| ColumnError::Missing(name.to_string()))
    }

    /// Index of `name`, which must hold integers or floats.
    pub fn require_numeric(&self, name: &str) -> TableResult<usize> {
        let idx = self.require(name)?;
        let ty = self.columns[idx].ty;
        if !ty.is_numeric() {
            return Err(ColumnError::NotNumeric {
                column: name.to_string(),
                found: ty,
            });
        }
        Ok(idx)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn type_of(&self, name: &str) -> TableResult<ColumnType> {
        self.require(name).map(|idx| self.columns[idx].ty)
    }

    pub(crate) fn column_at_mut(&mut self, idx: usize) -> &mut Column {
        &mut self.columns[idx]
    }
}
