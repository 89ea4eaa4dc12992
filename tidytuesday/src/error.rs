//! Error types for the tidytuesday transform pipeline.
//!
//! The hierarchy follows the pipeline layers:
//!
//! - [`CsvError`] - reading and decoding delimited files
//! - [`ColumnError`] - schema violations (fatal, aborts the run)
//! - [`ParseIssue`] - a field that failed to parse (recovered as null)
//! - [`ConfigError`] - invalid rules, pipelines or config files
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

use crate::table::ColumnType;

// =============================================================================
// CSV Reading Errors
// =============================================================================

/// Errors while reading a delimited file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Two headers normalize to the same column name.
    #[error("Duplicate column after normalization: {0}")]
    DuplicateHeader(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Column Errors
// =============================================================================

/// A schema violation. Always fatal for the current pipeline run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColumnError {
    /// Referenced column is absent from the schema.
    #[error("Missing column: {0}")]
    Missing(String),

    /// A column with this name is already declared.
    #[error("Duplicate column: {0}")]
    Duplicate(String),

    /// A derived value does not fit the declared column type.
    #[error("Column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: String,
    },

    /// A row does not have one value per declared column.
    #[error("Row {row} has {found} values, schema declares {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The operation needs a numeric column.
    #[error("Column '{column}' is {found}, expected a numeric column")]
    NotNumeric { column: String, found: ColumnType },
}

// =============================================================================
// Parse Issues
// =============================================================================

/// A field that could not be parsed to its declared type.
///
/// Parse failures never abort ingestion: the field becomes null and the
/// issue is collected so callers can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("Row {row}, column '{column}' (value '{value}'): expected {expected}")]
pub struct ParseIssue {
    /// Zero-based data row index.
    pub row: usize,
    pub column: String,
    pub value: String,
    pub expected: ColumnType,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in rules, pipelines and configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A canonicalization pattern is not a valid regex.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A step is structurally invalid.
    #[error("Invalid step '{step}': {message}")]
    InvalidStep { step: String, message: String },

    /// Unknown analysis name.
    #[error("Unknown analysis: {0}")]
    UnknownAnalysis(String),

    /// Unknown dataset name.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// IO error.
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_analysis`]
/// and [`crate::transform::dsl::Pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Schema violation.
    #[error("Column error: {0}")]
    Column(#[from] ColumnError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A step failed; wraps the underlying error with the step position.
    #[error("Step {index} ({step}) failed: {source}")]
    Step {
        index: usize,
        step: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// Writing output failed.
    #[error("Output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Output(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Output(err.to_string())
    }
}

impl PipelineError {
    /// The root cause, skipping step wrappers.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the run was aborted by a schema violation.
    pub fn is_column_error(&self) -> bool {
        matches!(self.root(), PipelineError::Column(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, ColumnError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ColumnError -> PipelineError
        let column_err = ColumnError::Missing("time_overall".into());
        let pipeline_err: PipelineError = column_err.into();
        assert!(pipeline_err.to_string().contains("time_overall"));
        assert!(pipeline_err.is_column_error());
    }

    #[test]
    fn test_step_error_keeps_root() {
        let inner: PipelineError = ColumnError::Missing("decade".into()).into();
        let err = PipelineError::Step {
            index: 2,
            step: "group_by".into(),
            source: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.contains("Step 2"));
        assert!(msg.contains("decade"));
        assert!(err.is_column_error());
    }

    #[test]
    fn test_parse_issue_format() {
        let issue = ParseIssue {
            row: 4,
            column: "time_overall".into(),
            value: "n/a".into(),
            expected: ColumnType::Float,
        };
        let msg = issue.to_string();
        assert!(msg.contains("Row 4"));
        assert!(msg.contains("column 'time_overall'"));
        assert!(msg.contains("value 'n/a'"));
    }
}
