//! # TidyTuesday - typed tabular pipelines for small CSV datasets
//!
//! Reads the TidyTuesday CSV files (Tour de France winners and stages,
//! African-American firsts), cleans and reshapes them, and hands the derived
//! tables to a chart renderer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  Renderer   │
//! │  (ISO/UTF8) │     │ (typed rows)│     │ (pipelines) │     │ (JSON/CSV)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidytuesday::{run_analysis, Analysis, AnalysisConfig};
//!
//! let config = AnalysisConfig::default().with_data_dir("data/2020/2020-04-07");
//! let result = run_analysis(Analysis::MarginByDecade, &config)?;
//! println!("{} decades", result.table.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Pipeline log broadcaster
//! - [`parser`] - CSV parsing with auto-detection
//! - [`table`] - Typed values, schemas and tables
//! - [`transform`] - Derived columns, canonicalization, grouping, pipelines
//! - [`datasets`] - Declared schemas of the input files
//! - [`config`] - Analysis configuration
//! - [`render`] - Chart handoff and table writers

// Core modules
pub mod error;
pub mod logs;

// Parsing
pub mod parser;
pub mod table;

// Transformation
pub mod transform;

// Inputs and outputs
pub mod config;
pub mod datasets;
pub mod render;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ColumnError,
    ConfigError,
    CsvError,
    ParseIssue,
    PipelineError,
    PipelineResult,
    TableResult,
};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{
    drain, log_error, log_info, log_info_indent, log_success, log_warning, LogEntry, LogLevel,
    LOG_BROADCASTER,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    parse_csv_file,
    parse_csv_file_auto,
    parse_bytes_auto,
    detect_encoding,
    detect_delimiter,
    decode_content,
    normalize_column_name,
    ParseResult,
};

// =============================================================================
// Re-exports - Tables
// =============================================================================

pub use table::{Column, ColumnType, Ingested, RowRef, Schema, Table, Value};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    canonicalize_category,
    stage_type_rules,
    Aggregation,
    CategoryRule,
    CategoryRules,
    CumulativeSpec,
    Reducer,
};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{Comparison, Literal, Pipeline, Step};

// =============================================================================
// Re-exports - Analyses
// =============================================================================

pub use config::AnalysisConfig;
pub use datasets::Dataset;
pub use render::{write_csv, ChartKind, ChartSpec, Encoding, RenderHandoff};
pub use transform::pipeline::{
    format_delimiter,
    run_analysis,
    run_pipeline_on_file,
    Analysis,
    AnalysisResult,
    CsvInfo,
};
