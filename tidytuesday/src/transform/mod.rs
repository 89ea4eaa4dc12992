//! Transformation module.
//!
//! Every transform takes a [`Table`](crate::table::Table) and returns a new one:
//! - Derive: derived columns, filtering, sorting, projection
//! - Canonical: ordered regex rules mapping free text to labels
//! - Grouper: group-by with named reductions
//! - Cumulative: running totals with start offsets
//! - DSL: the steps above as JSON pipelines
//! - Pipeline: built-in analyses

pub mod canonical;
pub mod cumulative;
pub mod derive;
pub mod dsl;
pub mod grouper;
pub mod pipeline;

pub use canonical::{canonicalize_category, stage_type_rules, CategoryRule, CategoryRules};
pub use cumulative::CumulativeSpec;
pub use derive::{decade_of, leading_number, ratio, year_of};
pub use dsl::{Comparison, Literal, Pipeline, Step};
pub use grouper::{Aggregation, Reducer};
pub use pipeline::{
    format_delimiter, run_analysis, run_pipeline_on_file, Analysis, AnalysisResult, CsvInfo,
};
