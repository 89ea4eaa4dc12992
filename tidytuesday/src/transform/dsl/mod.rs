//! Declarative pipelines
//!
//! This module provides:
//! - `steps`: the available `Table -> Table` steps
//! - `executor`: named pipelines of steps, loaded from JSON and run in order
//!
//! ## Example
//!
//! ```json
//! {
//!   "name": "margin-by-decade",
//!   "steps": [
//!     { "type": "year", "source": "start_date" },
//!     { "type": "decade" },
//!     { "type": "group_by", "keys": ["decade"],
//!       "aggregations": [{ "output": "winner_margin", "source": "time_margin", "reducer": "mean" }] },
//!     { "type": "filter", "column": "decade", "op": "ge", "value": 1910 },
//!     { "type": "scale", "source": "winner_margin", "factor": 60, "output": "winner_margin_min" }
//!   ]
//! }
//! ```

pub mod executor;
pub mod steps;

pub use executor::Pipeline;
pub use steps::{Comparison, Literal, Step};
