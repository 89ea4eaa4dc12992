//! Pipeline executor
//!
//! Runs an ordered list of [`Step`]s over a table. The first failing step
//! aborts the run; the error carries the step's position and name.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::steps::Step;
use crate::error::{ConfigError, ConfigResult, PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_info_indent, log_success};
use crate::table::Table;

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Short identifier
    #[serde(default)]
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Steps, applied in order
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse a pipeline from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a pipeline from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check every step without running anything.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.steps.is_empty() {
            return Err(ConfigError::InvalidStep {
                step: self.name.clone(),
                message: "pipeline has no steps".to_string(),
            });
        }
        self.steps.iter().try_for_each(Step::validate)
    }

    /// Apply all steps to `table` in order.
    pub fn run(&self, table: &Table) -> PipelineResult<Table> {
        self.validate()?;
        log_info(format!(
            "Running '{}' ({} steps) on {} rows",
            self.name,
            self.steps.len(),
            table.len()
        ));

        let mut current = table.clone();
        for (index, step) in self.steps.iter().enumerate() {
            current = step.apply(&current).map_err(|err| {
                log_error(format!("Step {} ({}) failed: {}", index + 1, step.name(), err));
                PipelineError::Step {
                    index: index + 1,
                    step: step.name().to_string(),
                    source: Box::new(err),
                }
            })?;
            log_info_indent(format!("{} → {} rows", step, current.len()), 1);
        }

        log_success(format!(
            "'{}' produced {} rows × {} columns",
            self.name,
            current.len(),
            current.schema().len()
        ));
        Ok(current)
    }
}
