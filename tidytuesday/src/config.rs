//! Analysis configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "data_dir": "data/2020/2020-04-07", "stages_since_year": 1990 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::datasets::Dataset;
use crate::error::ConfigResult;
use crate::transform::canonical::{stage_type_rules, CategoryRule, CategoryRules};

/// Inputs and thresholds shared by the built-in analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding the dataset CSV files
    pub data_dir: PathBuf,

    /// First year shown by the stage profile
    pub stages_since_year: i64,

    /// First decade shown by the margin-of-victory chart
    pub margin_since_decade: i64,

    /// Ordered stage type rules, first match wins
    pub stage_rules: Vec<CategoryRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            stages_since_year: 2000,
            margin_since_decade: 1910,
            stage_rules: stage_type_rules(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Compile the stage rules, failing on the first bad pattern.
    pub fn validate(&self) -> ConfigResult<()> {
        CategoryRules::new(&self.stage_rules).map(|_| ())
    }

    /// Where `dataset` is read from.
    pub fn dataset_path(&self, dataset: Dataset) -> PathBuf {
        self.data_dir.join(dataset.file_name())
    }
}
