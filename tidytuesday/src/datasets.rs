//! Input datasets and their declared column types.
//!
//! Only the columns the analyses rely on are declared. Every other column
//! of the file is still read, as text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, PipelineResult, TableResult};
use crate::parser::{parse_csv_file_auto, ParseResult};
use crate::table::{ColumnType, Ingested, Schema, Table};

/// One of the known TidyTuesday input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Tour de France overall winners, one row per edition
    TdfWinners,
    /// Tour de France stages with type and distance
    TdfStages,
    /// Per-rider stage results
    StageData,
    /// African-American historical firsts
    Firsts,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::TdfWinners,
        Dataset::TdfStages,
        Dataset::StageData,
        Dataset::Firsts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::TdfWinners => "tdf_winners",
            Dataset::TdfStages => "tdf_stages",
            Dataset::StageData => "stage_data",
            Dataset::Firsts => "firsts",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    /// Declared columns, named as they read after header normalization.
    pub fn schema(self) -> TableResult<Schema> {
        use ColumnType::*;

        let columns: &[(&str, ColumnType)] = match self {
            Dataset::TdfWinners => &[
                ("edition", Integer),
                ("start_date", Date),
                ("winner_name", Text),
                ("distance", Float),
                ("time_overall", Float),
                ("time_margin", Float),
                ("height", Float),
                ("weight", Float),
                ("age", Integer),
                ("birth_country", Text),
            ],
            Dataset::TdfStages => &[
                ("stage", Text),
                ("date", Date),
                ("distance", Float),
                ("origin", Text),
                ("destination", Text),
                ("type", Text),
            ],
            Dataset::StageData => &[
                ("edition", Integer),
                ("year", Integer),
                ("stage_results_id", Text),
                ("rider", Text),
            ],
            Dataset::Firsts => &[("year", Integer), ("category", Text)],
        };
        Schema::of(columns)
    }

    /// Parse raw records against this dataset's schema.
    pub fn ingest(self, parsed: &ParseResult) -> TableResult<Ingested> {
        Table::ingest(parsed, &self.schema()?)
    }

    /// Read and ingest a file of this dataset.
    pub fn load<P: AsRef<Path>>(self, path: P) -> PipelineResult<(ParseResult, Ingested)> {
        let parsed = parse_csv_file_auto(path)?;
        let ingested = self.ingest(&parsed)?;
        Ok((parsed, ingested))
    }
}

/// Read a file with no declared types: every column is text.
pub fn load_untyped<P: AsRef<Path>>(path: P) -> PipelineResult<(ParseResult, Ingested)> {
    let parsed = parse_csv_file_auto(path)?;
    let ingested = Table::ingest(&parsed, &Schema::default())?;
    Ok((parsed, ingested))
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches(".csv").replace('-', "_");
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownDataset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_schemas_are_valid() {
        for dataset in Dataset::ALL {
            assert!(!dataset.schema().unwrap().is_empty(), "{}", dataset);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("tdf-winners".parse::<Dataset>().unwrap(), Dataset::TdfWinners);
        assert_eq!("firsts.csv".parse::<Dataset>().unwrap(), Dataset::Firsts);
        assert!("tdf_riders".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_load_stages_with_raw_headers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Stage,Date,Distance,Origin,Destination,Type,Winner,Winner_Country").unwrap();
        writeln!(file, "1,2017-07-01,14,Düsseldorf,Düsseldorf,Individual time trial,Geraint Thomas,GBR").unwrap();
        writeln!(file, "P,2016-07-02,188,Mont-Saint-Michel,Utah Beach,Flat stage,Mark Cavendish,GBR").unwrap();
        file.flush().unwrap();

        let (parsed, ingested) = Dataset::TdfStages.load(file.path()).unwrap();
        assert_eq!(parsed.delimiter, ',');
        assert!(ingested.issues.is_empty());

        let table = ingested.table;
        assert_eq!(table.schema().type_of("distance"), Ok(ColumnType::Float));
        assert_eq!(table.schema().type_of("winner_country"), Ok(ColumnType::Text));
        assert_eq!(table.column("stage").unwrap()[1], &Value::text("P"));
    }

    #[test]
    fn test_load_untyped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "year;category").unwrap();
        writeln!(file, "1760;Arts & Entertainment").unwrap();
        file.flush().unwrap();

        let (parsed, ingested) = load_untyped(file.path()).unwrap();
        assert_eq!(parsed.delimiter, ';');
        assert_eq!(ingested.table.column("year").unwrap(), vec![&Value::text("1760")]);
    }
}
