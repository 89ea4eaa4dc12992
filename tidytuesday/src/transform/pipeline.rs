//! Built-in analyses.
//!
//! Each analysis reads one dataset, runs a declarative [`Pipeline`] over it
//! and pairs the result with the chart it feeds.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidytuesday::{run_analysis, Analysis, AnalysisConfig};
//!
//! let config = AnalysisConfig::default().with_data_dir("data/2020/2020-04-07");
//! let result = run_analysis(Analysis::StageProfile, &config)?;
//! println!("{} stages since 2000", result.table.len());
//! ```

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::canonical::CategoryRule;
use super::cumulative::CumulativeSpec;
use super::dsl::{Comparison, Literal, Pipeline, Step};
use super::grouper::Aggregation;
use crate::config::AnalysisConfig;
use crate::datasets::{load_untyped, Dataset};
use crate::error::{ConfigError, ParseIssue, PipelineResult};
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::parser::ParseResult;
use crate::render::{ChartKind, ChartSpec, Encoding};
use crate::table::{Ingested, Table};

/// Issues listed individually before the rest are summarized.
const MAX_LISTED_ISSUES: usize = 5;

/// The analyses this crate knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Analysis {
    /// Average winner attributes per decade
    WinnersByDecade,
    /// Average margin of victory per decade, in minutes
    MarginByDecade,
    /// Number of winners per birth country
    CountryWinners,
    /// Stage types and distances per year, stacked end to end
    StageProfile,
    /// Number of firsts per decade and category
    FirstsByDecade,
}

impl Analysis {
    pub const ALL: [Analysis; 5] = [
        Analysis::WinnersByDecade,
        Analysis::MarginByDecade,
        Analysis::CountryWinners,
        Analysis::StageProfile,
        Analysis::FirstsByDecade,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Analysis::WinnersByDecade => "winners-by-decade",
            Analysis::MarginByDecade => "margin-by-decade",
            Analysis::CountryWinners => "country-winners",
            Analysis::StageProfile => "stage-profile",
            Analysis::FirstsByDecade => "firsts-by-decade",
        }
    }

    /// The input file this analysis reads.
    pub fn dataset(self) -> Dataset {
        match self {
            Analysis::WinnersByDecade | Analysis::MarginByDecade | Analysis::CountryWinners => {
                Dataset::TdfWinners
            }
            Analysis::StageProfile => Dataset::TdfStages,
            Analysis::FirstsByDecade => Dataset::Firsts,
        }
    }

    /// The steps of this analysis, with thresholds and rules from `config`.
    pub fn pipeline(self, config: &AnalysisConfig) -> Pipeline {
        match self {
            Analysis::WinnersByDecade => winners_by_decade(),
            Analysis::MarginByDecade => margin_by_decade(config.margin_since_decade),
            Analysis::CountryWinners => country_winners(),
            Analysis::StageProfile => {
                stage_profile(config.stages_since_year, config.stage_rules.clone())
            }
            Analysis::FirstsByDecade => firsts_by_decade(),
        }
    }

    /// The chart the result feeds.
    pub fn chart(self) -> ChartSpec {
        match self {
            Analysis::WinnersByDecade => ChartSpec::new(
                ChartKind::Line,
                "How do Tour de France winners change over time?",
                Encoding::xy("decade", "winner_speed"),
            )
            .with_labels("Decade", "Average winner speed (km/h)"),
            Analysis::MarginByDecade => ChartSpec::new(
                ChartKind::Line,
                "Tour de France margin of victory has been getting smaller",
                Encoding::xy("decade", "winner_margin_min"),
            )
            .with_labels("Decade", "Average victory margin (min)"),
            Analysis::CountryWinners => ChartSpec::new(
                ChartKind::HorizontalBar,
                "What countries were the most Tour de France winners born in?",
                Encoding::xy("winners", "birth_country"),
            ),
            Analysis::StageProfile => ChartSpec::new(
                ChartKind::Rect,
                "How has the Tour de France Changed?",
                Encoding {
                    fill: Some("stage_type".to_string()),
                    x_start: Some("start_dist".to_string()),
                    x_end: Some("cum_dist".to_string()),
                    y_center: Some("year".to_string()),
                    ..Encoding::default()
                },
            )
            .with_subtitle("Section types and distance by year"),
            Analysis::FirstsByDecade => ChartSpec::new(
                ChartKind::StackedBar,
                "African-American firsts",
                Encoding::xy("decade", "firsts").with_fill("category"),
            )
            .with_subtitle("Number of first achievements by African-Americans by category and decade")
            .with_caption("Source: https://en.wikipedia.org/wiki/List_of_African-American_firsts"),
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Analysis {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        Analysis::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownAnalysis(s.to_string()))
    }
}

// =============================================================================
// Pipelines
// =============================================================================

fn winners_by_decade() -> Pipeline {
    Pipeline::new(Analysis::WinnersByDecade.name())
        .with_description("Average winner age, height, weight, margin and speed per decade")
        .then(Step::Year {
            source: "start_date".into(),
            output: "year".into(),
        })
        .then(Step::Ratio {
            numerator: "distance".into(),
            denominator: "time_overall".into(),
            output: "speed".into(),
        })
        .then(Step::Decade {
            source: "year".into(),
            output: "decade".into(),
        })
        .then(Step::GroupBy {
            keys: vec!["decade".into()],
            aggregations: vec![
                Aggregation::mean("winner_age", "age"),
                Aggregation::mean("winner_height", "height"),
                Aggregation::mean("winner_weight", "weight"),
                Aggregation::mean("winner_margin", "time_margin"),
                Aggregation::mean("winner_speed", "speed"),
            ],
        })
}

fn margin_by_decade(since_decade: i64) -> Pipeline {
    let mut pipeline = winners_by_decade()
        .then(Step::Filter {
            column: "decade".into(),
            op: Comparison::Ge,
            value: Literal::Int(since_decade),
        })
        .then(Step::Scale {
            source: "winner_margin".into(),
            factor: 60.0,
            output: "winner_margin_min".into(),
        })
        .with_description("Average margin of victory per decade, in minutes");
    pipeline.name = Analysis::MarginByDecade.name().to_string();
    pipeline
}

fn country_winners() -> Pipeline {
    Pipeline::new(Analysis::CountryWinners.name())
        .with_description("Tour de France winners per birth country, most first")
        .then(Step::DropNulls {
            columns: vec!["birth_country".into()],
        })
        .then(Step::GroupBy {
            keys: vec!["birth_country".into()],
            aggregations: vec![Aggregation::count("winners", "birth_country")],
        })
        .then(Step::Sort {
            by: vec!["winners".into()],
            descending: true,
        })
}

fn stage_profile(since_year: i64, rules: Vec<CategoryRule>) -> Pipeline {
    Pipeline::new(Analysis::StageProfile.name())
        .with_description("Stage types and cumulative distance per year")
        .then(Step::Canonicalize {
            source: "type".into(),
            output: "stage_type".into(),
            rules,
        })
        .then(Step::Year {
            source: "date".into(),
            output: "year".into(),
        })
        .then(Step::LeadingNumber {
            source: "stage".into(),
            output: "stage_number".into(),
        })
        .then(Step::Filter {
            column: "year".into(),
            op: Comparison::Ge,
            value: Literal::Int(since_year),
        })
        .then(Step::SetWhere {
            target: "distance".into(),
            column: "stage_type".into(),
            equals: Literal::Text("Transition".into()),
            value: Literal::Int(0),
        })
        .then(Step::Sort {
            by: vec!["year".into(), "stage_number".into(), "stage".into()],
            descending: false,
        })
        .then(Step::Cumulative(CumulativeSpec::new(
            "year",
            "stage_number",
            "distance",
        )))
        .then(Step::Select {
            columns: [
                "year",
                "stage",
                "stage_number",
                "stage_type",
                "origin",
                "destination",
                "distance",
                "cum_dist",
                "start_dist",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        })
}

fn firsts_by_decade() -> Pipeline {
    Pipeline::new(Analysis::FirstsByDecade.name())
        .with_description("Firsts per decade and category")
        .then(Step::DropNulls {
            columns: vec!["year".into()],
        })
        .then(Step::Decade {
            source: "year".into(),
            output: "decade".into(),
        })
        .then(Step::GroupBy {
            keys: vec!["decade".into(), "category".into()],
            aggregations: vec![Aggregation::count("firsts", "year")],
        })
        .then(Step::Sort {
            by: vec!["decade".into(), "category".into()],
            descending: false,
        })
}

// =============================================================================
// Running
// =============================================================================

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.records.len(),
        }
    }
}

/// Result of an analysis or pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Derived table
    pub table: Table,

    /// Chart the table feeds, if known
    pub chart: Option<ChartSpec>,

    /// Fields that were read as null because they did not parse
    pub parse_issues: Vec<ParseIssue>,

    /// CSV parsing metadata
    pub csv_info: CsvInfo,
}

/// Run a built-in analysis against the dataset in `config.data_dir`.
pub fn run_analysis(analysis: Analysis, config: &AnalysisConfig) -> PipelineResult<AnalysisResult> {
    let dataset = analysis.dataset();
    let path = config.dataset_path(dataset);
    log_info(format!("📖 {}: reading {}", analysis, path.display()));

    let (parsed, ingested) = dataset.load(&path)?;
    let mut result = run_ingested(&analysis.pipeline(config), &parsed, ingested)?;
    result.chart = Some(analysis.chart());
    Ok(result)
}

/// Run a user pipeline over any CSV file.
///
/// With a `dataset`, the file is read with that dataset's column types;
/// otherwise every column is text.
pub fn run_pipeline_on_file(
    pipeline: &Pipeline,
    path: &Path,
    dataset: Option<Dataset>,
) -> PipelineResult<AnalysisResult> {
    log_info(format!("📖 {}: reading {}", pipeline.name, path.display()));
    let (parsed, ingested) = match dataset {
        Some(dataset) => dataset.load(path)?,
        None => load_untyped(path)?,
    };
    run_ingested(pipeline, &parsed, ingested)
}

fn run_ingested(
    pipeline: &Pipeline,
    parsed: &ParseResult,
    ingested: Ingested,
) -> PipelineResult<AnalysisResult> {
    let csv_info = CsvInfo::from(parsed);
    log_success(format!(
        "Read {} rows ({}, separator '{}')",
        csv_info.row_count,
        csv_info.encoding,
        format_delimiter(csv_info.delimiter)
    ));
    report_issues(&ingested.issues);

    let table = pipeline.run(&ingested.table)?;
    Ok(AnalysisResult {
        table,
        chart: None,
        parse_issues: ingested.issues,
        csv_info,
    })
}

fn report_issues(issues: &[ParseIssue]) {
    if issues.is_empty() {
        return;
    }
    log_warning(format!("{} fields did not parse and were read as null", issues.len()));
    for issue in issues.iter().take(MAX_LISTED_ISSUES) {
        log_warning_indent(issue.to_string(), 1);
    }
    if issues.len() > MAX_LISTED_ISSUES {
        log_warning_indent(format!("... +{}", issues.len() - MAX_LISTED_ISSUES), 1);
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LOG_BROADCASTER;
    use crate::table::Value;
    use std::fs;
    use tempfile::TempDir;

    const WINNERS: &str = "\
edition,start_date,winner_name,winner_team,distance,time_overall,time_margin,height,weight,age,birth_country
1,1903-07-01,Maurice Garin,La Française,2428,94.55,2.98,1.62,60,32,Italy
2,1904-07-02,Henri Cornet,Conte,2428,96.09,2.27,NA,NA,19,France
3,1905-07-09,Louis Trousselier,Peugeot,2994,NA,NA,NA,NA,24,France
8,1910-07-03,Octave Lapize,Alcyon,4737,162.68,0.08,NA,NA,22,France
9,1911-07-02,Gustave Garrigou,Alcyon,5343,195.61,0.62,1.7,NA,27,France
";

    const STAGES: &str = "\
Stage,Date,Distance,Origin,Destination,Type,Winner,Winner_Country
2,2017-07-02,203.5,Düsseldorf,Liège,Flat stage,Marcel Kittel,GER
1,2017-07-01,14,Düsseldorf,Düsseldorf,Individual time trial,Geraint Thomas,GBR
3,1999-07-05,194,Nantes,Laval,Plain stage,Tom Steels,BEL
11A,2017-07-12,1.5,Eymet,Pau,Half Stage,Marcel Kittel,GER
";

    const FIRSTS: &str = "\
year,accomplishment,person,gender,category
1738,First free African-American community,Gracia Real de Santa Teresa de Mose,African-American Firsts,Social & Jobs
1760,First known African-American published author,Jupiter Hammon,Male African American Firsts,Arts & Entertainment
1768,First known African-American to receive a patent,Thomas Jennings,Male African American Firsts,Arts & Entertainment
1773,First African-American woman to publish a book,Phillis Wheatley,Female African American Firsts,Arts & Entertainment
";

    fn data_dir(files: &[(&str, &str)]) -> TempDir {
        LOG_BROADCASTER.set_echo(false);
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn config(dir: &TempDir) -> AnalysisConfig {
        AnalysisConfig::default().with_data_dir(dir.path())
    }

    fn floats(table: &Table, column: &str) -> Vec<Option<f64>> {
        table
            .column(column)
            .unwrap()
            .into_iter()
            .map(Value::as_f64)
            .collect()
    }

    #[test]
    fn test_analysis_names() {
        for analysis in Analysis::ALL {
            assert_eq!(analysis.name().parse::<Analysis>().unwrap(), analysis);
        }
        assert_eq!("stage_profile".parse::<Analysis>().unwrap(), Analysis::StageProfile);
        assert!("winners".parse::<Analysis>().is_err());
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter(','), ",");
        assert_eq!(format_delimiter('\t'), "\\t");
    }

    #[test]
    fn test_builtin_pipelines_are_valid() {
        let config = AnalysisConfig::default();
        for analysis in Analysis::ALL {
            let pipeline = analysis.pipeline(&config);
            assert!(pipeline.validate().is_ok(), "{}", analysis);
            assert_eq!(pipeline.name, analysis.name());
        }
    }

    #[test]
    fn test_winners_by_decade() {
        let dir = data_dir(&[("tdf_winners.csv", WINNERS)]);
        let result = run_analysis(Analysis::WinnersByDecade, &config(&dir)).unwrap();
        let table = &result.table;

        assert_eq!(table.column("decade").unwrap(), vec![&Value::Int(1900), &Value::Int(1910)]);
        assert_eq!(floats(table, "winner_age"), vec![Some(25.0), Some(24.5)]);
        // 1910s weights are all missing
        assert_eq!(floats(table, "winner_weight"), vec![Some(60.0), None]);
        // the missing 1905 overall time is skipped, not averaged as zero
        let speeds = floats(table, "winner_speed");
        let expected_1900 = (2428.0 / 94.55 + 2428.0 / 96.09) / 2.0;
        assert!((speeds[0].unwrap() - expected_1900).abs() < 1e-9);

        assert!(result.parse_issues.is_empty());
        assert_eq!(result.csv_info.row_count, 5);
        assert_eq!(result.chart.unwrap().kind, ChartKind::Line);
    }

    #[test]
    fn test_margin_by_decade_filters_and_scales() {
        let dir = data_dir(&[("tdf_winners.csv", WINNERS)]);
        let result = run_analysis(Analysis::MarginByDecade, &config(&dir)).unwrap();

        assert_eq!(result.table.column("decade").unwrap(), vec![&Value::Int(1910)]);
        let minutes = floats(&result.table, "winner_margin_min")[0].unwrap();
        assert!((minutes - (0.08 + 0.62) / 2.0 * 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_country_winners_sorted_desc() {
        let dir = data_dir(&[("tdf_winners.csv", WINNERS)]);
        let result = run_analysis(Analysis::CountryWinners, &config(&dir)).unwrap();

        assert_eq!(
            result.table.column("birth_country").unwrap(),
            vec![&Value::text("France"), &Value::text("Italy")]
        );
        assert_eq!(
            result.table.column("winners").unwrap(),
            vec![&Value::Int(4), &Value::Int(1)]
        );
    }

    #[test]
    fn test_country_winners_skip_unknown_country() {
        let csv = format!("{}12,1914-06-28,Philippe Thys,Peugeot,5380,200.4,1.8,NA,NA,24,NA\n", WINNERS);
        let dir = data_dir(&[("tdf_winners.csv", csv.as_str())]);
        let result = run_analysis(Analysis::CountryWinners, &config(&dir)).unwrap();

        assert_eq!(result.table.len(), 2);
        assert!(!result.table.column("birth_country").unwrap().contains(&&Value::Null));
    }

    #[test]
    fn test_stage_profile() {
        let dir = data_dir(&[("tdf_stages.csv", STAGES)]);
        let result = run_analysis(Analysis::StageProfile, &config(&dir)).unwrap();
        let table = &result.table;

        // 1999 is filtered out, stages are ordered by number
        assert_eq!(
            table.column("stage").unwrap(),
            vec![&Value::text("1"), &Value::text("2"), &Value::text("11A")]
        );
        assert_eq!(
            table.column("stage_type").unwrap(),
            vec![
                &Value::text("Time Trial"),
                &Value::text("Flat"),
                &Value::text("Transition")
            ]
        );
        // transition stages count as zero distance
        assert_eq!(floats(table, "distance"), vec![Some(14.0), Some(203.5), Some(0.0)]);
        assert_eq!(floats(table, "cum_dist"), vec![Some(14.0), Some(217.5), Some(217.5)]);
        assert_eq!(floats(table, "start_dist"), vec![Some(0.0), Some(14.0), Some(217.5)]);
        assert_eq!(table.schema().len(), 9);
    }

    #[test]
    fn test_stage_profile_custom_threshold() {
        let dir = data_dir(&[("tdf_stages.csv", STAGES)]);
        let mut config = config(&dir);
        config.stages_since_year = 1990;
        let result = run_analysis(Analysis::StageProfile, &config).unwrap();

        // 1999 first: groups follow sorted year order
        assert_eq!(result.table.column("year").unwrap()[0], &Value::Int(1999));
        assert_eq!(result.table.len(), 4);
    }

    #[test]
    fn test_firsts_by_decade() {
        let dir = data_dir(&[("firsts.csv", FIRSTS)]);
        let result = run_analysis(Analysis::FirstsByDecade, &config(&dir)).unwrap();
        let table = &result.table;

        assert_eq!(
            table.column("decade").unwrap(),
            vec![&Value::Int(1730), &Value::Int(1760), &Value::Int(1770)]
        );
        assert_eq!(
            table.column("firsts").unwrap(),
            vec![&Value::Int(1), &Value::Int(2), &Value::Int(1)]
        );
        assert_eq!(result.chart.unwrap().encoding.fill.as_deref(), Some("category"));
    }

    #[test]
    fn test_parse_issues_reported() {
        let csv = "year,category\n1760,Arts & Entertainment\nabout 1770,Military\n";
        let dir = data_dir(&[("firsts.csv", csv)]);
        let result = run_analysis(Analysis::FirstsByDecade, &config(&dir)).unwrap();

        assert_eq!(result.parse_issues.len(), 1);
        assert_eq!(result.parse_issues[0].value, "about 1770");
        // the unparsed year is dropped instead of forming a null decade
        assert_eq!(result.table.column("decade").unwrap(), vec![&Value::Int(1760)]);
        assert_eq!(result.table.column("firsts").unwrap(), vec![&Value::Int(1)]);
    }

    #[test]
    fn test_missing_column_aborts() {
        let csv = "edition,start_date,distance\n1,1903-07-01,2428\n";
        let dir = data_dir(&[("tdf_winners.csv", csv)]);
        let err = run_analysis(Analysis::WinnersByDecade, &config(&dir)).unwrap_err();
        assert!(err.is_column_error());
    }

    #[test]
    fn test_missing_file() {
        let dir = data_dir(&[]);
        let err = run_analysis(Analysis::FirstsByDecade, &config(&dir)).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Csv(_)));
    }

    #[test]
    fn test_run_pipeline_on_untyped_file() {
        let dir = data_dir(&[("firsts.csv", FIRSTS)]);
        let pipeline = Pipeline::new("categories").then(Step::GroupBy {
            keys: vec!["category".into()],
            aggregations: vec![Aggregation::count("n", "person")],
        });
        let result =
            run_pipeline_on_file(&pipeline, &dir.path().join("firsts.csv"), None).unwrap();

        assert!(result.chart.is_none());
        assert_eq!(
            result.table.column("n").unwrap(),
            vec![&Value::Int(1), &Value::Int(3)]
        );
    }
}
