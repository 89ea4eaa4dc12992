//! TidyTuesday CLI - run the analysis pipelines over local CSV files
//!
//! # Main Commands
//!
//! ```bash
//! tidytuesday run stage-profile --data-dir data/2020/2020-04-07
//! tidytuesday run margin-by-decade --format csv -o margin.csv
//! tidytuesday --quiet --log run.jsonl run winners-by-decade
//! tidytuesday pipeline my_pipeline.json firsts.csv --dataset firsts
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! tidytuesday parse tdf_winners.csv --dataset tdf_winners
//! tidytuesday show stage-profile        # Built-in pipeline as JSON
//! tidytuesday analyses                  # List built-in analyses
//! tidytuesday default-config            # Default configuration as JSON
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tidytuesday::{
    drain, format_delimiter, log_info, log_info_indent, log_success, log_warning, parse_csv_file,
    parse_csv_file_auto, run_analysis, run_pipeline_on_file, write_csv, Analysis, AnalysisConfig,
    AnalysisResult, Dataset, LogEntry, Pipeline, RenderHandoff, Schema, Table, LOG_BROADCASTER,
};
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "tidytuesday")]
#[command(about = "Typed tabular pipelines for TidyTuesday CSV datasets", long_about = None)]
struct Cli {
    /// Do not echo pipeline logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write the run log to this file, one JSON entry per line
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Chart spec and table as one JSON document
    Json,
    /// Derived table only
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output the typed table as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Read with the column types of this dataset (default: all text)
        #[arg(long)]
        dataset: Option<String>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a built-in analysis
    Run {
        /// Analysis name (see `analyses`)
        analysis: String,

        /// Directory holding the dataset CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a JSON pipeline over a CSV file
    Pipeline {
        /// Pipeline JSON file
        pipeline: PathBuf,

        /// Input CSV file
        input: PathBuf,

        /// Read with the column types of this dataset (default: all text)
        #[arg(long)]
        dataset: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the pipeline of a built-in analysis as JSON
    Show {
        /// Analysis name
        analysis: String,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List built-in analyses
    Analyses,

    /// Print the default configuration as JSON
    DefaultConfig,
}

fn main() {
    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }
    let log_receiver = cli.log.as_ref().map(|_| LOG_BROADCASTER.subscribe());

    let result = match cli.command {
        Commands::Parse {
            input,
            dataset,
            delimiter,
            output,
        } => cmd_parse(&input, dataset.as_deref(), delimiter, output.as_deref()),

        Commands::Run {
            analysis,
            data_dir,
            config,
            format,
            output,
        } => cmd_run(&analysis, data_dir, config.as_deref(), format, output.as_deref()),

        Commands::Pipeline {
            pipeline,
            input,
            dataset,
            format,
            output,
        } => cmd_pipeline(&pipeline, &input, dataset.as_deref(), format, output.as_deref()),

        Commands::Show { analysis, config } => cmd_show(&analysis, config.as_deref()),

        Commands::Analyses => cmd_analyses(),

        Commands::DefaultConfig => cmd_default_config(),
    };

    if let (Some(path), Some(receiver)) = (cli.log.as_deref(), log_receiver) {
        if let Err(e) = write_log(receiver, path) {
            eprintln!("⚠️  Could not write log: {}", e);
        }
    }

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => AnalysisConfig::load(p)?,
        None => AnalysisConfig::default(),
    })
}

fn cmd_parse(
    input: &Path,
    dataset: Option<&str>,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("📄 Parsing CSV: {}", input.display()));

    let parsed = match delimiter {
        Some(d) => parse_csv_file(input, d)?,
        None => parse_csv_file_auto(input)?,
    };
    log_info_indent(format!("Encoding: {}", parsed.encoding), 1);
    log_info_indent(
        format!(
            "Delimiter: '{}'{}",
            format_delimiter(parsed.delimiter),
            if delimiter.is_none() { " (auto-detected)" } else { "" }
        ),
        1,
    );

    let declared = match dataset {
        Some(name) => name.parse::<Dataset>()?.schema()?,
        None => Schema::default(),
    };
    let ingested = Table::ingest(&parsed, &declared)?;
    for column in ingested.table.schema().columns() {
        log_info_indent(format!("{:<20} {}", column.name, column.ty), 1);
    }
    if !ingested.issues.is_empty() {
        log_warning(format!("{} fields read as null", ingested.issues.len()));
    }
    log_success(format!("Parsed {} records", ingested.table.len()));

    let json = serde_json::to_string_pretty(&ingested.table)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_run(
    analysis: &str,
    data_dir: Option<PathBuf>,
    config: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let analysis: Analysis = analysis.parse()?;
    let mut config = load_config(config)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    let result = run_analysis(analysis, &config)?;
    emit(&result, format, output)
}

fn cmd_pipeline(
    pipeline: &Path,
    input: &Path,
    dataset: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::load(pipeline)?;
    let dataset = dataset.map(str::parse::<Dataset>).transpose()?;

    let result = run_pipeline_on_file(&pipeline, input, dataset)?;
    emit(&result, format, output)
}

fn cmd_show(analysis: &str, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let analysis: Analysis = analysis.parse()?;
    let config = load_config(config)?;
    println!("{}", analysis.pipeline(&config).to_json()?);
    Ok(())
}

fn cmd_analyses() -> Result<(), Box<dyn std::error::Error>> {
    for analysis in Analysis::ALL {
        let pipeline = analysis.pipeline(&AnalysisConfig::default());
        println!(
            "{:<20} {:<12} {}",
            analysis.name(),
            analysis.dataset().file_name(),
            pipeline.description
        );
    }
    Ok(())
}

fn cmd_default_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AnalysisConfig::default().to_json()?);
    Ok(())
}

/// Write an analysis result in the requested format.
fn emit(
    result: &AnalysisResult,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            write_csv(&result.table, &mut buf)?;
            write_output(&String::from_utf8(buf)?, output)
        }
        OutputFormat::Json => {
            let json = match &result.chart {
                Some(chart) => {
                    let handoff = RenderHandoff::new(chart, &result.table);
                    let missing = handoff.missing_columns();
                    if !missing.is_empty() {
                        log_warning(format!("Chart refers to missing columns: {}", missing.join(", ")));
                    }
                    handoff.to_json()?
                }
                None => serde_json::to_string_pretty(&result.table)?,
            };
            write_output(&json, output)
        }
    }
}

/// Drain everything logged during the run into a JSON-lines file.
fn write_log(
    mut receiver: broadcast::Receiver<LogEntry>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = String::new();
    for entry in drain(&mut receiver) {
        lines.push_str(&serde_json::to_string(&entry)?);
        lines.push('\n');
    }
    fs::write(path, lines)?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log_success(format!("💾 Output written to: {}", p.display()));
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
