//! indicator-sql CLI - compile and run indicator specifications
//!
//! Usage:
//!   indicator-sql compile <indicator.json> [--dialect <dialect>]
//!   indicator-sql run <indicator.json> [--database <db>] [--period <p>] [--year <y>]
//!   indicator-sql report <report.json> [--database <db>] [--format json|csv]
//!
//! Examples:
//!   indicator-sql compile taux_emploi.json --dialect sqlite
//!   indicator-sql run taux_emploi.json --database survey.db --period 6_mois --year 2022
//!   indicator-sql report bilan.json --format csv > bilan.csv

use clap::{Parser, Subcommand, ValueEnum};
use indicator_sql::config::{Settings, SettingsError};
use indicator_sql::error::{ExecutionError, ExportError, SpecificationError};
use indicator_sql::execution::{
    report_to_csv, report_to_json, run_indicator, ExecutionService, ReportDefinition,
    ReportRunner, RunOptions, SqliteSessionFactory,
};
use indicator_sql::schema::ResolveRequest;
use indicator_sql::sql::Dialect;
use indicator_sql::{compile_json, IndicatorError};
use serde_json::Value;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Overrides the configured log filter.
const LOG_ENV_VAR: &str = "INDICATOR_SQL_LOG";

#[derive(Parser)]
#[command(name = "indicator-sql")]
#[command(about = "Compile JSON indicator specifications to SQL and run them")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to INDICATOR_SQL_CONFIG, then ./indicators.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an indicator to SQL
    Compile {
        /// Path to the indicator JSON
        file: PathBuf,

        /// SQL dialect to generate (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,
    },

    /// Compile, resolve and execute an indicator
    Run {
        /// Path to the indicator JSON
        file: PathBuf,

        /// SQLite database (defaults to [database] path)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Period key, e.g. 6_mois
        #[arg(long)]
        period: Option<String>,

        /// Survey year
        #[arg(long)]
        year: Option<String>,
    },

    /// Generate a report and export it
    Report {
        /// Path to the report definition JSON
        file: PathBuf,

        /// SQLite database (defaults to [database] path)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Export format
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// Pretty-printed JSON envelope
    Json,
    /// Semicolon-separated CSV with BOM
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is configured from the settings, so nothing is installed yet
            eprintln!("error[settings]: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings);

    let result = match cli.command {
        Commands::Compile { file, dialect } => cmd_compile(&settings, &file, dialect),
        Commands::Run {
            file,
            database,
            period,
            year,
        } => cmd_run(&settings, &file, database, period, year),
        Commands::Report {
            file,
            database,
            format,
        } => cmd_report(&settings, &file, database, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Input(msg)) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
        Err(CliError::Indicator(e)) => {
            eprintln!("error[{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

enum CliError {
    /// Bad command line input (unreadable file, no database).
    Input(String),
    Indicator(IndicatorError),
}

impl From<IndicatorError> for CliError {
    fn from(e: IndicatorError) -> Self {
        CliError::Indicator(e)
    }
}

macro_rules! indicator_error_from {
    ($($error:ty),*) => {
        $(impl From<$error> for CliError {
            fn from(e: $error) -> Self {
                CliError::Indicator(e.into())
            }
        })*
    };
}

indicator_error_from!(SpecificationError, ExecutionError, SettingsError, ExportError);

fn init_tracing(settings: &Settings) {
    let level = env::var(LOG_ENV_VAR).unwrap_or_else(|_| settings.logging.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_new(&level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if settings.logging.json {
        Box::new(base.json().finish())
    } else {
        Box::new(base.compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("'{}' is not valid JSON: {}", path.display(), e)))
}

fn database_path(settings: &Settings, database: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = database {
        return Ok(path);
    }
    settings
        .database_path()?
        .ok_or_else(|| CliError::Input("no database: pass --database or set [database] path".into()))
}

fn cmd_compile(settings: &Settings, file: &Path, dialect: Option<DialectArg>) -> Result<(), CliError> {
    let indicator = read_json(file)?;

    let mut options = settings.compile_options();
    if let Some(dialect) = dialect {
        options = options.with_dialect(dialect.into());
    }

    let compiled = compile_json(&indicator, &options)?;
    println!("{}", compiled.sql);
    Ok(())
}

fn cmd_run(
    settings: &Settings,
    file: &Path,
    database: Option<PathBuf>,
    period: Option<String>,
    year: Option<String>,
) -> Result<(), CliError> {
    let indicator = read_json(file)?;
    let path = database_path(settings, database)?;

    let options = RunOptions::from_settings(settings).with_request(ResolveRequest { period, year });
    let mut service = ExecutionService::open(&path)?;
    let result = run_indicator(&mut service, &indicator, &options)?;

    info!(rows = result.row_count, "indicator executed");
    println!("{}", serde_json::to_string_pretty(&result).map_err(ExportError::from)?);
    Ok(())
}

fn cmd_report(
    settings: &Settings,
    file: &Path,
    database: Option<PathBuf>,
    format: ExportFormat,
) -> Result<(), CliError> {
    let text = fs::read_to_string(file)
        .map_err(|e| CliError::Input(format!("cannot read '{}': {}", file.display(), e)))?;
    let report = ReportDefinition::from_json_str(&text)
        .map_err(|e| CliError::Input(format!("invalid report '{}': {}", file.display(), e)))?;
    let path = database_path(settings, database)?;

    let sessions = SqliteSessionFactory::new(path);
    let options = RunOptions::from_settings(settings);
    let generated = ReportRunner::new(&sessions, &options).generate(&report);

    match format {
        ExportFormat::Json => println!("{}", report_to_json(&generated)?),
        ExportFormat::Csv => report_to_csv(&generated, io::stdout().lock())?,
    }
    Ok(())
}
