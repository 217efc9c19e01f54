//! TOML-based configuration.
//!
//! Supports a config file (indicators.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${INDICATORS_DATA}/survey.db"
//!
//! [compiler]
//! dialect = "sqlite"
//! identity_column = "idEtudiant"
//!
//! [[compiler.joins]]
//! left = "etudiants"
//! right = "mobilite"
//! left_column = "code_etudiant"
//! right_column = "etudiant"
//!
//! [schema.periods]
//! 6_mois = "_6m"
//! 30_mois = "_30m"
//!
//! [schema.tables.insertion_diplomes]
//! data_types = ["insertion"]
//!
//! [[schema.tables.insertion_diplomes.columns]]
//! name = "situation"
//! prefixes = ["quelle_est_votre_situation"]
//! priority = ["actuelle"]
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::SchemaConfig;
use crate::sql::Dialect;
use crate::translation::{CompileOptions, JoinRule};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "INDICATOR_SQL_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Database used for execution.
    pub database: DatabaseSettings,

    /// SQL generation.
    pub compiler: CompilerSettings,

    /// Logical to physical schema mapping.
    pub schema: SchemaConfig,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Dialect for compile-only output.
    pub dialect: Dialect,

    /// Identity column shared by joinable tables.
    pub identity_column: String,

    /// Explicit join predicates per table pair.
    pub joins: Vec<JoinRule>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            identity_column: "id".to_string(),
            joins: vec![],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `indicator_sql=debug`.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `INDICATOR_SQL_CONFIG`
    /// 2. `./indicators.toml`
    /// 3. `~/.config/indicator-sql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("indicators.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("indicator-sql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Database path with environment variables expanded.
    pub fn database_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.database
            .path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }

    /// Compile options derived from the `[compiler]` section.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            dialect: self.compiler.dialect,
            identity_column: self.compiler.identity_column.clone(),
            joins: self.compiler.joins.clone(),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.compiler.identity_column.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "compiler.identity_column must not be empty".into(),
            ));
        }
        for (logical, table) in &self.schema.tables {
            if table.data_types.is_empty() {
                return Err(SettingsError::InvalidConfig(format!(
                    "schema.tables.{} has no data_types",
                    logical
                )));
            }
            if let Some(column) = table.columns.iter().find(|c| c.prefixes.is_empty()) {
                return Err(SettingsError::InvalidConfig(format!(
                    "schema.tables.{}: column '{}' has no prefixes",
                    logical, column.name
                )));
            }
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        // Check for ${VAR} or $VAR
        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name: String = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next(); // consume '}'
            name
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            std::iter::from_fn(|| chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_')).collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
