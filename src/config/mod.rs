//! Configuration module.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, DatabaseSettings, LoggingSettings, Settings, SettingsError,
    CONFIG_ENV_VAR,
};
