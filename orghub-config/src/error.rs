use std::path::PathBuf;

use thiserror::Error;

use crate::schema::ValidationReport;

/// Error surface for configuration loading, validation and hot reload.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A query ran before `initialize()` completed.
    #[error("configuration manager used before initialize()")]
    NotInitialized,

    #[error("required configuration file missing: {path}")]
    MissingRequiredFile { path: PathBuf },

    /// Programmer error: validation requested for a section no schema exists for.
    #[error("unknown configuration section '{0}'")]
    UnknownSection(String),

    /// One or more schema violations; carries all of them.
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to read env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },

    /// An embedded schema failed to compile.
    #[error("schema for section '{section}' is invalid: {message}")]
    Schema { section: String, message: String },

    /// A value in the tree does not have the shape the caller asked for.
    #[error("value at '{path}' has an unexpected shape: {message}")]
    InvalidValue { path: String, message: String },

    #[error("organization registry error: {0}")]
    Registry(#[from] orghub_core::RegistryError),

    #[error("template catalog error: {0}")]
    Template(#[from] orghub_templates::TemplateError),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Hot reload needs a tokio runtime to run the watcher task on.
    #[error("hot reload requires a running tokio runtime")]
    NoRuntime,
}

impl ConfigError {
    /// Validation failures are the only recoverable class at reload time.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConfigError::Validation(_))
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
