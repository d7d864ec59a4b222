//! Error types for orghub-templates.

use std::path::PathBuf;

use thiserror::Error;

use orghub_core::RegistryError;

/// All errors that can arise from catalog and template application operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A catalog method ran before [`initialize`](crate::TemplateCatalog::initialize).
    #[error("template catalog used before initialize()")]
    NotInitialized,

    /// `apply_template` was asked for an id the catalog does not hold.
    /// (`get_template` reports the same miss as `Ok(None)`.)
    #[error("template not found: {id}")]
    NotFound { id: String },

    /// Loading or checking the catalog file failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] RegistryError),

    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user document templates.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
