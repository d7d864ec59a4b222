//! Error types for orghub-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
///
/// An unregistered organization id is deliberately absent from this list:
/// lookups fall back to [`OrganizationProfile::unknown`](crate::OrganizationProfile::unknown).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A lookup ran before [`initialize`](crate::OrganizationRegistry::initialize).
    #[error("organization registry used before initialize()")]
    NotInitialized,

    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes origin and line context from serde_yaml.
    #[error("failed to parse catalog at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The catalog YAML file did not exist at the expected path.
    #[error("catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    /// Two catalog entries share one id.
    #[error("duplicate catalog id '{id}'")]
    DuplicateId { id: String },

    /// A catalog entry violates a structural rule (e.g. select field without options).
    #[error("invalid catalog entry '{id}': {reason}")]
    Invalid { id: String, reason: String },
}
