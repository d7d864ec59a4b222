//! Layered configuration for orghub: env files, YAML config, the organization
//! registry and the template catalog merged into one validated, queryable
//! tree, with optional hot reload.
//!
//! ```rust,no_run
//! use orghub_config::{ConfigManager, ConfigOptions};
//!
//! fn boot() -> Result<(), orghub_config::ConfigError> {
//!     let manager = ConfigManager::new(ConfigOptions::new("config").environment("production"))?;
//!     manager.initialize()?;
//!     let ttl = manager.get_as::<u64>("cache.ttl")?.unwrap_or(300);
//!     let org = manager.get_organization_config("DevBusinessHub")?;
//!     println!("{ttl} {}", org.settings.project_template);
//!     Ok(())
//! }
//! ```

pub mod env;
mod error;
pub mod manager;
pub mod paths;
pub mod schema;
pub mod source;
pub mod tree;
mod watcher;

pub use env::{EnvOverlay, EnvSource};
pub use error::ConfigError;
pub use manager::{ConfigEvent, ConfigHealth, ConfigManager, ConfigOptions, ConfigSources, Phase};
pub use schema::{SchemaValidator, Section, Validation, ValidationReport, Violation};
pub use source::{ConfigSource, FileSource, MemorySource};
pub use tree::ConfigTree;
