//! # orghub-templates
//!
//! Catalog of reusable GitHub project templates and the engine that applies a
//! template to a repository/organization context, rendering a README-like
//! project document with tera.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orghub_templates::{ApplyContext, TemplateCatalog};
//!
//! fn provision() -> Result<(), orghub_templates::TemplateError> {
//!     let mut catalog = TemplateCatalog::builtin();
//!     catalog.initialize()?;
//!     let ctx = ApplyContext::for_repository("my-app", "DevBusinessHub");
//!     let applied = catalog.apply_template("production-ready", &ctx)?;
//!     println!("{}", applied.document);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod context;
pub mod customize;
pub mod engine;
pub mod error;

pub use catalog::{TemplateCatalog, TemplateSource};
pub use context::{AppliedProjectConfig, ApplyContext, DocumentContext};
pub use customize::{PassThrough, ProjectCustomizer};
pub use engine::DocumentRenderer;
pub use error::TemplateError;
