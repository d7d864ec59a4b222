//! orghub core library: domain types, organization registry, errors.
//!
//! - [`types`]: newtypes, organization profiles, project templates
//! - [`error`]: [`RegistryError`]
//! - [`registry`]: [`OrganizationRegistry`] and the YAML catalog helpers

pub mod error;
pub mod registry;
pub mod types;

pub use error::RegistryError;
pub use registry::{OrganizationRegistry, RegistrySource};
pub use types::{
    AutomationRules, FieldDef, FieldOption, FieldType, OrganizationAutomation, OrganizationId,
    OrganizationProfile, OrganizationSettings, OrganizationType, ProjectTemplate, SecurityLevel,
    TemplateId, TemplateSettings, TemplateSummary, ViewDef, ViewLayout,
};
