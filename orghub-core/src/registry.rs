//! Organization registry and the YAML catalog loader shared with the template catalog.
//!
//! # Catalog file layout
//!
//! ```text
//! organizations:
//!   - id: DevBusinessHub
//!     name: Dev Business Hub
//!     type: production
//!     settings: { projectTemplate: production-ready, securityLevel: high, ... }
//!     projectFields: [...]
//!     projectViews: [...]
//! ```
//!
//! # API pattern
//!
//! A registry is constructed from a [`RegistrySource`], then [`initialize`]d
//! exactly once before any lookup. Lookups hand out owned copies; there are no
//! mutation methods. Changing the catalog means shipping a new catalog file.
//!
//! [`initialize`]: OrganizationRegistry::initialize

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::RegistryError;
use crate::types::{OrganizationId, OrganizationProfile};

/// Built-in catalog, baked into the binary at compile time.
const BUILTIN_ORGANIZATIONS: &str = include_str!("catalog/organizations.yaml");

/// Origin label used in parse errors for embedded catalogs.
pub const BUILTIN_ORIGIN: &str = "<builtin>";

// ---------------------------------------------------------------------------
// 1. YAML loading helpers
// ---------------------------------------------------------------------------

/// Parse `contents` as YAML, attributing errors to `origin`.
pub fn parse_yaml<T: DeserializeOwned>(contents: &str, origin: &Path) -> Result<T, RegistryError> {
    serde_yaml::from_str(contents).map_err(|source| RegistryError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load and parse a YAML file.
///
/// Returns `RegistryError::CatalogNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_yaml_at<T: DeserializeOwned>(path: &Path) -> Result<T, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::CatalogNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&contents, path)
}

/// Fails with `DuplicateId` on the first id seen twice.
pub fn ensure_unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(RegistryError::DuplicateId { id: id.to_string() });
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct OrganizationCatalog {
    #[serde(default)]
    organizations: Vec<OrganizationProfile>,
}

// ---------------------------------------------------------------------------
// 2. Source
// ---------------------------------------------------------------------------

/// Where the registry reads its profiles from on [`OrganizationRegistry::initialize`].
#[derive(Debug, Clone)]
pub enum RegistrySource {
    /// The embedded catalog shipped with the binary.
    Builtin,
    /// A YAML catalog file (same layout as the embedded one).
    File(PathBuf),
    /// An explicit list, mostly for tests and fixtures.
    Profiles(Vec<OrganizationProfile>),
}

impl RegistrySource {
    fn load(&self) -> Result<Vec<OrganizationProfile>, RegistryError> {
        match self {
            RegistrySource::Builtin => {
                let catalog: OrganizationCatalog =
                    parse_yaml(BUILTIN_ORGANIZATIONS, Path::new(BUILTIN_ORIGIN))?;
                Ok(catalog.organizations)
            }
            RegistrySource::File(path) => {
                let catalog: OrganizationCatalog = load_yaml_at(path)?;
                Ok(catalog.organizations)
            }
            RegistrySource::Profiles(profiles) => Ok(profiles.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Registry
// ---------------------------------------------------------------------------

/// Fixed set of organization profiles with a deterministic fallback for unknown ids.
///
/// Cloning an uninitialized registry is the supported way to build a fresh,
/// isolated instance from the same source (the config manager does this on
/// every load).
#[derive(Debug, Clone)]
pub struct OrganizationRegistry {
    source: RegistrySource,
    profiles: Option<Vec<OrganizationProfile>>,
}

impl OrganizationRegistry {
    pub fn new(source: RegistrySource) -> Self {
        Self {
            source,
            profiles: None,
        }
    }

    pub fn builtin() -> Self {
        Self::new(RegistrySource::Builtin)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(RegistrySource::File(path.into()))
    }

    pub fn from_profiles(profiles: Vec<OrganizationProfile>) -> Self {
        Self::new(RegistrySource::Profiles(profiles))
    }

    /// Populate the in-memory profile set from the source.
    ///
    /// Rejects duplicate ids and structurally invalid profiles. Calling it again
    /// re-reads the source.
    pub fn initialize(&mut self) -> Result<(), RegistryError> {
        let profiles = self.source.load()?;
        self.replace_profiles(profiles)
    }

    /// Swap in `profiles` (same checks as [`initialize`](Self::initialize)).
    /// The source is kept, so [`source_path`](Self::source_path) is unchanged.
    pub fn replace_profiles(
        &mut self,
        profiles: Vec<OrganizationProfile>,
    ) -> Result<(), RegistryError> {
        ensure_unique_ids(profiles.iter().map(|p| p.id.0.as_str()))?;
        for profile in &profiles {
            profile.check().map_err(|reason| RegistryError::Invalid {
                id: profile.id.0.clone(),
                reason,
            })?;
        }
        self.profiles = Some(profiles);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.profiles.is_some()
    }

    /// True iff initialized and at least one profile is registered.
    pub fn is_healthy(&self) -> bool {
        self.profiles.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// The catalog file backing this registry, if any.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            RegistrySource::File(path) => Some(path),
            _ => None,
        }
    }

    /// Copy of the profile registered under `id`, or the synthesized
    /// [`OrganizationProfile::unknown`] profile. Never fails once initialized.
    pub fn get_organization_config(&self, id: &str) -> Result<OrganizationProfile, RegistryError> {
        Ok(self
            .find(id)?
            .cloned()
            .unwrap_or_else(|| OrganizationProfile::unknown(id)))
    }

    pub fn contains(&self, id: &str) -> Result<bool, RegistryError> {
        Ok(self.find(id)?.is_some())
    }

    /// Copies of all registered profiles in catalog order.
    pub fn organizations(&self) -> Result<Vec<OrganizationProfile>, RegistryError> {
        Ok(self.loaded()?.to_vec())
    }

    pub fn ids(&self) -> Result<Vec<OrganizationId>, RegistryError> {
        Ok(self.loaded()?.iter().map(|p| p.id.clone()).collect())
    }

    fn loaded(&self) -> Result<&[OrganizationProfile], RegistryError> {
        self.profiles.as_deref().ok_or(RegistryError::NotInitialized)
    }

    fn find(&self, id: &str) -> Result<Option<&OrganizationProfile>, RegistryError> {
        Ok(self.loaded()?.iter().find(|p| p.id.0 == id))
    }
}

impl Default for OrganizationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
