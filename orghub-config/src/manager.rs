//! The configuration manager.
//!
//! Resolution order (later layers win, objects merge key by key):
//!
//! ```text
//! (a) env          .env -> .env.<environment> -> .env.local -> process env   (validated)
//! (b) defaults     default.yaml
//! (c) environment  environments/<environment>.yaml
//! (d) organizations   built-in or organizations.yaml, then any `organizations` keys from (b)/(c)
//! (e) projectTemplates built-in or project-templates.yaml, then any keys from (b)/(c)
//! (f) validation   validation.yaml
//! (g) full-tree validation when `validate_on_load`
//! ```
//!
//! Every resolution builds a fresh tree (and fresh registry/catalog instances)
//! off to the side. Only a fully successful resolution is published, by
//! swapping one `Arc<Snapshot>`; readers see the old tree or the new one,
//! never a mix.

use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use orghub_core::{OrganizationProfile, OrganizationRegistry, ProjectTemplate};
use orghub_templates::TemplateCatalog;

use crate::env::{EnvOverlay, EnvSource, APP_ENV};
use crate::error::ConfigError;
use crate::paths::{self, DEBOUNCE_WINDOW, DEFAULT_CONFIG_DIR};
use crate::schema::{SchemaValidator, Section};
use crate::source::{ConfigSource, FileSource, MemorySource};
use crate::tree::{deep_merge, ConfigTree};
use crate::watcher::{ConfigWatcher, ReloadFn};

pub const ORGANIZATIONS: &str = "organizations";
pub const PROJECT_TEMPLATES: &str = "projectTemplates";
pub const VALIDATION: &str = "validation";
pub const ENV: &str = "env";

/// Key under `organizations` holding the override applied to unregistered ids.
pub const DEFAULT_ORGANIZATION: &str = "default";

const EVENT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Options and sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigOptions {
    pub config_dir: PathBuf,
    pub env_dir: PathBuf,
    /// Active environment; `APP_ENV` is used when unset.
    pub environment: Option<String>,
    pub validate_on_load: bool,
    pub hot_reload: bool,
    pub debounce: Duration,
    pub env_overlay: EnvOverlay,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            env_dir: PathBuf::from("."),
            environment: None,
            validate_on_load: true,
            hot_reload: false,
            debounce: DEBOUNCE_WINDOW,
            env_overlay: EnvOverlay::Process,
        }
    }
}

impl ConfigOptions {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    pub fn env_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.env_dir = dir.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn validate_on_load(mut self, on: bool) -> Self {
        self.validate_on_load = on;
        self
    }

    pub fn hot_reload(mut self, on: bool) -> Self {
        self.hot_reload = on;
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn env_overlay(mut self, overlay: EnvOverlay) -> Self {
        self.env_overlay = overlay;
        self
    }

    /// Use `vars` instead of the process environment.
    pub fn env_vars<K, V>(self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.env_overlay(EnvOverlay::Fixed(vars))
    }
}

/// Everything a resolution reads from.
#[derive(Debug)]
pub struct ConfigSources {
    pub env: EnvSource,
    pub defaults: Box<dyn ConfigSource>,
    pub environment: Box<dyn ConfigSource>,
    pub validation: Option<Box<dyn ConfigSource>>,
    /// Uninitialized prototype; cloned and initialized on every resolution.
    pub registry: OrganizationRegistry,
    /// Uninitialized prototype; cloned and initialized on every resolution.
    pub catalog: TemplateCatalog,
}

impl ConfigSources {
    /// Only `defaults`; no env files, built-in catalogs.
    pub fn new(env: EnvSource, defaults: impl ConfigSource + 'static) -> Self {
        Self {
            env,
            defaults: Box::new(defaults),
            environment: Box::new(MemorySource::empty("environment")),
            validation: None,
            registry: OrganizationRegistry::builtin(),
            catalog: TemplateCatalog::builtin(),
        }
    }

    /// The on-disk layout described in [`crate::paths`].
    pub fn from_options(options: &ConfigOptions) -> Self {
        let dir = options.config_dir.as_path();
        let organizations = paths::organizations_path(dir);
        let templates = paths::templates_path(dir);

        let registry = if organizations.is_file() {
            OrganizationRegistry::from_file(organizations)
        } else {
            OrganizationRegistry::builtin()
        };
        let catalog = if templates.is_file() {
            TemplateCatalog::from_file(templates)
        } else {
            TemplateCatalog::builtin()
        };

        Self {
            env: EnvSource::new(&options.env_dir, options.env_overlay.clone()),
            defaults: Box::new(FileSource::required(paths::default_config_path(dir))),
            environment: Box::new(FileSource::optional(paths::environment_config_pattern(dir))),
            validation: Some(Box::new(FileSource::optional(paths::validation_path(dir)))),
            registry,
            catalog: catalog.with_user_template_dir(paths::document_templates_dir(dir)),
        }
    }

    pub fn with_environment_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.environment = Box::new(source);
        self
    }

    pub fn with_validation_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.validation = Some(Box::new(source));
        self
    }

    pub fn with_registry(mut self, registry: OrganizationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Reloading,
    /// Last reload failed; the previous tree is still active.
    Failed,
}

/// Lifecycle notifications.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    Initialized { current: Arc<ConfigTree> },
    Reloaded {
        previous: Arc<ConfigTree>,
        current: Arc<ConfigTree>,
    },
    ReloadFailed { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigHealth {
    pub is_initialized: bool,
    pub status: Phase,
    pub environment: Option<String>,
    pub last_load_time: Option<DateTime<Utc>>,
    pub watched_files: Vec<PathBuf>,
    pub config_sections: Vec<String>,
    pub uptime_seconds: u64,
    pub organizations_healthy: bool,
    pub templates_healthy: bool,
}

/// One published resolution.
#[derive(Debug)]
struct Snapshot {
    tree: Arc<ConfigTree>,
    environment: String,
    env_override: Value,
    registry: Arc<OrganizationRegistry>,
    catalog: Arc<TemplateCatalog>,
    loaded_at: DateTime<Utc>,
}

struct Resolved {
    snapshot: Snapshot,
    files: Vec<PathBuf>,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    snapshot: Option<Arc<Snapshot>>,
}

struct Inner {
    options: ConfigOptions,
    sources: ConfigSources,
    validator: SchemaValidator,
    state: RwLock<State>,
    reload_lock: Mutex<()>,
    events: broadcast::Sender<ConfigEvent>,
    watcher: Mutex<Option<ConfigWatcher>>,
    started: Instant,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Central, cheaply cloneable handle to the resolved configuration.
#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("options", &self.inner.options)
            .field("phase", &self.phase())
            .finish()
    }
}

impl ConfigManager {
    /// Manager over the on-disk layout under `options.config_dir`.
    pub fn new(options: ConfigOptions) -> Result<Self, ConfigError> {
        let sources = ConfigSources::from_options(&options);
        Self::with_sources(options, sources)
    }

    /// Manager over explicit sources. Only the behavioural fields of
    /// `options` are used; directories come from `sources`.
    pub fn with_sources(
        options: ConfigOptions,
        sources: ConfigSources,
    ) -> Result<Self, ConfigError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                options,
                sources,
                validator: SchemaValidator::new()?,
                state: RwLock::new(State {
                    phase: Phase::Uninitialized,
                    snapshot: None,
                }),
                reload_lock: Mutex::new(()),
                events,
                watcher: Mutex::new(None),
                started: Instant::now(),
            }),
        })
    }

    pub fn options(&self) -> &ConfigOptions {
        &self.inner.options
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.inner.validator
    }

    pub fn phase(&self) -> Phase {
        read(&self.inner.state).phase
    }

    pub fn is_initialized(&self) -> bool {
        read(&self.inner.state).snapshot.is_some()
    }

    /// Receiver for lifecycle notifications. Subscribe before `initialize()`
    /// to see the `Initialized` event.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.inner.events.subscribe()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Resolve every layer, validate, publish, and start watching when hot
    /// reload is on. Any failure is returned and nothing is published.
    pub fn initialize(&self) -> Result<(), ConfigError> {
        let _guard = lock(&self.inner.reload_lock);
        let before = self.set_phase(Phase::Initializing);

        let resolved = match self.resolve() {
            Ok(resolved) => resolved,
            Err(err) => {
                self.set_phase(before);
                return Err(err);
            }
        };
        if self.inner.options.hot_reload {
            if let Err(err) = self.start_watching(&resolved.files) {
                self.set_phase(before);
                return Err(err);
            }
        }

        let snapshot = self.publish(resolved.snapshot);
        info!(
            environment = %snapshot.environment,
            sections = ?snapshot.tree.sections(),
            hot_reload = self.inner.options.hot_reload,
            "configuration initialized",
        );
        let _ = self.inner.events.send(ConfigEvent::Initialized {
            current: Arc::clone(&snapshot.tree),
        });
        Ok(())
    }

    /// Re-run resolution and swap the tree on success.
    ///
    /// On failure the active tree is untouched, the phase becomes `Failed`, a
    /// `ReloadFailed` event goes out and the error is returned.
    pub fn reload(&self) -> Result<Arc<ConfigTree>, ConfigError> {
        let _guard = lock(&self.inner.reload_lock);
        self.reload_locked()
    }

    /// Reload unless one is already running. Returns whether a reload ran.
    /// Failures are reported through events and logs only.
    pub fn trigger_reload(&self) -> bool {
        let _guard = match self.inner.reload_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("reload already in progress, skipping trigger");
                return false;
            }
        };
        let _ = self.reload_locked();
        true
    }

    fn reload_locked(&self) -> Result<Arc<ConfigTree>, ConfigError> {
        let previous = self.snapshot()?;
        self.set_phase(Phase::Reloading);

        match self.resolve() {
            Ok(resolved) => {
                self.refresh_watcher(&resolved.files);
                let current = self.publish(resolved.snapshot);
                info!(environment = %current.environment, "configuration reloaded");
                let _ = self.inner.events.send(ConfigEvent::Reloaded {
                    previous: Arc::clone(&previous.tree),
                    current: Arc::clone(&current.tree),
                });
                Ok(Arc::clone(&current.tree))
            }
            Err(err) => {
                self.set_phase(Phase::Failed);
                warn!(error = %err, "configuration reload failed, keeping previous configuration");
                let _ = self.inner.events.send(ConfigEvent::ReloadFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Stop hot reload. The active tree stays.
    pub fn stop_watching(&self) {
        if lock(&self.inner.watcher).take().is_some() {
            info!("stopped watching configuration files");
        }
    }

    // -- queries ------------------------------------------------------------

    /// The active tree. Cheap; the tree itself is immutable.
    pub fn tree(&self) -> Result<Arc<ConfigTree>, ConfigError> {
        Ok(Arc::clone(&self.snapshot()?.tree))
    }

    /// Value at dotted `path`, `None` when any segment is missing.
    pub fn get(&self, path: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.snapshot()?.tree.get(path))
    }

    pub fn get_or(&self, path: &str, default: Value) -> Result<Value, ConfigError> {
        Ok(self.get(path)?.unwrap_or(default))
    }

    /// Typed lookup.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        self.get(path)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                    path: path.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Deep copy of the whole tree.
    pub fn get_all(&self) -> Result<ConfigTree, ConfigError> {
        Ok(ConfigTree::clone(&self.snapshot()?.tree))
    }

    /// The active environment's override block (or `section` of it). Empty
    /// object when absent, including before initialization.
    pub fn get_environment_config(&self, section: Option<&str>) -> Value {
        let empty = || Value::Object(Map::new());
        let Ok(snapshot) = self.snapshot() else {
            return empty();
        };
        match section {
            None => snapshot.env_override.clone(),
            Some(name) => snapshot
                .env_override
                .get(name)
                .cloned()
                .unwrap_or_else(empty),
        }
    }

    pub fn environment(&self) -> Result<String, ConfigError> {
        Ok(self.snapshot()?.environment.clone())
    }

    /// Profile for `id`.
    ///
    /// A registered id (from the catalog or the `organizations` section) gets
    /// its node. An unregistered id gets the synthesized unknown profile with
    /// `organizations.default` merged over it, when that override exists.
    /// Missing keys in either are filled from the unknown profile.
    pub fn get_organization_config(&self, id: &str) -> Result<OrganizationProfile, ConfigError> {
        let snapshot = self.snapshot()?;
        let organizations = snapshot.tree.section(ORGANIZATIONS);
        let registered = organizations
            .and_then(|orgs| orgs.get(id))
            .filter(|_| id != DEFAULT_ORGANIZATION);
        let default_override = organizations.and_then(|orgs| orgs.get(DEFAULT_ORGANIZATION));

        match (registered, default_override) {
            (Some(node), _) => profile_from_node(id, node),
            (None, Some(default)) => {
                let mut profile = serde_json::to_value(OrganizationProfile::unknown(id))?;
                deep_merge(&mut profile, default.clone());
                profile["id"] = Value::String(id.to_string());
                serde_json::from_value(profile).map_err(|e| ConfigError::InvalidValue {
                    path: format!("{ORGANIZATIONS}.{DEFAULT_ORGANIZATION}"),
                    message: e.to_string(),
                })
            }
            (None, None) => Ok(OrganizationProfile::unknown(id)),
        }
    }

    /// Every registered organization, resolved through
    /// [`get_organization_config`](Self::get_organization_config), in id order.
    pub fn organizations(&self) -> Result<Vec<OrganizationProfile>, ConfigError> {
        let ids: Vec<String> = self
            .snapshot()?
            .tree
            .section(ORGANIZATIONS)
            .and_then(Value::as_object)
            .map(|orgs| orgs.keys().filter(|k| *k != DEFAULT_ORGANIZATION).cloned().collect())
            .unwrap_or_default();
        ids.iter().map(|id| self.get_organization_config(id)).collect()
    }

    /// Template id configured for organization `id`.
    pub fn project_template_for(&self, id: &str) -> Result<String, ConfigError> {
        Ok(self.get_organization_config(id)?.settings.project_template)
    }

    /// Template catalog published with the active tree.
    pub fn templates(&self) -> Result<Arc<TemplateCatalog>, ConfigError> {
        Ok(Arc::clone(&self.snapshot()?.catalog))
    }

    /// Organization registry published with the active tree.
    pub fn registry(&self) -> Result<Arc<OrganizationRegistry>, ConfigError> {
        Ok(Arc::clone(&self.snapshot()?.registry))
    }

    /// Never fails.
    pub fn get_health(&self) -> ConfigHealth {
        let (phase, snapshot) = {
            let state = read(&self.inner.state);
            (state.phase, state.snapshot.clone())
        };
        let watched_files = lock(&self.inner.watcher)
            .as_ref()
            .map(ConfigWatcher::files)
            .unwrap_or_default();
        ConfigHealth {
            is_initialized: snapshot.is_some(),
            status: phase,
            environment: snapshot.as_ref().map(|s| s.environment.clone()),
            last_load_time: snapshot.as_ref().map(|s| s.loaded_at),
            watched_files,
            config_sections: snapshot.as_ref().map(|s| s.tree.sections()).unwrap_or_default(),
            uptime_seconds: self.inner.started.elapsed().as_secs(),
            organizations_healthy: snapshot.as_ref().is_some_and(|s| s.registry.is_healthy()),
            templates_healthy: snapshot.as_ref().is_some_and(|s| s.catalog.is_healthy()),
        }
    }

    // -- internals ----------------------------------------------------------

    fn snapshot(&self) -> Result<Arc<Snapshot>, ConfigError> {
        read(&self.inner.state)
            .snapshot
            .clone()
            .ok_or(ConfigError::NotInitialized)
    }

    /// Returns the previous phase.
    fn set_phase(&self, phase: Phase) -> Phase {
        std::mem::replace(&mut write(&self.inner.state).phase, phase)
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut state = write(&self.inner.state);
        state.snapshot = Some(Arc::clone(&snapshot));
        state.phase = Phase::Ready;
        snapshot
    }

    fn active_environment(&self) -> String {
        self.inner
            .options
            .environment
            .clone()
            .unwrap_or_else(|| self.inner.sources.env.detect_environment())
    }

    /// Build a complete snapshot without touching published state.
    fn resolve(&self) -> Result<Resolved, ConfigError> {
        let sources = &self.inner.sources;
        let environment = self.active_environment();
        let mut files = Vec::new();

        // (a)
        let mut env = sources
            .env
            .load(&environment)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        if self.inner.options.environment.is_some() {
            if let Some(vars) = env.as_object_mut() {
                vars.insert(APP_ENV.to_string(), Value::String(environment.clone()));
            }
        }
        let env = self
            .inner
            .validator
            .validate_section(Section::Env, &env)
            .into_result()?;
        files.extend(sources.env.watched_paths(&environment));

        // (b) + (c)
        let mut tree = ConfigTree::new();
        if let Some(defaults) = sources.defaults.load(&environment)? {
            tree.merge(without_env(defaults, sources.defaults.as_ref()));
        }
        files.extend(sources.defaults.watched_paths(&environment));

        let env_override = match sources.environment.load(&environment)? {
            Some(value) => without_env(value, sources.environment.as_ref()),
            None => Value::Object(Map::new()),
        };
        tree.merge(env_override.clone());
        files.extend(sources.environment.watched_paths(&environment));
        tree.set_section(ENV, env);

        // (d)
        let mut registry = sources.registry.clone();
        registry.initialize()?;
        let profiles = registry.organizations()?;
        let org_order: Vec<String> = profiles.iter().map(|p| p.id.0.clone()).collect();
        let profiles = profiles
            .into_iter()
            .map(|p| Ok((p.id.0.clone(), serde_json::to_value(&p)?)))
            .collect::<Result<Map<_, _>, ConfigError>>()?;
        merge_section(&mut tree, ORGANIZATIONS, Value::Object(profiles));
        files.extend(registry.source_path().map(Path::to_path_buf));

        // (e)
        let mut catalog = sources.catalog.clone();
        catalog.initialize()?;
        let templates = catalog.templates()?;
        let template_order: Vec<String> = templates.iter().map(|t| t.id.0.clone()).collect();
        let templates = templates
            .into_iter()
            .map(|t| Ok((t.id.0.clone(), serde_json::to_value(&t)?)))
            .collect::<Result<Map<_, _>, ConfigError>>()?;
        merge_section(&mut tree, PROJECT_TEMPLATES, Value::Object(templates));
        files.extend(catalog.source_path().map(Path::to_path_buf));

        // (f)
        if let Some(source) = &sources.validation {
            if let Some(value) = source.load(&environment)? {
                merge_section(&mut tree, VALIDATION, value);
            }
            files.extend(source.watched_paths(&environment));
        }

        // (g)
        if self.inner.options.validate_on_load {
            self.inner
                .validator
                .validate_section(Section::Config, tree.as_value())
                .into_result()?;
        }

        // The published registry and catalog answer from the merged sections.
        let mut merged_profiles = Vec::new();
        for (id, node) in ordered_entries(&tree, ORGANIZATIONS, &org_order) {
            if id != DEFAULT_ORGANIZATION {
                merged_profiles.push(profile_from_node(&id, node)?);
            }
        }
        registry.replace_profiles(merged_profiles)?;

        let mut merged_templates = Vec::new();
        for (id, node) in ordered_entries(&tree, PROJECT_TEMPLATES, &template_order) {
            merged_templates.push(template_from_node(&id, node)?);
        }
        catalog.replace_templates(merged_templates)?;

        files.sort();
        files.dedup();
        Ok(Resolved {
            snapshot: Snapshot {
                tree: Arc::new(tree),
                environment,
                env_override,
                registry: Arc::new(registry),
                catalog: Arc::new(catalog),
                loaded_at: Utc::now(),
            },
            files,
        })
    }

    fn start_watching(&self, files: &[PathBuf]) -> Result<(), ConfigError> {
        let mut slot = lock(&self.inner.watcher);
        if let Some(watcher) = slot.as_mut() {
            return watcher.update(files);
        }
        let weak = Arc::downgrade(&self.inner);
        let reload: ReloadFn = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                ConfigManager { inner }.trigger_reload();
            }
        });
        *slot = Some(ConfigWatcher::start(files, self.inner.options.debounce, reload)?);
        info!(files = files.len(), "watching configuration files");
        Ok(())
    }

    fn refresh_watcher(&self, files: &[PathBuf]) {
        if let Some(watcher) = lock(&self.inner.watcher).as_mut() {
            if let Err(err) = watcher.update(files) {
                warn!(error = %err, "failed to update watched configuration files");
            }
        }
    }
}

/// `env` is derived from environment variables only.
fn without_env(mut value: Value, source: &dyn ConfigSource) -> Value {
    if let Some(map) = value.as_object_mut() {
        if map.remove(ENV).is_some() {
            warn!(source = %source.name(), "ignoring 'env' section in config file");
        }
    }
    value
}

/// Entries of section `name`: ids in `order` first, then any others by key.
fn ordered_entries<'a>(
    tree: &'a ConfigTree,
    name: &str,
    order: &[String],
) -> Vec<(String, &'a Value)> {
    let Some(section) = tree.section(name).and_then(Value::as_object) else {
        return Vec::new();
    };
    let known = order
        .iter()
        .filter_map(|id| section.get(id).map(|node| (id.clone(), node)));
    let extra = section
        .iter()
        .filter(|(id, _)| !order.contains(id))
        .map(|(id, node)| (id.clone(), node));
    known.chain(extra).collect()
}

/// A registered organization node, with unset keys taken from the unknown profile.
fn profile_from_node(id: &str, node: &Value) -> Result<OrganizationProfile, ConfigError> {
    let mut profile = serde_json::to_value(OrganizationProfile::unknown(id))?;
    deep_merge(&mut profile, node.clone());
    serde_json::from_value(profile).map_err(|e| ConfigError::InvalidValue {
        path: format!("{ORGANIZATIONS}.{id}"),
        message: e.to_string(),
    })
}

/// A `projectTemplates` node; its key is the id when the node has none.
fn template_from_node(id: &str, node: &Value) -> Result<ProjectTemplate, ConfigError> {
    let mut node = node.clone();
    if let Some(fields) = node.as_object_mut() {
        fields
            .entry("id")
            .or_insert_with(|| Value::String(id.to_string()));
    }
    serde_json::from_value(node).map_err(|e| ConfigError::InvalidValue {
        path: format!("{PROJECT_TEMPLATES}.{id}"),
        message: e.to_string(),
    })
}

/// `base` under `name`, with whatever the tree already holds there merged on top.
fn merge_section(tree: &mut ConfigTree, name: &str, mut base: Value) {
    if let Some(existing) = tree.remove_section(name) {
        deep_merge(&mut base, existing);
    }
    tree.set_section(name, base);
}
