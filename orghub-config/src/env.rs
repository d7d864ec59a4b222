//! Environment variables: the recognized set, coercion, and layered env files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::paths::{env_file_layers, DEFAULT_ENVIRONMENT};
use crate::source::ConfigSource;

pub const APP_ENV: &str = "APP_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    String,
    Integer,
    Boolean,
}

/// One recognized environment variable.
#[derive(Debug, Clone, Copy)]
pub struct EnvVarSpec {
    pub name: &'static str,
    pub kind: EnvKind,
    pub default: Option<&'static str>,
    /// Value is redacted in diagnostics.
    pub secret: bool,
}

const fn var(name: &'static str, kind: EnvKind, default: Option<&'static str>) -> EnvVarSpec {
    EnvVarSpec {
        name,
        kind,
        default,
        secret: false,
    }
}

const fn secret(name: &'static str) -> EnvVarSpec {
    EnvVarSpec {
        name,
        kind: EnvKind::String,
        default: None,
        secret: true,
    }
}

pub const ENV_VARS: &[EnvVarSpec] = &[
    var(APP_ENV, EnvKind::String, Some(DEFAULT_ENVIRONMENT)),
    var("LOG_LEVEL", EnvKind::String, Some("info")),
    var("PORT", EnvKind::Integer, Some("3000")),
    secret("GITHUB_TOKEN"),
    secret("WEBHOOK_SECRET"),
    secret("SESSION_SECRET"),
    secret("JWT_SECRET"),
    var("CACHE_TTL", EnvKind::Integer, Some("300")),
    var("CACHE_CHECK_PERIOD", EnvKind::Integer, Some("600")),
    var("RATE_LIMIT_WINDOW_MS", EnvKind::Integer, Some("900000")),
    var("RATE_LIMIT_MAX_REQUESTS", EnvKind::Integer, Some("100")),
    var("ENABLE_WEBHOOKS", EnvKind::Boolean, Some("false")),
    var("ENABLE_DASHBOARD", EnvKind::Boolean, Some("true")),
    var("ENABLE_METRICS", EnvKind::Boolean, Some("false")),
    var("ENABLE_HOT_RELOAD", EnvKind::Boolean, Some("false")),
    var("SMTP_HOST", EnvKind::String, None),
    var("SMTP_PORT", EnvKind::Integer, None),
    var("SMTP_USER", EnvKind::String, None),
    secret("SMTP_PASS"),
    var("SMTP_SECURE", EnvKind::Boolean, Some("false")),
];

pub fn spec_for(name: &str) -> Option<&'static EnvVarSpec> {
    ENV_VARS.iter().find(|spec| spec.name == name)
}

pub fn is_recognized(name: &str) -> bool {
    spec_for(name).is_some()
}

pub fn is_secret(name: &str) -> bool {
    spec_for(name).is_some_and(|spec| spec.secret)
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Convert a raw string to the JSON type `kind` declares.
///
/// Values that do not parse stay strings, so the schema reports a type error
/// instead of the value silently disappearing.
pub fn coerce(kind: EnvKind, raw: &str) -> Value {
    let trimmed = raw.trim();
    match kind {
        EnvKind::String => Value::String(raw.to_string()),
        EnvKind::Integer => match trimmed.parse::<i64>() {
            Ok(n) => Value::Number(Number::from(n)),
            Err(_) => Value::String(raw.to_string()),
        },
        EnvKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
    }
}

/// Coerce recognized keys and fill in every declared default.
///
/// With `keep_unknown`, unrecognized keys pass through as strings.
pub fn coerce_env(vars: &BTreeMap<String, String>, keep_unknown: bool) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in ENV_VARS {
        match (vars.get(spec.name), spec.default) {
            (Some(raw), _) => {
                out.insert(spec.name.to_string(), coerce(spec.kind, raw));
            }
            (None, Some(default)) => {
                out.insert(spec.name.to_string(), coerce(spec.kind, default));
            }
            (None, None) => {}
        }
    }
    if keep_unknown {
        for (key, raw) in vars {
            if !is_recognized(key) {
                out.insert(key.clone(), Value::String(raw.clone()));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Env files
// ---------------------------------------------------------------------------

/// Read one dotenv file into `vars`, overriding existing keys.
///
/// The process environment is never modified.
pub fn read_env_file(path: &Path, vars: &mut BTreeMap<String, String>) -> Result<(), ConfigError> {
    let env_err = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let iter = dotenvy::from_path_iter(path).map_err(env_err)?;
    for item in iter {
        let (key, value) = item.map_err(env_err)?;
        vars.insert(key, value);
    }
    Ok(())
}

/// What wins over the env files.
#[derive(Debug, Clone, Default)]
pub enum EnvOverlay {
    /// Recognized variables from the process environment.
    #[default]
    Process,
    /// A fixed map, for tests and embedding.
    Fixed(BTreeMap<String, String>),
    /// Env files only.
    None,
}

impl EnvOverlay {
    fn vars(&self) -> BTreeMap<String, String> {
        match self {
            EnvOverlay::Process => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .filter(|(k, _)| is_recognized(k))
                .collect(),
            EnvOverlay::Fixed(vars) => vars.clone(),
            EnvOverlay::None => BTreeMap::new(),
        }
    }
}

/// Layered env files under `dir` plus an overlay.
#[derive(Debug, Clone)]
pub struct EnvSource {
    dir: Option<PathBuf>,
    overlay: EnvOverlay,
}

impl EnvSource {
    pub fn new(dir: impl Into<PathBuf>, overlay: EnvOverlay) -> Self {
        Self {
            dir: Some(dir.into()),
            overlay,
        }
    }

    /// No env files at all; only `vars`.
    pub fn from_vars(vars: BTreeMap<String, String>) -> Self {
        Self {
            dir: None,
            overlay: EnvOverlay::Fixed(vars),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn layers(&self, environment: &str) -> Vec<PathBuf> {
        match &self.dir {
            Some(dir) => env_file_layers(dir, environment).to_vec(),
            None => Vec::new(),
        }
    }

    /// `APP_ENV` from the overlay, then from the base `.env`, then `development`.
    pub fn detect_environment(&self) -> String {
        if let Some(env) = self.overlay.vars().remove(APP_ENV) {
            return env;
        }
        let mut base = BTreeMap::new();
        if let Some(base_file) = self.layers(DEFAULT_ENVIRONMENT).first() {
            if base_file.is_file() && read_env_file(base_file, &mut base).is_ok() {
                if let Some(env) = base.remove(APP_ENV) {
                    return env;
                }
            }
        }
        DEFAULT_ENVIRONMENT.to_string()
    }

    /// Raw variables after all layers for `environment`.
    pub fn load_vars(&self, environment: &str) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut vars = BTreeMap::new();
        for path in self.layers(environment) {
            if path.is_file() {
                read_env_file(&path, &mut vars)?;
                debug!(path = %path.display(), "loaded env file");
            }
        }
        vars.extend(self.overlay.vars());
        Ok(vars)
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> String {
        match &self.dir {
            Some(dir) => format!("env:{}", dir.display()),
            None => "env:fixed".to_string(),
        }
    }

    /// The `env` section: recognized keys only, coerced, defaults applied.
    fn load(&self, environment: &str) -> Result<Option<Value>, ConfigError> {
        let vars = self.load_vars(environment)?;
        Ok(Some(Value::Object(coerce_env(&vars, false))))
    }

    fn watched_paths(&self, environment: &str) -> Vec<PathBuf> {
        self.layers(environment)
    }
}
