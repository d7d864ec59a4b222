//! Pluggable configuration sources.
//!
//! The manager never reads files directly; every layer comes from a
//! [`ConfigSource`]. Swap a [`FileSource`] for a [`MemorySource`] to test
//! resolution without touching the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{io_err, ConfigError};
use crate::paths::ENVIRONMENT_PLACEHOLDER;

pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Label used in logs.
    fn name(&self) -> String;

    /// The layer for `environment`. `Ok(None)` means the source is optional
    /// and currently absent.
    fn load(&self, environment: &str) -> Result<Option<Value>, ConfigError>;

    /// Files whose creation or change should trigger a reload, whether or
    /// not they exist yet.
    fn watched_paths(&self, _environment: &str) -> Vec<PathBuf> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A YAML or JSON file. The path may contain `{environment}`.
#[derive(Debug, Clone)]
pub struct FileSource {
    pattern: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn required(pattern: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            required: true,
        }
    }

    pub fn optional(pattern: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            required: false,
        }
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn path_for(&self, environment: &str) -> PathBuf {
        let raw = self.pattern.to_string_lossy();
        if raw.contains(ENVIRONMENT_PLACEHOLDER) {
            PathBuf::from(raw.replace(ENVIRONMENT_PLACEHOLDER, environment))
        } else {
            self.pattern.clone()
        }
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> String {
        self.pattern.display().to_string()
    }

    fn load(&self, environment: &str) -> Result<Option<Value>, ConfigError> {
        let path = self.path_for(environment);
        if !path.is_file() {
            if self.required {
                return Err(ConfigError::MissingRequiredFile { path });
            }
            warn!(path = %path.display(), "optional config file not found, skipping");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        parse_document(&contents, &path).map(Some)
    }

    fn watched_paths(&self, environment: &str) -> Vec<PathBuf> {
        vec![self.path_for(environment)]
    }
}

/// Parse a config document by extension; `.json` is JSON, anything else YAML.
///
/// An empty document is an empty mapping. Anything but a mapping at the top
/// level is rejected.
pub fn parse_document(contents: &str, path: &Path) -> Result<Value, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let value: Value = if is_json {
        serde_json::from_str(contents).map_err(|e| parse_err(e.to_string()))?
    } else {
        serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string()))?
    };
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        other => Err(parse_err(format!(
            "top level must be a mapping, found {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// Fixed in-memory values, optionally per environment.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    shared: Option<Value>,
    per_environment: BTreeMap<String, Value>,
}

impl MemorySource {
    /// The same value for every environment.
    pub fn new(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            shared: Some(value),
            per_environment: BTreeMap::new(),
        }
    }

    /// No shared value; only what `with_environment` adds.
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Value for one environment; takes precedence over the shared value.
    pub fn with_environment(mut self, environment: impl Into<String>, value: Value) -> Self {
        self.per_environment.insert(environment.into(), value);
        self
    }
}

impl ConfigSource for MemorySource {
    fn name(&self) -> String {
        format!("memory:{}", self.label)
    }

    fn load(&self, environment: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self
            .per_environment
            .get(environment)
            .or(self.shared.as_ref())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn placeholder_expands_to_environment() {
        let source = FileSource::optional("cfg/environments/{environment}.yaml");
        assert_eq!(source.path_for("test"), PathBuf::from("cfg/environments/test.yaml"));
        assert_eq!(FileSource::optional("a.yaml").path_for("test"), PathBuf::from("a.yaml"));
    }

    #[test]
    fn missing_required_and_optional_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("default.yaml");
        let err = FileSource::required(&path).load("development").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequiredFile { path: ref p } if *p == path));
        assert!(FileSource::optional(&path).load("development").unwrap().is_none());
        assert_eq!(FileSource::optional(&path).watched_paths("development"), vec![path]);
    }

    #[test]
    fn yaml_and_json_documents() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("a.yaml");
        let json_path = dir.path().join("b.json");
        std::fs::write(&yaml, "cache:\n  ttl: 300\n").unwrap();
        std::fs::write(&json_path, r#"{"cache":{"ttl":60}}"#).unwrap();

        let a = FileSource::required(&yaml).load("x").unwrap().unwrap();
        let b = FileSource::required(&json_path).load("x").unwrap().unwrap();
        assert_eq!(a["cache"]["ttl"], json!(300));
        assert_eq!(b["cache"]["ttl"], json!(60));
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        assert_eq!(parse_document("", Path::new("e.yaml")).unwrap(), json!({}));
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        let err = parse_document("- 1\n- 2\n", Path::new("list.yaml")).unwrap_err();
        assert!(err.to_string().contains("a sequence"), "{err}");
    }

    #[test]
    fn memory_source_per_environment() {
        let source = MemorySource::new("defaults", json!({ "a": 1 }))
            .with_environment("test", json!({ "a": 2 }));
        assert_eq!(source.load("test").unwrap(), Some(json!({ "a": 2 })));
        assert_eq!(source.load("production").unwrap(), Some(json!({ "a": 1 })));
        assert_eq!(MemorySource::empty("none").load("test").unwrap(), None);
    }
}
